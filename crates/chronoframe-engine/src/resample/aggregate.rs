//! Resample and group-by drivers: map bins or keys to aggregate kernel
//! calls over slices, then re-index by labels.

use arrow_schema::DataType;
use rustc_hash::FxHashMap;

use chronoframe_common::{AggregateOp, FrameError, FrameResult};

use crate::array::Array;
use crate::factory;
use crate::index::Index;
use crate::scalar::{Scalar, ScalarKey};

use super::grouper::{TimeGrouper, bucket_sizes};

/// Result type for an aggregation over a value array.
fn result_dtype(op: AggregateOp, values: &Array) -> DataType {
    match op {
        AggregateOp::Mean
        | AggregateOp::ApproxMedian
        | AggregateOp::Variance
        | AggregateOp::Stddev => DataType::Float64,
        AggregateOp::Count => DataType::Int64,
        AggregateOp::Sum | AggregateOp::Product => match values.dtype() {
            DataType::Float64 => DataType::Float64,
            _ => DataType::Int64,
        },
        _ => values.dtype().clone(),
    }
}

/// Downsample `values` over the grouper's bins with one aggregate call
/// per bucket; the result is re-indexed by the bucket labels.
pub fn resample_aggregate(
    grouper: &TimeGrouper,
    index: &Index,
    values: &Array,
    op: AggregateOp,
) -> FrameResult<(Index, Array)> {
    if values.len() != index.size() {
        return Err(FrameError::invalid_argument()
            .with_operation("resample_aggregate")
            .with_message(format!(
                "values length {} does not match index length {}",
                values.len(),
                index.size()
            )));
    }
    let bins = grouper.get_time_bins(index)?;
    if bins.bins.is_empty() {
        let empty = factory::array::from_scalars(Vec::new(), &result_dtype(op, values))?;
        return Ok((bins.labels, empty));
    }
    if (index.size() as i64) < bins.bins.len() as i64 {
        return Err(FrameError::invalid_argument()
            .with_operation("resample_aggregate")
            .with_message("up-sampling is not supported through the aggregation path"));
    }

    let rep = bucket_sizes(&bins.bins);
    let mut results = Vec::with_capacity(rep.len());
    let mut start = 0i64;
    for count in rep {
        let bucket = values.slice(Some(start), Some(start + count), 1)?;
        results.push(bucket.aggregate(op, true, 1)?);
        start += count;
    }
    let out = factory::array::from_scalars(results, &result_dtype(op, values))?;
    Ok((bins.labels, out))
}

/// Group by the labels of `keys`, ascending by key, aggregating the
/// matching value slices. Null keys are dropped.
pub fn group_by_aggregate(
    keys: &Index,
    values: &Array,
    op: AggregateOp,
) -> FrameResult<(Index, Array)> {
    if values.len() != keys.size() {
        return Err(FrameError::invalid_argument()
            .with_operation("group_by_aggregate")
            .with_message(format!(
                "values length {} does not match key length {}",
                values.len(),
                keys.size()
            )));
    }

    let mut slots: FxHashMap<ScalarKey, usize> = FxHashMap::default();
    let mut groups: Vec<(Scalar, Vec<i64>)> = Vec::new();
    for i in 0..keys.size() as i64 {
        let label = keys.at(i)?;
        let Some(key) = label.key() else { continue };
        match slots.get(&key) {
            Some(slot) => groups[*slot].1.push(i),
            None => {
                slots.insert(key, groups.len());
                groups.push((label, vec![i]));
            }
        }
    }
    groups.sort_by(|a, b| a.0.compare(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut labels = Vec::with_capacity(groups.len());
    let mut results = Vec::with_capacity(groups.len());
    for (label, positions) in groups {
        let taken = values.take(&factory::array::from_slice_i64(&positions), false)?;
        results.push(taken.aggregate(op, true, 1)?);
        labels.push(label);
    }
    let label_array = factory::array::from_scalars(labels, keys.dtype())?;
    let out = factory::array::from_scalars(results, &result_dtype(op, values))?;
    Ok((keys.with_array(label_array)?, out))
}
