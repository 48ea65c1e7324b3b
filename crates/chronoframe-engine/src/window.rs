//! Rolling and expanding window drivers.
//!
//! Thin slicing drivers over the same aggregate kernels the resampler
//! uses; `min_periods` rides on the aggregate `min_count` machinery, so
//! short or null-heavy windows produce null slots rather than errors.

use arrow_schema::DataType;

use chronoframe_common::{AggregateOp, FrameError, FrameResult};

use crate::array::Array;
use crate::factory;

fn window_result_dtype(op: AggregateOp, values: &Array) -> DataType {
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

/// Trailing fixed-width window aggregation.
pub fn rolling(
    values: &Array,
    window: usize,
    min_periods: usize,
    op: AggregateOp,
) -> FrameResult<Array> {
    if window == 0 {
        return Err(FrameError::invalid_argument()
            .with_operation("rolling")
            .with_message("window must be positive"));
    }
    let min_periods = min_periods.max(1);
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() as i64 {
        let lo = (i + 1 - window as i64).max(0);
        let slice = values.slice(Some(lo), Some(i + 1), 1)?;
        out.push(slice.aggregate(op, true, min_periods)?);
    }
    factory::array::from_scalars(out, &window_result_dtype(op, values))
}

/// Window growing from the first element.
pub fn expanding(values: &Array, min_periods: usize, op: AggregateOp) -> FrameResult<Array> {
    let min_periods = min_periods.max(1);
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() as i64 {
        let slice = values.slice(Some(0), Some(i + 1), 1)?;
        out.push(slice.aggregate(op, true, min_periods)?);
    }
    factory::array::from_scalars(out, &window_result_dtype(op, values))
}
