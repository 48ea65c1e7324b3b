//! Columnar array façade.
//!
//! `Array` wraps an immutable arrow `ArrayRef` and normalizes the
//! engine's semantics on top of the compute kernels: Python-style
//! negative indexing and slicing, null-propagating arithmetic, aggregate
//! `skip_nulls`/`min_count` handling, and hash-based membership ops.

use std::sync::Arc;

use arrow_array::types::Int32Type;
use arrow_array::{
    Array as ArrowArray, ArrayRef, BooleanArray, DictionaryArray, Int32Array, Int64Array,
    TimestampNanosecondArray, UInt32Array,
};
use arrow_schema::{ArrowError, DataType};
use chrono_tz::Tz;
use rustc_hash::FxHashMap;

use chronoframe_common::{AggregateOp, FrameError, FrameResult};

use crate::datetime::types::DateTime;
use crate::scalar::{Scalar, ScalarKey, tz_of_type};
use crate::util::from_arrow;

#[derive(Debug, Clone)]
pub struct Array {
    inner: ArrayRef,
}

impl Array {
    pub fn new(inner: ArrayRef) -> Self {
        Array { inner }
    }

    pub fn inner(&self) -> &ArrayRef {
        &self.inner
    }

    pub fn into_inner(self) -> ArrayRef {
        self.inner
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.inner.null_count()
    }

    pub fn dtype(&self) -> &DataType {
        self.inner.data_type()
    }

    /// Same underlying buffer handle.
    pub fn is(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn equals(&self, other: &Array) -> bool {
        self.inner.as_ref() == other.inner.as_ref()
    }

    /* ───────────────────────── indexing ───────────────────────── */

    fn resolve(&self, i: i64) -> FrameResult<usize> {
        let len = self.len() as i64;
        let resolved = if i < 0 { len + i } else { i };
        if resolved < 0 || resolved >= len {
            return Err(FrameError::out_of_range()
                .with_operation("Array::at")
                .with_position(i));
        }
        Ok(resolved as usize)
    }

    pub fn at(&self, i: i64) -> FrameResult<Scalar> {
        let i = self.resolve(i)?;
        Scalar::from_array(self.inner.as_ref(), i)
    }

    /// Python-style slice. `step == 1` returns a zero-copy view; other
    /// steps materialize through a gather.
    pub fn slice(&self, start: Option<i64>, stop: Option<i64>, step: i64) -> FrameResult<Array> {
        if step == 0 {
            return Err(FrameError::invalid_argument()
                .with_operation("Array::slice")
                .with_message("slice step cannot be zero"));
        }
        let len = self.len() as i64;
        let clamp = |v: i64, low: i64, high: i64| v.max(low).min(high);
        if step > 0 {
            let mut s = start.unwrap_or(0);
            let mut e = stop.unwrap_or(len);
            if s < 0 {
                s += len;
            }
            if e < 0 {
                e += len;
            }
            let s = clamp(s, 0, len);
            let e = clamp(e, 0, len);
            if e <= s {
                return Ok(Array::new(self.inner.slice(0, 0)));
            }
            if step == 1 {
                return Ok(Array::new(self.inner.slice(s as usize, (e - s) as usize)));
            }
            let positions: Vec<i64> = (s..e).step_by(step as usize).collect();
            self.take_positions(&positions)
        } else {
            let mut s = start.unwrap_or(len - 1);
            let mut e = stop.map(|v| if v < 0 { v + len } else { v }).unwrap_or(-1);
            if s < 0 {
                s += len;
            }
            let s = clamp(s, -1, len - 1);
            e = clamp(e, -1, len - 1);
            let mut positions = Vec::new();
            let mut i = s;
            while i > e {
                positions.push(i);
                i += step;
            }
            self.take_positions(&positions)
        }
    }

    fn take_positions(&self, positions: &[i64]) -> FrameResult<Array> {
        let indices = Int64Array::from(positions.to_vec());
        let taken = arrow::compute::take(self.inner.as_ref(), &indices, None).map_err(from_arrow)?;
        Ok(Array::new(taken))
    }

    /* ─────────────────────── elementwise ops ──────────────────── */

    fn binary(
        &self,
        other: &Array,
        op: fn(&dyn arrow_array::Datum, &dyn arrow_array::Datum) -> Result<ArrayRef, ArrowError>,
    ) -> FrameResult<Array> {
        op(&self.inner, &other.inner)
            .map(Array::new)
            .map_err(from_arrow)
    }

    fn binary_scalar(
        &self,
        scalar: &Scalar,
        op: fn(&dyn arrow_array::Datum, &dyn arrow_array::Datum) -> Result<ArrayRef, ArrowError>,
    ) -> FrameResult<Array> {
        let single = arrow_array::Scalar::new(scalar.to_single_array()?);
        op(&self.inner, &single).map(Array::new).map_err(from_arrow)
    }

    pub fn add(&self, other: &Array) -> FrameResult<Array> {
        self.binary(other, arrow::compute::kernels::numeric::add)
    }

    pub fn sub(&self, other: &Array) -> FrameResult<Array> {
        self.binary(other, arrow::compute::kernels::numeric::sub)
    }

    pub fn mul(&self, other: &Array) -> FrameResult<Array> {
        self.binary(other, arrow::compute::kernels::numeric::mul)
    }

    pub fn div(&self, other: &Array) -> FrameResult<Array> {
        self.binary(other, arrow::compute::kernels::numeric::div)
    }

    pub fn add_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.binary_scalar(scalar, arrow::compute::kernels::numeric::add)
    }

    pub fn sub_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.binary_scalar(scalar, arrow::compute::kernels::numeric::sub)
    }

    pub fn mul_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.binary_scalar(scalar, arrow::compute::kernels::numeric::mul)
    }

    pub fn div_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.binary_scalar(scalar, arrow::compute::kernels::numeric::div)
    }

    fn compare(
        &self,
        other: &Array,
        op: fn(
            &dyn arrow_array::Datum,
            &dyn arrow_array::Datum,
        ) -> Result<BooleanArray, ArrowError>,
    ) -> FrameResult<Array> {
        op(&self.inner, &other.inner)
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    fn compare_scalar(
        &self,
        scalar: &Scalar,
        op: fn(
            &dyn arrow_array::Datum,
            &dyn arrow_array::Datum,
        ) -> Result<BooleanArray, ArrowError>,
    ) -> FrameResult<Array> {
        let single = arrow_array::Scalar::new(scalar.to_single_array()?);
        op(&self.inner, &single)
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    pub fn eq(&self, other: &Array) -> FrameResult<Array> {
        self.compare(other, arrow::compute::kernels::cmp::eq)
    }

    pub fn neq(&self, other: &Array) -> FrameResult<Array> {
        self.compare(other, arrow::compute::kernels::cmp::neq)
    }

    pub fn lt(&self, other: &Array) -> FrameResult<Array> {
        self.compare(other, arrow::compute::kernels::cmp::lt)
    }

    pub fn lt_eq(&self, other: &Array) -> FrameResult<Array> {
        self.compare(other, arrow::compute::kernels::cmp::lt_eq)
    }

    pub fn gt(&self, other: &Array) -> FrameResult<Array> {
        self.compare(other, arrow::compute::kernels::cmp::gt)
    }

    pub fn gt_eq(&self, other: &Array) -> FrameResult<Array> {
        self.compare(other, arrow::compute::kernels::cmp::gt_eq)
    }

    pub fn eq_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.compare_scalar(scalar, arrow::compute::kernels::cmp::eq)
    }

    pub fn lt_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.compare_scalar(scalar, arrow::compute::kernels::cmp::lt)
    }

    pub fn lt_eq_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.compare_scalar(scalar, arrow::compute::kernels::cmp::lt_eq)
    }

    pub fn gt_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.compare_scalar(scalar, arrow::compute::kernels::cmp::gt)
    }

    pub fn gt_eq_scalar(&self, scalar: &Scalar) -> FrameResult<Array> {
        self.compare_scalar(scalar, arrow::compute::kernels::cmp::gt_eq)
    }

    fn as_boolean(&self) -> FrameResult<&BooleanArray> {
        self.inner
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| {
                FrameError::type_mismatch()
                    .with_operation("Array::as_boolean")
                    .with_label(format!("{}", self.dtype()))
            })
    }

    pub fn and(&self, other: &Array) -> FrameResult<Array> {
        arrow::compute::and(self.as_boolean()?, other.as_boolean()?)
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    pub fn or(&self, other: &Array) -> FrameResult<Array> {
        arrow::compute::or(self.as_boolean()?, other.as_boolean()?)
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    pub fn xor(&self, other: &Array) -> FrameResult<Array> {
        // Boolean inequality is exclusive-or with null propagation.
        self.as_boolean()?;
        other.as_boolean()?;
        self.neq(other)
    }

    pub fn not(&self) -> FrameResult<Array> {
        arrow::compute::not(self.as_boolean()?)
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    /* ─────────────────────── set-style ops ────────────────────── */

    pub fn filter(&self, mask: &Array) -> FrameResult<Array> {
        if mask.len() != self.len() {
            return Err(FrameError::invalid_argument()
                .with_operation("Array::filter")
                .with_message(format!(
                    "filter length {} does not match array length {}",
                    mask.len(),
                    self.len()
                )));
        }
        arrow::compute::filter(self.inner.as_ref(), mask.as_boolean()?)
            .map(Array::new)
            .map_err(from_arrow)
    }

    pub fn take(&self, indices: &Array, bounds_check: bool) -> FrameResult<Array> {
        let options = arrow::compute::TakeOptions {
            check_bounds: bounds_check,
        };
        arrow::compute::take(self.inner.as_ref(), indices.inner.as_ref(), Some(options))
            .map(Array::new)
            .map_err(from_arrow)
    }

    fn key_map(&self) -> FrameResult<FxHashMap<ScalarKey, i32>> {
        let mut map = FxHashMap::default();
        for i in 0..self.len() {
            if let Some(key) = Scalar::from_array(self.inner.as_ref(), i)?.key() {
                map.entry(key).or_insert(i as i32);
            }
        }
        Ok(map)
    }

    /// Membership test against `set`; nulls test false.
    pub fn is_in(&self, set: &Array) -> FrameResult<Array> {
        let keys = set.key_map()?;
        let mut builder = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let hit = Scalar::from_array(self.inner.as_ref(), i)?
                .key()
                .map(|k| keys.contains_key(&k))
                .unwrap_or(false);
            builder.push(Some(hit));
        }
        Ok(Array::new(Arc::new(BooleanArray::from(builder))))
    }

    /// Position of each element within `set` (first occurrence), null
    /// when absent.
    pub fn index_in(&self, set: &Array) -> FrameResult<Array> {
        let keys = set.key_map()?;
        let mut out: Vec<Option<i32>> = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            out.push(
                Scalar::from_array(self.inner.as_ref(), i)?
                    .key()
                    .and_then(|k| keys.get(&k).copied()),
            );
        }
        Ok(Array::new(Arc::new(Int32Array::from(out))))
    }

    pub fn dictionary_encode(&self) -> FrameResult<(Array, Array)> {
        let encoded = arrow::compute::cast(
            self.inner.as_ref(),
            &DataType::Dictionary(Box::new(DataType::Int32), Box::new(self.dtype().clone())),
        )
        .map_err(from_arrow)?;
        let dictionary = encoded
            .as_any()
            .downcast_ref::<DictionaryArray<Int32Type>>()
            .ok_or_else(|| {
                FrameError::type_mismatch()
                    .with_operation("Array::dictionary_encode")
                    .with_label(format!("{}", encoded.data_type()))
            })?;
        let indices = Array::new(Arc::new(dictionary.keys().clone()));
        let values = Array::new(dictionary.values().clone());
        Ok((indices, values))
    }

    pub fn unique(&self) -> FrameResult<Array> {
        let (_, values) = self.dictionary_encode()?;
        Ok(values)
    }

    /// Distinct values with their occurrence counts, in first-seen order.
    pub fn value_counts(&self) -> FrameResult<(Array, Array)> {
        let (indices, values) = self.dictionary_encode()?;
        let codes = indices
            .inner
            .as_any()
            .downcast_ref::<Int32Array>()
            .ok_or_else(|| FrameError::type_mismatch().with_operation("Array::value_counts"))?;
        let mut counts = vec![0i64; values.len()];
        for i in 0..codes.len() {
            if codes.is_valid(i) {
                counts[codes.value(i) as usize] += 1;
            }
        }
        Ok((values, Array::new(Arc::new(Int64Array::from(counts)))))
    }

    pub fn sort_indices(&self, ascending: bool) -> FrameResult<Array> {
        let options = arrow::compute::SortOptions {
            descending: !ascending,
            nulls_first: false,
        };
        arrow::compute::sort_to_indices(self.inner.as_ref(), Some(options), None)
            .map(|idx: UInt32Array| Array::new(Arc::new(idx)))
            .map_err(from_arrow)
    }

    pub fn sort(&self, ascending: bool) -> FrameResult<Array> {
        let indices = self.sort_indices(ascending)?;
        self.take(&indices, false)
    }

    /* ─────────────────────── null handling ────────────────────── */

    pub fn is_null(&self) -> FrameResult<Array> {
        arrow::compute::is_null(self.inner.as_ref())
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    pub fn is_not_null(&self) -> FrameResult<Array> {
        arrow::compute::is_not_null(self.inner.as_ref())
            .map(|b| Array::new(Arc::new(b)))
            .map_err(from_arrow)
    }

    pub fn fill_null(&self, value: &Scalar) -> FrameResult<Array> {
        let mask = arrow::compute::is_not_null(self.inner.as_ref()).map_err(from_arrow)?;
        let filler = arrow_array::Scalar::new(value.to_single_array()?);
        arrow::compute::kernels::zip::zip(&mask, &self.inner, &filler)
            .map(Array::new)
            .map_err(from_arrow)
    }

    pub fn cast(&self, dtype: &DataType) -> FrameResult<Array> {
        arrow::compute::cast(self.inner.as_ref(), dtype)
            .map(Array::new)
            .map_err(from_arrow)
    }

    /* ──────────────────────── aggregates ──────────────────────── */

    fn non_null_scalars(&self) -> FrameResult<Vec<Scalar>> {
        let mut out = Vec::with_capacity(self.len() - self.null_count());
        for i in 0..self.len() {
            if self.inner.is_valid(i) {
                out.push(Scalar::from_array(self.inner.as_ref(), i)?);
            }
        }
        Ok(out)
    }

    /// Aggregate with `skip_nulls`/`min_count` semantics: when the
    /// observed non-null count is below `min_count` (or nulls are present
    /// with `skip_nulls == false`), the result is a null scalar of the
    /// result type, never an error.
    pub fn aggregate(
        &self,
        op: AggregateOp,
        skip_nulls: bool,
        min_count: usize,
    ) -> FrameResult<Scalar> {
        let non_null = self.len() - self.null_count();
        if op == AggregateOp::Count {
            return Ok(Scalar::Int64(non_null as i64));
        }
        let result_type = match op {
            AggregateOp::Mean
            | AggregateOp::ApproxMedian
            | AggregateOp::Variance
            | AggregateOp::Stddev => DataType::Float64,
            _ => self.dtype().clone(),
        };
        if (!skip_nulls && self.null_count() > 0) || non_null < min_count {
            return Ok(Scalar::Null(result_type));
        }
        if non_null == 0 {
            return Ok(Scalar::Null(result_type));
        }

        let values = self.non_null_scalars()?;
        match op {
            AggregateOp::First => Ok(values[0].clone()),
            AggregateOp::Last => Ok(values[values.len() - 1].clone()),
            AggregateOp::Min | AggregateOp::Max => {
                let mut best = values[0].clone();
                for v in &values[1..] {
                    let ordering = v.compare(&best)?;
                    let replace = if op == AggregateOp::Min {
                        ordering == std::cmp::Ordering::Less
                    } else {
                        ordering == std::cmp::Ordering::Greater
                    };
                    if replace {
                        best = v.clone();
                    }
                }
                Ok(best)
            }
            AggregateOp::Sum | AggregateOp::Product => self.sum_or_product(&values, op),
            AggregateOp::Mean => {
                let total: f64 = values.iter().map(|v| v.as_f64()).sum::<FrameResult<f64>>()?;
                Ok(Scalar::Float64(total / values.len() as f64))
            }
            AggregateOp::ApproxMedian => {
                let mut nums: Vec<f64> = values
                    .iter()
                    .map(|v| v.as_f64())
                    .collect::<FrameResult<_>>()?;
                nums.sort_by(|a, b| a.total_cmp(b));
                let mid = nums.len() / 2;
                let median = if nums.len() % 2 == 1 {
                    nums[mid]
                } else {
                    (nums[mid - 1] + nums[mid]) / 2.0
                };
                Ok(Scalar::Float64(median))
            }
            AggregateOp::Variance | AggregateOp::Stddev => {
                if values.len() < 2 {
                    return Ok(Scalar::Null(DataType::Float64));
                }
                let nums: Vec<f64> = values
                    .iter()
                    .map(|v| v.as_f64())
                    .collect::<FrameResult<_>>()?;
                let mean = nums.iter().sum::<f64>() / nums.len() as f64;
                let ss: f64 = nums.iter().map(|x| (x - mean) * (x - mean)).sum();
                let variance = ss / (nums.len() - 1) as f64;
                Ok(Scalar::Float64(if op == AggregateOp::Variance {
                    variance
                } else {
                    variance.sqrt()
                }))
            }
            AggregateOp::Count => unreachable!("handled above"),
        }
    }

    fn sum_or_product(&self, values: &[Scalar], op: AggregateOp) -> FrameResult<Scalar> {
        let overflow = || {
            FrameError::overflow()
                .with_operation("Array::aggregate")
                .with_label(op.to_string())
        };
        match self.dtype() {
            DataType::Float64 => {
                let mut acc = if op == AggregateOp::Sum { 0.0 } else { 1.0 };
                for v in values {
                    let x = v.as_f64()?;
                    acc = if op == AggregateOp::Sum { acc + x } else { acc * x };
                }
                Ok(Scalar::Float64(acc))
            }
            DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 => {
                let mut acc: i64 = if op == AggregateOp::Sum { 0 } else { 1 };
                for v in values {
                    let x = v.as_i64()?;
                    acc = if op == AggregateOp::Sum {
                        acc.checked_add(x).ok_or_else(overflow)?
                    } else {
                        acc.checked_mul(x).ok_or_else(overflow)?
                    };
                }
                Ok(Scalar::Int64(acc))
            }
            other => Err(FrameError::type_mismatch()
                .with_operation("Array::aggregate")
                .with_message(format!("{op} is not defined for this type"))
                .with_label(format!("{other}"))),
        }
    }

    pub fn sum(&self, skip_nulls: bool, min_count: usize) -> FrameResult<Scalar> {
        self.aggregate(AggregateOp::Sum, skip_nulls, min_count)
    }

    pub fn mean(&self, skip_nulls: bool, min_count: usize) -> FrameResult<Scalar> {
        self.aggregate(AggregateOp::Mean, skip_nulls, min_count)
    }

    pub fn min(&self, skip_nulls: bool) -> FrameResult<Scalar> {
        self.aggregate(AggregateOp::Min, skip_nulls, 1)
    }

    pub fn max(&self, skip_nulls: bool) -> FrameResult<Scalar> {
        self.aggregate(AggregateOp::Max, skip_nulls, 1)
    }

    /// `any` over booleans; an empty array is false.
    pub fn any(&self, skip_nulls: bool) -> FrameResult<Scalar> {
        let bools = self.as_boolean()?;
        if !skip_nulls && bools.null_count() > 0 {
            return Ok(Scalar::Null(DataType::Boolean));
        }
        let mut result = false;
        for i in 0..bools.len() {
            if bools.is_valid(i) && bools.value(i) {
                result = true;
                break;
            }
        }
        Ok(Scalar::Boolean(result))
    }

    /// `all` over booleans; an empty array is true.
    pub fn all(&self, skip_nulls: bool) -> FrameResult<Scalar> {
        let bools = self.as_boolean()?;
        if !skip_nulls && bools.null_count() > 0 {
            return Ok(Scalar::Null(DataType::Boolean));
        }
        let mut result = true;
        for i in 0..bools.len() {
            if bools.is_valid(i) && !bools.value(i) {
                result = false;
                break;
            }
        }
        Ok(Scalar::Boolean(result))
    }

    /// Position of the smallest element, skipping nulls; −1 when empty or
    /// all-null.
    pub fn argmin(&self) -> FrameResult<i64> {
        self.arg_extreme(std::cmp::Ordering::Less)
    }

    pub fn argmax(&self) -> FrameResult<i64> {
        self.arg_extreme(std::cmp::Ordering::Greater)
    }

    fn arg_extreme(&self, wanted: std::cmp::Ordering) -> FrameResult<i64> {
        let mut best: Option<(i64, Scalar)> = None;
        for i in 0..self.len() {
            if !self.inner.is_valid(i) {
                continue;
            }
            let candidate = Scalar::from_array(self.inner.as_ref(), i)?;
            best = match best {
                None => Some((i as i64, candidate)),
                Some((pos, current)) => {
                    if candidate.compare(&current)? == wanted {
                        Some((i as i64, candidate))
                    } else {
                        Some((pos, current))
                    }
                }
            };
        }
        Ok(best.map(|(pos, _)| pos).unwrap_or(-1))
    }

    /* ─────────────────────── shift / diff ─────────────────────── */

    /// Move elements by `k` positions; nulls fill the emerging side.
    pub fn shift(&self, k: i64) -> FrameResult<Array> {
        let len = self.len() as i64;
        if k == 0 {
            return Ok(self.clone());
        }
        let fill = arrow_array::new_null_array(self.dtype(), k.unsigned_abs().min(len as u64) as usize);
        let kept = if k > 0 {
            self.inner.slice(0, (len - k.min(len)) as usize)
        } else {
            self.inner.slice(k.unsigned_abs().min(len as u64) as usize, (len + k.max(-len)) as usize)
        };
        let pieces: Vec<&dyn ArrowArray> = if k > 0 {
            vec![fill.as_ref(), kept.as_ref()]
        } else {
            vec![kept.as_ref(), fill.as_ref()]
        };
        arrow::compute::concat(&pieces)
            .map(Array::new)
            .map_err(from_arrow)
    }

    /// Elementwise `x[i] − x[i − periods]` with `periods` leading nulls.
    pub fn diff(&self, periods: i64) -> FrameResult<Array> {
        self.sub(&self.shift(periods)?)
    }

    /* ────────────────────────── map ───────────────────────────── */

    /// Pointwise scalar function. With `ignore_nulls`, null slots pass
    /// through untouched; otherwise the function sees null scalars too.
    pub fn map<F>(&self, f: F, ignore_nulls: bool) -> FrameResult<Array>
    where
        F: Fn(&Scalar) -> FrameResult<Scalar>,
    {
        let mut out = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            let value = Scalar::from_array(self.inner.as_ref(), i)?;
            if ignore_nulls && value.is_null() {
                out.push(value);
            } else {
                out.push(f(&value)?);
            }
        }
        let dtype = out
            .iter()
            .find(|s| !s.is_null())
            .map(|s| s.dtype())
            .unwrap_or_else(|| self.dtype().clone());
        crate::factory::array::from_scalars(out, &dtype)
    }

    /* ─────────────────────── timestamp views ──────────────────── */

    pub fn timestamp_tz(&self) -> FrameResult<Option<Tz>> {
        tz_of_type(self.dtype())
    }

    pub(crate) fn timestamps(&self) -> FrameResult<&TimestampNanosecondArray> {
        self.inner
            .as_any()
            .downcast_ref::<TimestampNanosecondArray>()
            .ok_or_else(|| {
                FrameError::type_mismatch()
                    .with_operation("Array::timestamps")
                    .with_message("expected a nanosecond timestamp array")
                    .with_label(format!("{}", self.dtype()))
            })
    }

    /// Decode into engine timestamps, preserving nulls.
    pub fn timestamp_values(&self) -> FrameResult<Vec<Option<DateTime>>> {
        let tz = self.timestamp_tz()?;
        let typed = self.timestamps()?;
        Ok((0..typed.len())
            .map(|i| {
                if typed.is_valid(i) {
                    Some(DateTime::new(typed.value(i), tz))
                } else {
                    None
                }
            })
            .collect())
    }
}

pub fn concat(pieces: &[&Array]) -> FrameResult<Array> {
    let refs: Vec<&dyn ArrowArray> = pieces.iter().map(|a| a.inner.as_ref()).collect();
    arrow::compute::concat(&refs).map(Array::new).map_err(from_arrow)
}
