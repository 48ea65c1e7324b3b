//! Label axis.
//!
//! An `Index` wraps an immutable label array together with a name, the
//! monotonic direction (computed once at construction), and an eager
//! label→positions hash indexer. Duplicate labels are tracked as position
//! lists; lookups return the first occurrence unless asked for all.

pub mod datetime;

use std::sync::Arc;

use arrow_array::RecordBatch;
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use chronoframe_common::{
    FrameError, FrameErrorKind, FrameResult, NullPlacement, SearchSide,
};

use crate::array::Array;
use crate::scalar::{Scalar, ScalarKey};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Monotonicity {
    Increasing,
    Decreasing,
    NotMonotonic,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndexKind {
    Range,
    Datetime,
    String,
    Other,
}

fn kind_of(dtype: &DataType) -> IndexKind {
    match dtype {
        DataType::Timestamp(TimeUnit::Nanosecond, _) => IndexKind::Datetime,
        DataType::Utf8 => IndexKind::String,
        DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 => IndexKind::Range,
        _ => IndexKind::Other,
    }
}

type Positions = SmallVec<[i64; 2]>;

#[derive(Debug, Clone)]
pub struct Index {
    array: Array,
    name: String,
    kind: IndexKind,
    monotonic: Monotonicity,
    lookup: Arc<FxHashMap<ScalarKey, Positions>>,
}

impl Index {
    pub fn new(array: Array, name: impl Into<String>) -> FrameResult<Self> {
        let monotonic = scan_monotonicity(&array)?;
        let mut lookup: FxHashMap<ScalarKey, Positions> = FxHashMap::default();
        for i in 0..array.len() {
            if let Some(key) = array.at(i as i64)?.key() {
                lookup.entry(key).or_default().push(i as i64);
            }
        }
        let kind = kind_of(array.dtype());
        Ok(Index {
            array,
            name: name.into(),
            kind,
            monotonic,
            lookup: Arc::new(lookup),
        })
    }

    /// Derivation factory: a new index over `array` that keeps this
    /// index's name (the variant follows the new array's type).
    pub fn with_array(&self, array: Array) -> FrameResult<Self> {
        Index::new(array, self.name.clone())
    }

    pub fn rename(&self, name: impl Into<String>) -> FrameResult<Self> {
        Index::new(self.array.clone(), name)
    }

    /* ─────────────────────── attributes ───────────────────────── */

    pub fn size(&self) -> usize {
        self.array.len()
    }

    pub fn empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn dtype(&self) -> &DataType {
        self.array.dtype()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn array(&self) -> &Array {
        &self.array
    }

    pub fn inferred_type(&self) -> &'static str {
        match self.dtype() {
            DataType::Boolean => "boolean",
            DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64 => "integer",
            DataType::Float64 => "floating",
            DataType::Utf8 => "string",
            DataType::Timestamp(_, _) | DataType::Date32 => "datetime",
            DataType::Duration(_) => "timedelta",
            _ => "object",
        }
    }

    pub fn monotonicity(&self) -> Monotonicity {
        self.monotonic
    }

    pub fn is_monotonic(&self) -> bool {
        self.monotonic != Monotonicity::NotMonotonic
    }

    pub fn is_monotonic_increasing(&self) -> bool {
        self.monotonic == Monotonicity::Increasing
    }

    /// True when no label occurs more than once.
    pub fn is_unique(&self) -> bool {
        self.lookup.values().all(|positions| positions.len() == 1)
    }

    /* ─────────────────── equality & identity ──────────────────── */

    /// Same labels in the same order.
    pub fn equals(&self, other: &Index) -> bool {
        self.array.equals(&other.array)
    }

    /// Same labels, order, dtype, and name.
    pub fn identical(&self, other: &Index) -> bool {
        self.equals(other) && self.name == other.name && self.dtype() == other.dtype()
    }

    /// Same underlying buffer handle.
    pub fn is(&self, other: &Index) -> bool {
        self.array.is(&other.array)
    }

    /* ────────────────────── aggregates ────────────────────────── */

    pub fn min(&self, skip_nulls: bool) -> FrameResult<Scalar> {
        self.array.min(skip_nulls)
    }

    pub fn max(&self, skip_nulls: bool) -> FrameResult<Scalar> {
        self.array.max(skip_nulls)
    }

    pub fn argmin(&self) -> FrameResult<i64> {
        self.array.argmin()
    }

    pub fn argmax(&self) -> FrameResult<i64> {
        self.array.argmax()
    }

    /* ───────────────────────── lookup ─────────────────────────── */

    pub fn contains(&self, label: &Scalar) -> bool {
        label
            .key()
            .map(|k| self.lookup.contains_key(&k))
            .unwrap_or(false)
    }

    /// Position of the first occurrence.
    pub fn get_loc(&self, label: &Scalar) -> FrameResult<i64> {
        let positions = self.get_locs(label)?;
        Ok(positions[0])
    }

    /// All positions of a label, in order.
    pub fn get_locs(&self, label: &Scalar) -> FrameResult<Vec<i64>> {
        label
            .key()
            .and_then(|k| self.lookup.get(&k))
            .map(|p| p.to_vec())
            .ok_or_else(|| {
                FrameError::key_not_found()
                    .with_operation("Index::get_loc")
                    .with_label(label.to_string())
            })
    }

    /// Vectorized lookup: position of each of `other`'s labels, −1 where
    /// absent. Requires unique labels on `self`.
    pub fn get_indexer(&self, other: &Index) -> FrameResult<Array> {
        if !self.is_unique() {
            return Err(FrameError::new(FrameErrorKind::UniquenessViolation)
                .with_operation("Index::get_indexer")
                .with_message("cannot build an indexer over duplicate labels"));
        }
        let mut out = Vec::with_capacity(other.size());
        for i in 0..other.size() {
            let position = other.array.at(i as i64)?.key().and_then(|k| {
                self.lookup.get(&k).map(|p| p[0])
            });
            out.push(Some(position.unwrap_or(-1)));
        }
        Ok(crate::factory::array::from_options_i64(out))
    }

    /// Insertion point preserving sort order; monotonic increasing
    /// indexes only.
    pub fn searchsorted(&self, label: &Scalar, side: SearchSide) -> FrameResult<i64> {
        if self.monotonic != Monotonicity::Increasing {
            return Err(FrameError::new(FrameErrorKind::MonotonicityRequired)
                .with_operation("Index::searchsorted")
                .with_label(label.to_string()));
        }
        let mut lo = 0i64;
        let mut hi = self.size() as i64;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let value = self.array.at(mid)?;
            let ordering = value.compare(label)?;
            let go_right = match side {
                SearchSide::Left => ordering == std::cmp::Ordering::Less,
                SearchSide::Right => ordering != std::cmp::Ordering::Greater,
            };
            if go_right {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Positional bounds `[start_pos, end_pos)` for a label range. Label
    /// endpoints are inclusive. Non-monotonic indexes require both
    /// endpoints to be present labels.
    pub fn slice_locs(
        &self,
        start: Option<&Scalar>,
        end: Option<&Scalar>,
    ) -> FrameResult<(i64, i64)> {
        if self.monotonic == Monotonicity::Increasing {
            let lo = match start {
                None => 0,
                Some(label) => self.searchsorted(label, SearchSide::Left)?,
            };
            let hi = match end {
                None => self.size() as i64,
                Some(label) => self.searchsorted(label, SearchSide::Right)?,
            };
            return Ok((lo, hi));
        }
        let require = |label: Option<&Scalar>, default: i64| -> FrameResult<i64> {
            match label {
                None => Ok(default),
                Some(label) => {
                    if !self.contains(label) {
                        return Err(FrameError::new(FrameErrorKind::MonotonicityRequired)
                            .with_operation("Index::slice_locs")
                            .with_message(
                                "non-monotonic index requires both endpoints to be present labels",
                            )
                            .with_label(label.to_string()));
                    }
                    self.get_loc(label)
                }
            }
        };
        let lo = require(start, 0)?;
        let hi = match end {
            None => self.size() as i64,
            Some(_) => require(end, 0)? + 1,
        };
        Ok((lo, hi))
    }

    /* ─────────────────────── set algebra ──────────────────────── */

    fn labels(&self) -> FrameResult<Vec<Scalar>> {
        (0..self.size() as i64).map(|i| self.array.at(i)).collect()
    }

    fn finish_set_op(&self, other: &Index, mut result: Vec<Scalar>) -> FrameResult<Index> {
        let sorted = self.monotonic == other.monotonic && self.is_monotonic();
        if sorted {
            result.sort_by(|a, b| a.compare(b).unwrap_or(std::cmp::Ordering::Equal));
            if self.monotonic == Monotonicity::Decreasing {
                result.reverse();
            }
        }
        let array = crate::factory::array::from_scalars(result, self.dtype())?;
        self.with_array(array)
    }

    /// Labels of `self` plus labels of `other` not already present.
    pub fn union_(&self, other: &Index) -> FrameResult<Index> {
        let mut seen: FxHashMap<ScalarKey, ()> = FxHashMap::default();
        let mut result = Vec::new();
        for label in self.labels()?.into_iter().chain(other.labels()?) {
            match label.key() {
                Some(key) => {
                    if seen.insert(key, ()).is_none() {
                        result.push(label);
                    }
                }
                None => {}
            }
        }
        self.finish_set_op(other, result)
    }

    pub fn intersection(&self, other: &Index) -> FrameResult<Index> {
        let mut seen: FxHashMap<ScalarKey, ()> = FxHashMap::default();
        let mut result = Vec::new();
        for label in self.labels()? {
            if let Some(key) = label.key() {
                if other.lookup.contains_key(&key) && seen.insert(key, ()).is_none() {
                    result.push(label);
                }
            }
        }
        self.finish_set_op(other, result)
    }

    /// Labels of `self` not present in `other`.
    pub fn difference(&self, other: &Index) -> FrameResult<Index> {
        let mut seen: FxHashMap<ScalarKey, ()> = FxHashMap::default();
        let mut result = Vec::new();
        for label in self.labels()? {
            if let Some(key) = label.key() {
                if !other.lookup.contains_key(&key) && seen.insert(key, ()).is_none() {
                    result.push(label);
                }
            }
        }
        self.finish_set_op(other, result)
    }

    pub fn symmetric_difference(&self, other: &Index) -> FrameResult<Index> {
        let mut result = Vec::new();
        let mut seen: FxHashMap<ScalarKey, ()> = FxHashMap::default();
        for label in self.labels()? {
            if let Some(key) = label.key() {
                if !other.lookup.contains_key(&key) && seen.insert(key, ()).is_none() {
                    result.push(label);
                }
            }
        }
        for label in other.labels()? {
            if let Some(key) = label.key() {
                if !self.lookup.contains_key(&key) && seen.insert(key, ()).is_none() {
                    result.push(label);
                }
            }
        }
        self.finish_set_op(other, result)
    }

    /* ──────────────────────── row ops ─────────────────────────── */

    pub fn take(&self, indices: &Array, bounds_check: bool) -> FrameResult<Index> {
        self.with_array(self.array.take(indices, bounds_check)?)
    }

    pub fn filter(&self, mask: &Array) -> FrameResult<Index> {
        self.with_array(self.array.filter(mask)?)
    }

    /// Keep rows where `cond` holds; null conditions either drop the row
    /// or emit a null label.
    pub fn where_(&self, cond: &Array, null_selection: NullPlacement) -> FrameResult<Index> {
        match null_selection {
            NullPlacement::Drop => self.filter(cond),
            NullPlacement::EmitNull => {
                if cond.len() != self.size() {
                    return Err(FrameError::invalid_argument()
                        .with_operation("Index::where_")
                        .with_message("condition length does not match index length"));
                }
                let mut kept = Vec::new();
                for i in 0..self.size() as i64 {
                    let flag = cond.at(i)?;
                    if flag.is_null() {
                        kept.push(Scalar::Null(self.dtype().clone()));
                    } else if flag.as_bool()? {
                        kept.push(self.array.at(i)?);
                    }
                }
                let array = crate::factory::array::from_scalars(kept, self.dtype())?;
                self.with_array(array)
            }
        }
    }

    /// Remove every row whose label appears in `labels`; no-op on an
    /// empty label set.
    pub fn drop(&self, labels: &Array) -> FrameResult<Index> {
        if labels.is_empty() {
            return Ok(self.clone());
        }
        let mask = self.array.is_in(labels)?.not()?;
        self.filter(&mask)
    }

    pub fn delete_(&self, loc: i64) -> FrameResult<Index> {
        let len = self.size() as i64;
        let resolved = if loc < 0 { loc + len } else { loc };
        if resolved < 0 || resolved >= len {
            return Err(FrameError::out_of_range()
                .with_operation("Index::delete_")
                .with_position(loc));
        }
        let head = self.array.slice(Some(0), Some(resolved), 1)?;
        let tail = self.array.slice(Some(resolved + 1), None, 1)?;
        self.with_array(crate::array::concat(&[&head, &tail])?)
    }

    pub fn insert(&self, loc: i64, value: &Scalar) -> FrameResult<Index> {
        let len = self.size() as i64;
        let resolved = if loc < 0 { loc + len } else { loc };
        if resolved < 0 || resolved > len {
            return Err(FrameError::out_of_range()
                .with_operation("Index::insert")
                .with_position(loc));
        }
        let head = self.array.slice(Some(0), Some(resolved), 1)?;
        let middle = Array::new(value.to_single_array()?).cast(self.dtype())?;
        let tail = self.array.slice(Some(resolved), None, 1)?;
        self.with_array(crate::array::concat(&[&head, &middle, &tail])?)
    }

    pub fn iloc(&self, start: Option<i64>, stop: Option<i64>, step: i64) -> FrameResult<Index> {
        self.with_array(self.array.slice(start, stop, step)?)
    }

    pub fn at(&self, i: i64) -> FrameResult<Scalar> {
        self.array.at(i)
    }

    /// Single-row index at position `i`.
    pub fn iat(&self, i: i64) -> FrameResult<Index> {
        let scalar = self.at(i)?;
        let array = Array::new(scalar.to_single_array()?).cast(self.dtype())?;
        self.with_array(array)
    }

    pub fn sort_values(&self, ascending: bool) -> FrameResult<Index> {
        self.with_array(self.array.sort(ascending)?)
    }

    pub fn map<F>(&self, f: F) -> FrameResult<Index>
    where
        F: Fn(&Scalar) -> FrameResult<Scalar>,
    {
        self.with_array(self.array.map(f, true)?)
    }

    pub fn diff(&self, periods: i64) -> FrameResult<Array> {
        self.array.diff(periods)
    }

    pub fn isin(&self, set: &Array) -> FrameResult<Array> {
        self.array.is_in(set)
    }

    /// Package as a single-column table for composition with frames.
    pub fn to_table(&self, column_name: Option<&str>) -> FrameResult<RecordBatch> {
        let name = column_name.unwrap_or_else(|| {
            if self.name.is_empty() {
                "index"
            } else {
                &self.name
            }
        });
        let field = Field::new(name, self.dtype().clone(), true);
        let schema = Arc::new(Schema::new(vec![field]));
        RecordBatch::try_new(schema, vec![self.array.inner().clone()]).map_err(|err| {
            FrameError::invalid_argument()
                .with_operation("Index::to_table")
                .with_message(err.to_string())
        })
    }
}

fn scan_monotonicity(array: &Array) -> FrameResult<Monotonicity> {
    if array.null_count() > 0 {
        return Ok(Monotonicity::NotMonotonic);
    }
    let mut non_decreasing = true;
    let mut non_increasing = true;
    for i in 1..array.len() as i64 {
        let prev = array.at(i - 1)?;
        let next = array.at(i)?;
        match prev.compare(&next) {
            Ok(std::cmp::Ordering::Less) => non_increasing = false,
            Ok(std::cmp::Ordering::Greater) => non_decreasing = false,
            Ok(std::cmp::Ordering::Equal) => {}
            Err(_) => return Ok(Monotonicity::NotMonotonic),
        }
        if !non_decreasing && !non_increasing {
            return Ok(Monotonicity::NotMonotonic);
        }
    }
    Ok(if non_decreasing {
        Monotonicity::Increasing
    } else {
        Monotonicity::Decreasing
    })
}
