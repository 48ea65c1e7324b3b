//! Typed scalar values.
//!
//! `Scalar` is the tagged single-value counterpart of `Array`: either
//! null-with-a-declared-type or a typed value. The declared type never
//! changes after construction; typed extraction requires agreement, and
//! comparisons accept compatible types only (integers widen against
//! floats).

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use arrow_array::{
    Array as ArrowArray, ArrayRef, BooleanArray, Date32Array, DurationNanosecondArray,
    Float64Array, Int32Array, Int64Array, StringArray, TimestampNanosecondArray, UInt32Array,
    UInt64Array,
};
use arrow_schema::{DataType, TimeUnit};
use chrono_tz::Tz;

use chronoframe_common::{FrameError, FrameResult};

use crate::datetime::types::{DateTime, tz_from_str};

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null(DataType),
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float64(f64),
    Utf8(String),
    /// Days since the Unix epoch.
    Date32(i32),
    /// Nanoseconds since the Unix epoch (UTC when zoned, wall otherwise).
    Timestamp { value: i64, tz: Option<Tz> },
    /// Nanoseconds.
    Duration(i64),
}

/// Hashable lookup key for a non-null scalar. Integer-valued floats and
/// unsigned values collapse onto the integer key so equal labels of
/// compatible types hit the same bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKey {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Str(String),
    Date(i32),
    Ts(i64),
    Dur(i64),
}

pub fn timestamp_type(tz: Option<Tz>) -> DataType {
    DataType::Timestamp(TimeUnit::Nanosecond, tz.map(|tz| Arc::from(tz.name())))
}

pub fn tz_of_type(dtype: &DataType) -> FrameResult<Option<Tz>> {
    match dtype {
        DataType::Timestamp(TimeUnit::Nanosecond, tz) => match tz {
            None => Ok(None),
            Some(name) => Ok(Some(tz_from_str(name)?)),
        },
        other => Err(FrameError::type_mismatch()
            .with_operation("tz_of_type")
            .with_message("expected a nanosecond timestamp type")
            .with_label(format!("{other}"))),
    }
}

impl Scalar {
    pub fn dtype(&self) -> DataType {
        match self {
            Scalar::Null(dtype) => dtype.clone(),
            Scalar::Boolean(_) => DataType::Boolean,
            Scalar::Int32(_) => DataType::Int32,
            Scalar::Int64(_) => DataType::Int64,
            Scalar::UInt32(_) => DataType::UInt32,
            Scalar::UInt64(_) => DataType::UInt64,
            Scalar::Float64(_) => DataType::Float64,
            Scalar::Utf8(_) => DataType::Utf8,
            Scalar::Date32(_) => DataType::Date32,
            Scalar::Timestamp { tz, .. } => timestamp_type(*tz),
            Scalar::Duration(_) => DataType::Duration(TimeUnit::Nanosecond),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null(_))
    }

    pub fn from_datetime(dt: &DateTime) -> Self {
        Scalar::Timestamp {
            value: dt.value(),
            tz: dt.tz(),
        }
    }

    /// Read position `i` of an arrow array. The position must be in
    /// bounds; null slots come back as `Null` with the array's type.
    pub fn from_array(array: &dyn ArrowArray, i: usize) -> FrameResult<Self> {
        if i >= array.len() {
            return Err(FrameError::out_of_range()
                .with_operation("Scalar::from_array")
                .with_position(i as i64));
        }
        if array.is_null(i) {
            return Ok(Scalar::Null(array.data_type().clone()));
        }
        macro_rules! get {
            ($ty:ty, $variant:expr) => {{
                let typed = array
                    .as_any()
                    .downcast_ref::<$ty>()
                    .ok_or_else(|| unsupported(array.data_type()))?;
                Ok($variant(typed.value(i)))
            }};
        }
        match array.data_type() {
            DataType::Boolean => get!(BooleanArray, Scalar::Boolean),
            DataType::Int32 => get!(Int32Array, Scalar::Int32),
            DataType::Int64 => get!(Int64Array, Scalar::Int64),
            DataType::UInt32 => get!(UInt32Array, Scalar::UInt32),
            DataType::UInt64 => get!(UInt64Array, Scalar::UInt64),
            DataType::Float64 => get!(Float64Array, Scalar::Float64),
            DataType::Utf8 => {
                let typed = array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| unsupported(array.data_type()))?;
                Ok(Scalar::Utf8(typed.value(i).to_string()))
            }
            DataType::Date32 => get!(Date32Array, Scalar::Date32),
            DataType::Duration(TimeUnit::Nanosecond) => {
                get!(DurationNanosecondArray, Scalar::Duration)
            }
            DataType::Timestamp(TimeUnit::Nanosecond, _) => {
                let tz = tz_of_type(array.data_type())?;
                let typed = array
                    .as_any()
                    .downcast_ref::<TimestampNanosecondArray>()
                    .ok_or_else(|| unsupported(array.data_type()))?;
                Ok(Scalar::Timestamp {
                    value: typed.value(i),
                    tz,
                })
            }
            other => Err(unsupported(other)),
        }
    }

    /// Materialize as a one-element arrow array; the broadcasting form
    /// used to pass scalars into compute kernels.
    pub fn to_single_array(&self) -> FrameResult<ArrayRef> {
        Ok(match self {
            Scalar::Null(dtype) => arrow_array::new_null_array(dtype, 1),
            Scalar::Boolean(v) => Arc::new(BooleanArray::from(vec![Some(*v)])),
            Scalar::Int32(v) => Arc::new(Int32Array::from(vec![Some(*v)])),
            Scalar::Int64(v) => Arc::new(Int64Array::from(vec![Some(*v)])),
            Scalar::UInt32(v) => Arc::new(UInt32Array::from(vec![Some(*v)])),
            Scalar::UInt64(v) => Arc::new(UInt64Array::from(vec![Some(*v)])),
            Scalar::Float64(v) => Arc::new(Float64Array::from(vec![Some(*v)])),
            Scalar::Utf8(v) => Arc::new(StringArray::from(vec![Some(v.as_str())])),
            Scalar::Date32(v) => Arc::new(Date32Array::from(vec![Some(*v)])),
            Scalar::Timestamp { value, tz } => {
                let array = TimestampNanosecondArray::from(vec![Some(*value)]);
                Arc::new(
                    array.with_timezone_opt(tz.map(|tz| tz.name().to_string())),
                )
            }
            Scalar::Duration(v) => Arc::new(DurationNanosecondArray::from(vec![Some(*v)])),
        })
    }

    pub fn as_bool(&self) -> FrameResult<bool> {
        match self {
            Scalar::Boolean(v) => Ok(*v),
            Scalar::Null(_) => Err(self.null_err("as_bool")),
            _ => Err(self.type_err("as_bool", "boolean")),
        }
    }

    pub fn as_i64(&self) -> FrameResult<i64> {
        match self {
            Scalar::Int32(v) => Ok(*v as i64),
            Scalar::Int64(v) => Ok(*v),
            Scalar::UInt32(v) => Ok(*v as i64),
            Scalar::UInt64(v) => i64::try_from(*v).map_err(|_| {
                FrameError::overflow()
                    .with_operation("Scalar::as_i64")
                    .with_label(v.to_string())
            }),
            Scalar::Null(_) => Err(self.null_err("as_i64")),
            _ => Err(self.type_err("as_i64", "integer")),
        }
    }

    pub fn as_f64(&self) -> FrameResult<f64> {
        match self {
            Scalar::Float64(v) => Ok(*v),
            Scalar::Int32(v) => Ok(*v as f64),
            Scalar::Int64(v) => Ok(*v as f64),
            Scalar::UInt32(v) => Ok(*v as f64),
            Scalar::UInt64(v) => Ok(*v as f64),
            Scalar::Null(_) => Err(self.null_err("as_f64")),
            _ => Err(self.type_err("as_f64", "numeric")),
        }
    }

    pub fn as_str(&self) -> FrameResult<&str> {
        match self {
            Scalar::Utf8(v) => Ok(v.as_str()),
            Scalar::Null(_) => Err(self.null_err("as_str")),
            _ => Err(self.type_err("as_str", "utf8")),
        }
    }

    pub fn as_datetime(&self) -> FrameResult<DateTime> {
        match self {
            Scalar::Timestamp { value, tz } => Ok(DateTime::new(*value, *tz)),
            Scalar::Date32(days) => Ok(DateTime::new(
                *days as i64 * 86_400 * 1_000_000_000,
                None,
            )),
            Scalar::Null(_) => Err(self.null_err("as_datetime")),
            _ => Err(self.type_err("as_datetime", "timestamp")),
        }
    }

    /// Cast through the runtime's cast kernel.
    pub fn cast(&self, dtype: &DataType) -> FrameResult<Scalar> {
        let single = self.to_single_array()?;
        let casted = arrow::compute::cast(single.as_ref(), dtype)
            .map_err(|err| {
                FrameError::type_mismatch()
                    .with_operation("Scalar::cast")
                    .with_message(err.to_string())
                    .with_label(format!("{} -> {dtype}", self.dtype()))
            })?;
        Scalar::from_array(casted.as_ref(), 0)
    }

    /// Lookup key; `None` for null.
    pub fn key(&self) -> Option<ScalarKey> {
        match self {
            Scalar::Null(_) => None,
            Scalar::Boolean(v) => Some(ScalarKey::Bool(*v)),
            Scalar::Int32(v) => Some(ScalarKey::Int(*v as i64)),
            Scalar::Int64(v) => Some(ScalarKey::Int(*v)),
            Scalar::UInt32(v) => Some(ScalarKey::Int(*v as i64)),
            Scalar::UInt64(v) => Some(match i64::try_from(*v) {
                Ok(signed) => ScalarKey::Int(signed),
                Err(_) => ScalarKey::UInt(*v),
            }),
            Scalar::Float64(v) => Some(float_key(*v)),
            Scalar::Utf8(v) => Some(ScalarKey::Str(v.clone())),
            Scalar::Date32(v) => Some(ScalarKey::Date(*v)),
            Scalar::Timestamp { value, .. } => Some(ScalarKey::Ts(*value)),
            Scalar::Duration(v) => Some(ScalarKey::Dur(*v)),
        }
    }

    /// Ordering between compatible scalars. Nulls do not compare.
    pub fn compare(&self, other: &Scalar) -> FrameResult<Ordering> {
        use Scalar::*;
        if self.is_null() || other.is_null() {
            return Err(FrameError::null_deref()
                .with_operation("Scalar::compare")
                .with_message("null scalars are unordered"));
        }
        let ordering = match (self, other) {
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Utf8(a), Utf8(b)) => a.cmp(b),
            (Date32(a), Date32(b)) => a.cmp(b),
            (Duration(a), Duration(b)) => a.cmp(b),
            (Timestamp { value: a, .. }, Timestamp { value: b, .. }) => a.cmp(b),
            (a, b) => {
                let (x, y) = (a.as_f64()?, b.as_f64()?);
                x.partial_cmp(&y).ok_or_else(|| {
                    FrameError::invalid_argument()
                        .with_operation("Scalar::compare")
                        .with_message("NaN is unordered")
                })?
            }
        };
        Ok(ordering)
    }
}

fn float_key(v: f64) -> ScalarKey {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        ScalarKey::Int(v as i64)
    } else if v.is_nan() {
        ScalarKey::Float(f64::NAN.to_bits())
    } else {
        // Collapse -0.0 onto +0.0.
        ScalarKey::Float((v + 0.0).to_bits())
    }
}

fn unsupported(dtype: &DataType) -> FrameError {
    FrameError::type_mismatch()
        .with_operation("Scalar::from_array")
        .with_message("unsupported array type")
        .with_label(format!("{dtype}"))
}

impl Scalar {
    fn null_err(&self, op: &str) -> FrameError {
        FrameError::null_deref()
            .with_operation(format!("Scalar::{op}"))
            .with_label(format!("{}", self.dtype()))
    }

    fn type_err(&self, op: &str, wanted: &str) -> FrameError {
        FrameError::type_mismatch()
            .with_operation(format!("Scalar::{op}"))
            .with_message(format!("expected {wanted}"))
            .with_label(format!("{}", self.dtype()))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null(_) => write!(f, "null"),
            Scalar::Boolean(v) => write!(f, "{v}"),
            Scalar::Int32(v) => write!(f, "{v}"),
            Scalar::Int64(v) => write!(f, "{v}"),
            Scalar::UInt32(v) => write!(f, "{v}"),
            Scalar::UInt64(v) => write!(f, "{v}"),
            Scalar::Float64(v) => write!(f, "{v}"),
            Scalar::Utf8(v) => write!(f, "{v}"),
            Scalar::Date32(v) => write!(f, "date32({v})"),
            Scalar::Timestamp { value, tz } => write!(f, "{}", DateTime::new(*value, *tz)),
            Scalar::Duration(v) => write!(f, "{v}ns"),
        }
    }
}
