//! Array builders.

use std::sync::Arc;

use arrow_array::{
    ArrayRef, BooleanArray, Date32Array, DurationNanosecondArray, Float64Array, Int32Array,
    Int64Array, StringArray, TimestampNanosecondArray, UInt32Array, UInt64Array,
};
use arrow_schema::{DataType, TimeUnit};
use chrono_tz::Tz;

use chronoframe_common::{FrameError, FrameResult};

use crate::array::Array;
use crate::datetime::types::DateTime;
use crate::scalar::Scalar;

pub fn from_slice_i64(values: &[i64]) -> Array {
    Array::new(Arc::new(Int64Array::from(values.to_vec())))
}

pub fn from_slice_f64(values: &[f64]) -> Array {
    Array::new(Arc::new(Float64Array::from(values.to_vec())))
}

pub fn from_slice_bool(values: &[bool]) -> Array {
    Array::new(Arc::new(BooleanArray::from(values.to_vec())))
}

pub fn from_slice_str(values: &[&str]) -> Array {
    Array::new(Arc::new(StringArray::from(values.to_vec())))
}

pub fn from_options_i64(values: Vec<Option<i64>>) -> Array {
    Array::new(Arc::new(Int64Array::from(values)))
}

pub fn from_options_f64(values: Vec<Option<f64>>) -> Array {
    Array::new(Arc::new(Float64Array::from(values)))
}

pub fn from_options_bool(values: Vec<Option<bool>>) -> Array {
    Array::new(Arc::new(BooleanArray::from(values)))
}

pub fn nulls(dtype: &DataType, len: usize) -> Array {
    Array::new(arrow_array::new_null_array(dtype, len))
}

/// Timestamp array from engine datetimes. The array type carries `tz`;
/// the values are taken as stored (UTC instants when zoned).
pub fn from_datetimes(values: Vec<Option<DateTime>>, tz: Option<Tz>) -> FrameResult<Array> {
    let raw: Vec<Option<i64>> = values.iter().map(|v| v.map(|dt| dt.value())).collect();
    let array = TimestampNanosecondArray::from(raw)
        .with_timezone_opt(tz.map(|tz| tz.name().to_string()));
    Ok(Array::new(Arc::new(array)))
}

/// Parse naive datetime literals, optionally localizing into `tz`.
pub fn timestamps_from_strs(values: &[&str], tz: Option<Tz>) -> FrameResult<Array> {
    let mut out = Vec::with_capacity(values.len());
    for s in values {
        let naive = DateTime::parse(s)?;
        let resolved = match tz {
            None => naive,
            Some(tz) => naive
                .tz_localize(
                    tz,
                    chronoframe_common::AmbiguousTime::Raise,
                    chronoframe_common::NonexistentTime::Raise,
                )?
                .ok_or_else(|| {
                    FrameError::invalid_argument().with_operation("timestamps_from_strs")
                })?,
        };
        out.push(Some(resolved));
    }
    from_datetimes(out, tz)
}

/// Parse datetime strings with an explicit chrono format.
pub fn strptime(values: &[&str], format: &str) -> FrameResult<Array> {
    let mut out = Vec::with_capacity(values.len());
    for s in values {
        let naive = chrono::NaiveDateTime::parse_from_str(s, format)
            .or_else(|_| {
                chrono::NaiveDate::parse_from_str(s, format)
                    .map(|d| d.and_time(chrono::NaiveTime::MIN))
            })
            .map_err(|err| {
                FrameError::invalid_argument()
                    .with_operation("strptime")
                    .with_message(err.to_string())
                    .with_label(s.to_string())
            })?;
        out.push(Some(DateTime::from_naive(naive)?));
    }
    from_datetimes(out, None)
}

/// Build a typed array from scalars. Each non-null scalar must be
/// compatible with `dtype`.
pub fn from_scalars(values: Vec<Scalar>, dtype: &DataType) -> FrameResult<Array> {
    let mismatch = |scalar: &Scalar| {
        FrameError::type_mismatch()
            .with_operation("from_scalars")
            .with_message(format!("scalar {} does not fit array type {dtype}", scalar.dtype()))
    };
    macro_rules! collect {
        ($extract:expr, $build:expr) => {{
            let mut out = Vec::with_capacity(values.len());
            for v in &values {
                if v.is_null() {
                    out.push(None);
                } else {
                    out.push(Some($extract(v).map_err(|_| mismatch(v))?));
                }
            }
            Ok(Array::new($build(out)))
        }};
    }
    match dtype {
        DataType::Int64 => collect!(
            |v: &Scalar| v.as_i64(),
            |out: Vec<Option<i64>>| -> ArrayRef { Arc::new(Int64Array::from(out)) }
        ),
        DataType::Int32 => collect!(
            |v: &Scalar| v.as_i64().map(|x| x as i32),
            |out: Vec<Option<i32>>| -> ArrayRef { Arc::new(Int32Array::from(out)) }
        ),
        DataType::UInt32 => collect!(
            |v: &Scalar| v.as_i64().map(|x| x as u32),
            |out: Vec<Option<u32>>| -> ArrayRef { Arc::new(UInt32Array::from(out)) }
        ),
        DataType::UInt64 => collect!(
            |v: &Scalar| v.as_i64().map(|x| x as u64),
            |out: Vec<Option<u64>>| -> ArrayRef { Arc::new(UInt64Array::from(out)) }
        ),
        DataType::Float64 => collect!(
            |v: &Scalar| v.as_f64(),
            |out: Vec<Option<f64>>| -> ArrayRef { Arc::new(Float64Array::from(out)) }
        ),
        DataType::Boolean => collect!(
            |v: &Scalar| v.as_bool(),
            |out: Vec<Option<bool>>| -> ArrayRef { Arc::new(BooleanArray::from(out)) }
        ),
        DataType::Utf8 => collect!(
            |v: &Scalar| v.as_str().map(|s| s.to_string()),
            |out: Vec<Option<String>>| -> ArrayRef { Arc::new(StringArray::from(out)) }
        ),
        DataType::Date32 => collect!(
            |v: &Scalar| match v {
                Scalar::Date32(d) => Ok(*d),
                _ => Err(FrameError::type_mismatch()),
            },
            |out: Vec<Option<i32>>| -> ArrayRef { Arc::new(Date32Array::from(out)) }
        ),
        DataType::Duration(TimeUnit::Nanosecond) => collect!(
            |v: &Scalar| match v {
                Scalar::Duration(d) => Ok(*d),
                _ => Err(FrameError::type_mismatch()),
            },
            |out: Vec<Option<i64>>| -> ArrayRef { Arc::new(DurationNanosecondArray::from(out)) }
        ),
        DataType::Timestamp(TimeUnit::Nanosecond, tz_name) => {
            let mut out: Vec<Option<i64>> = Vec::with_capacity(values.len());
            for v in &values {
                if v.is_null() {
                    out.push(None);
                } else {
                    match v {
                        Scalar::Timestamp { value, .. } => out.push(Some(*value)),
                        _ => return Err(mismatch(v)),
                    }
                }
            }
            let array = TimestampNanosecondArray::from(out)
                .with_timezone_opt(tz_name.as_ref().map(|s| s.to_string()));
            Ok(Array::new(Arc::new(array)))
        }
        other => Err(FrameError::type_mismatch()
            .with_operation("from_scalars")
            .with_message("unsupported array type")
            .with_label(format!("{other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip_through_arrays() {
        let array = from_scalars(
            vec![Scalar::Int64(1), Scalar::Null(DataType::Int64), Scalar::Int64(3)],
            &DataType::Int64,
        )
        .unwrap();
        assert_eq!(array.len(), 3);
        assert_eq!(array.null_count(), 1);
        assert_eq!(array.at(2).unwrap(), Scalar::Int64(3));

        assert!(from_scalars(vec![Scalar::Utf8("x".into())], &DataType::Int64).is_err());
    }

    #[test]
    fn strptime_applies_the_format() {
        let parsed = strptime(&["2021/05/06"], "%Y/%m/%d").unwrap();
        assert_eq!(
            parsed.at(0).unwrap().as_datetime().unwrap(),
            DateTime::parse("2021-05-06").unwrap()
        );
        assert!(strptime(&["garbage"], "%Y/%m/%d").is_err());
    }

    #[test]
    fn timestamp_strings_localize_when_asked() {
        let tz = crate::datetime::types::tz_from_str("Europe/Berlin").unwrap();
        let aware = timestamps_from_strs(&["2021-06-01 12:00:00"], Some(tz)).unwrap();
        assert_eq!(aware.timestamp_tz().unwrap(), Some(tz));
        let dt = aware.at(0).unwrap().as_datetime().unwrap();
        assert_eq!(dt.local().format("%H").to_string(), "12");
    }
}
