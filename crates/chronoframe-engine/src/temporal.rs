//! Temporal accessor for timestamp-typed arrays and scalars.
//!
//! `Array::dt()` validates the backing type once and exposes the field
//! extractors, rounding, formatting, and timezone operations. Field math
//! is civil (chrono) over the local wall clock; zone resolution goes
//! through the same policy helpers as the scalar path.

use std::sync::Arc;

use arrow_array::{Array as ArrowArray, BooleanArray, Int64Array, StringArray,
    TimestampNanosecondArray};
use chrono::{Datelike, NaiveDateTime, Timelike, Utc, Weekday, TimeZone};
use chrono_tz::{OffsetComponents, Tz};

use chronoframe_common::{AmbiguousTime, FrameError, FrameResult, NonexistentTime};

use crate::array::Array;
use crate::datetime::offsets::TickUnit;
use crate::datetime::types::{DateTime, days_in_month, is_leap_year, naive_to_nanos,
    nanos_to_naive, resolve_local};
use crate::scalar::{Scalar, timestamp_type};

/// Options for `day_of_week`: which day starts the week and whether
/// numbering begins at zero.
#[derive(Debug, Copy, Clone)]
pub struct DayOfWeekOptions {
    pub count_from_zero: bool,
    pub week_start: Weekday,
}

impl Default for DayOfWeekOptions {
    fn default() -> Self {
        DayOfWeekOptions {
            count_from_zero: true,
            week_start: Weekday::Mon,
        }
    }
}

/// ISO year/week/day triple as three aligned arrays.
#[derive(Debug, Clone)]
pub struct IsoCalendar {
    pub year: Array,
    pub week: Array,
    pub day: Array,
}

/// Rounding granularity: `multiple` ticks of `unit`.
#[derive(Debug, Copy, Clone)]
pub struct RoundTo {
    pub multiple: i64,
    pub unit: TickUnit,
}

impl RoundTo {
    pub fn nanos(&self) -> FrameResult<i64> {
        self.multiple.checked_mul(self.unit.nanos()).ok_or_else(|| {
            FrameError::overflow().with_operation("RoundTo::nanos")
        })
    }
}

pub struct TemporalArray<'a> {
    array: &'a Array,
    tz: Option<Tz>,
}

impl Array {
    /// Temporal accessor; fails unless the array is timestamp-typed.
    pub fn dt(&self) -> FrameResult<TemporalArray<'_>> {
        let tz = self.timestamp_tz()?;
        Ok(TemporalArray { array: self, tz })
    }
}

impl<'a> TemporalArray<'a> {
    pub fn tz(&self) -> Option<Tz> {
        self.tz
    }

    fn typed(&self) -> FrameResult<&TimestampNanosecondArray> {
        self.array.timestamps()
    }

    fn local(&self, value: i64) -> NaiveDateTime {
        match self.tz {
            None => nanos_to_naive(value),
            Some(tz) => Utc.timestamp_nanos(value).with_timezone(&tz).naive_local(),
        }
    }

    fn extract_i64<F>(&self, f: F) -> FrameResult<Array>
    where
        F: Fn(NaiveDateTime) -> i64,
    {
        let typed = self.typed()?;
        let mut out: Vec<Option<i64>> = Vec::with_capacity(typed.len());
        for i in 0..typed.len() {
            out.push(if typed.is_valid(i) {
                Some(f(self.local(typed.value(i))))
            } else {
                None
            });
        }
        Ok(Array::new(Arc::new(Int64Array::from(out))))
    }

    fn extract_bool<F>(&self, f: F) -> FrameResult<Array>
    where
        F: Fn(i64) -> bool,
    {
        let typed = self.typed()?;
        let mut out: Vec<Option<bool>> = Vec::with_capacity(typed.len());
        for i in 0..typed.len() {
            out.push(if typed.is_valid(i) {
                Some(f(typed.value(i)))
            } else {
                None
            });
        }
        Ok(Array::new(Arc::new(BooleanArray::from(out))))
    }

    /// Rebuild a timestamp array from transformed raw values, keeping the
    /// source zone.
    fn rebuild(&self, values: Vec<Option<i64>>, tz: Option<Tz>) -> Array {
        let array = TimestampNanosecondArray::from(values)
            .with_timezone_opt(tz.map(|tz| tz.name().to_string()));
        Array::new(Arc::new(array))
    }

    /* ─────────────────────── field extraction ─────────────────── */

    pub fn year(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.year() as i64)
    }

    pub fn month(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.month() as i64)
    }

    pub fn day(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.day() as i64)
    }

    pub fn hour(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.hour() as i64)
    }

    pub fn minute(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.minute() as i64)
    }

    pub fn second(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.second() as i64)
    }

    pub fn microsecond(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| (dt.nanosecond() / 1_000) as i64 % 1_000_000)
    }

    /// Nanoseconds within the microsecond.
    pub fn nanosecond(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| (dt.nanosecond() % 1_000) as i64)
    }

    pub fn day_of_week(&self, options: DayOfWeekOptions) -> FrameResult<Array> {
        let start = options.week_start.num_days_from_monday() as i64;
        let base = if options.count_from_zero { 0 } else { 1 };
        self.extract_i64(move |dt| {
            let from_monday = dt.weekday().num_days_from_monday() as i64;
            (from_monday - start).rem_euclid(7) + base
        })
    }

    pub fn day_of_year(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.ordinal() as i64)
    }

    pub fn iso_week(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.iso_week().week() as i64)
    }

    pub fn iso_year(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| dt.iso_week().year() as i64)
    }

    pub fn iso_calendar(&self) -> FrameResult<IsoCalendar> {
        Ok(IsoCalendar {
            year: self.iso_year()?,
            week: self.iso_week()?,
            day: self.day_of_week(DayOfWeekOptions {
                count_from_zero: false,
                week_start: Weekday::Mon,
            })?,
        })
    }

    /// ISO week number; `week_start` other than Monday counts weeks from
    /// that weekday instead.
    pub fn week(&self, week_start: Weekday) -> FrameResult<Array> {
        if week_start == Weekday::Mon {
            return self.iso_week();
        }
        let shift = week_start.num_days_from_monday() as i64;
        self.extract_i64(move |dt| {
            let shifted = dt.date() - chrono::Duration::days(shift);
            shifted.iso_week().week() as i64
        })
    }

    pub fn quarter(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| ((dt.month() as i64 - 1) / 3) + 1)
    }

    pub fn is_leap_year(&self) -> FrameResult<Array> {
        let tz = self.tz;
        let local = move |value: i64| match tz {
            None => nanos_to_naive(value),
            Some(tz) => Utc.timestamp_nanos(value).with_timezone(&tz).naive_local(),
        };
        self.extract_bool(move |value| is_leap_year(local(value).year()))
    }

    pub fn days_in_month(&self) -> FrameResult<Array> {
        self.extract_i64(|dt| days_in_month(dt.year(), dt.month()) as i64)
    }

    /// Daylight-saving flag; requires a zoned array.
    pub fn is_dst(&self) -> FrameResult<Array> {
        let tz = self.tz.ok_or_else(|| {
            FrameError::invalid_argument()
                .with_operation("TemporalArray::is_dst")
                .with_message("is_dst requires a timezone-aware array")
        })?;
        self.extract_bool(move |value| {
            let utc = nanos_to_naive(value);
            let offset = tz.offset_from_utc_datetime(&utc);
            !offset.dst_offset().is_zero()
        })
    }

    /// (year, month, day) as three aligned arrays.
    pub fn year_month_day(&self) -> FrameResult<(Array, Array, Array)> {
        Ok((self.year()?, self.month()?, self.day()?))
    }

    /* ────────────────── normalize / floor / ceil ──────────────── */

    /// Truncate to local midnight.
    pub fn normalize(&self) -> FrameResult<Array> {
        self.round_with(RoundTo {
            multiple: 1,
            unit: TickUnit::Day,
        }, RoundMode::Floor)
    }

    pub fn floor(&self, to: RoundTo) -> FrameResult<Array> {
        self.round_with(to, RoundMode::Floor)
    }

    pub fn ceil(&self, to: RoundTo) -> FrameResult<Array> {
        self.round_with(to, RoundMode::Ceil)
    }

    /// Round half to even at the requested granularity.
    pub fn round(&self, to: RoundTo) -> FrameResult<Array> {
        self.round_with(to, RoundMode::HalfEven)
    }

    fn round_with(&self, to: RoundTo, mode: RoundMode) -> FrameResult<Array> {
        let step = to.nanos()?;
        if step <= 0 {
            return Err(FrameError::invalid_argument()
                .with_operation("TemporalArray::round")
                .with_message("rounding multiple must be positive"));
        }
        let typed = self.typed()?;
        let mut out: Vec<Option<i64>> = Vec::with_capacity(typed.len());
        for i in 0..typed.len() {
            if !typed.is_valid(i) {
                out.push(None);
                continue;
            }
            // Round the local wall clock, then re-resolve the zone.
            let wall = naive_to_nanos(self.local(typed.value(i)))?;
            let rounded = round_nanos(wall, step, mode);
            let value = match self.tz {
                None => rounded,
                Some(tz) => resolve_local(
                    nanos_to_naive(rounded),
                    tz,
                    AmbiguousTime::Earliest,
                    NonexistentTime::ShiftForward,
                )?
                .ok_or_else(|| {
                    FrameError::new(chronoframe_common::FrameErrorKind::NonexistentTime)
                        .with_operation("TemporalArray::round")
                })?,
            };
            out.push(Some(value));
        }
        Ok(self.rebuild(out, self.tz))
    }

    /* ─────────────────────── formatting ───────────────────────── */

    pub fn strftime(&self, format: &str) -> FrameResult<Array> {
        let typed = self.typed()?;
        let mut out: Vec<Option<String>> = Vec::with_capacity(typed.len());
        for i in 0..typed.len() {
            out.push(if typed.is_valid(i) {
                Some(self.local(typed.value(i)).format(format).to_string())
            } else {
                None
            });
        }
        Ok(Array::new(Arc::new(StringArray::from(out))))
    }

    /* ─────────────────────── timezone ops ─────────────────────── */

    /// Attach a zone to a naive array (wall times are interpreted in
    /// `tz`); `None` strips the zone keeping the wall clock. NaT policy
    /// results become nulls.
    pub fn tz_localize(
        &self,
        tz: Option<Tz>,
        ambiguous: AmbiguousTime,
        nonexistent: NonexistentTime,
    ) -> FrameResult<Array> {
        match tz {
            None => {
                let typed = self.typed()?;
                let mut out = Vec::with_capacity(typed.len());
                for i in 0..typed.len() {
                    out.push(if typed.is_valid(i) {
                        Some(naive_to_nanos(self.local(typed.value(i)))?)
                    } else {
                        None
                    });
                }
                Ok(self.rebuild(out, None))
            }
            Some(tz) => {
                if self.tz.is_some() {
                    return Err(FrameError::invalid_argument()
                        .with_operation("TemporalArray::tz_localize")
                        .with_message("array is already timezone-aware; use tz_convert")
                        .with_label(format!("{}", self.array.dtype())));
                }
                let typed = self.typed()?;
                let mut out = Vec::with_capacity(typed.len());
                for i in 0..typed.len() {
                    if !typed.is_valid(i) {
                        out.push(None);
                        continue;
                    }
                    let naive = nanos_to_naive(typed.value(i));
                    out.push(resolve_local(naive, tz, ambiguous, nonexistent)?);
                }
                Ok(self.rebuild(out, Some(tz)))
            }
        }
    }

    /// Move an aware array to another zone; instants are unchanged.
    pub fn tz_convert(&self, tz: Tz) -> FrameResult<Array> {
        if self.tz.is_none() {
            return Err(FrameError::invalid_argument()
                .with_operation("TemporalArray::tz_convert")
                .with_message("cannot convert a naive array; use tz_localize")
                .with_label(format!("{}", self.array.dtype())));
        }
        let typed = self.typed()?;
        let values: Vec<Option<i64>> = (0..typed.len())
            .map(|i| typed.is_valid(i).then(|| typed.value(i)))
            .collect();
        Ok(self.rebuild(values, Some(tz)))
    }

    /// Reinterpret wall times in a different zone (or none).
    pub fn replace_tz(&self, tz: Option<Tz>) -> FrameResult<Array> {
        let typed = self.typed()?;
        let mut out = Vec::with_capacity(typed.len());
        for i in 0..typed.len() {
            if !typed.is_valid(i) {
                out.push(None);
                continue;
            }
            let wall = self.local(typed.value(i));
            out.push(match tz {
                None => Some(naive_to_nanos(wall)?),
                Some(tz) => resolve_local(
                    wall,
                    tz,
                    AmbiguousTime::Earliest,
                    NonexistentTime::ShiftForward,
                )?,
            });
        }
        Ok(self.rebuild(out, tz))
    }

    /// Local wall-clock view as a naive array.
    pub fn local_timestamp(&self) -> FrameResult<Array> {
        self.tz_localize(None, AmbiguousTime::Raise, NonexistentTime::Raise)
    }
}

#[derive(Copy, Clone, PartialEq)]
enum RoundMode {
    Floor,
    Ceil,
    HalfEven,
}

fn round_nanos(value: i64, step: i64, mode: RoundMode) -> i64 {
    let q = value.div_euclid(step);
    let r = value.rem_euclid(step);
    match mode {
        RoundMode::Floor => q * step,
        RoundMode::Ceil => {
            if r == 0 {
                value
            } else {
                (q + 1) * step
            }
        }
        RoundMode::HalfEven => {
            let twice = r * 2;
            if twice > step || (twice == step && q % 2 != 0) {
                (q + 1) * step
            } else {
                q * step
            }
        }
    }
}

/// Temporal accessor over a single timestamp scalar.
pub struct TemporalScalar {
    value: DateTime,
}

impl Scalar {
    pub fn dt(&self) -> FrameResult<TemporalScalar> {
        Ok(TemporalScalar {
            value: self.as_datetime()?,
        })
    }
}

impl TemporalScalar {
    pub fn datetime(&self) -> DateTime {
        self.value
    }

    pub fn tz(&self) -> Option<Tz> {
        self.value.tz()
    }

    pub fn year(&self) -> i64 {
        self.value.year() as i64
    }

    pub fn month(&self) -> i64 {
        self.value.month() as i64
    }

    pub fn day(&self) -> i64 {
        self.value.day() as i64
    }

    pub fn weekday(&self) -> Weekday {
        self.value.weekday()
    }

    pub fn normalize(&self) -> FrameResult<Scalar> {
        Ok(Scalar::from_datetime(&self.value.normalize()?))
    }

    pub fn tz_localize(
        &self,
        tz: Tz,
        ambiguous: AmbiguousTime,
        nonexistent: NonexistentTime,
    ) -> FrameResult<Scalar> {
        match self.value.tz_localize(tz, ambiguous, nonexistent)? {
            Some(dt) => Ok(Scalar::from_datetime(&dt)),
            None => Ok(Scalar::Null(timestamp_type(Some(tz)))),
        }
    }

    pub fn tz_convert(&self, tz: Tz) -> FrameResult<Scalar> {
        Ok(Scalar::from_datetime(&self.value.tz_convert(tz)?))
    }

    pub fn replace_tz(&self, tz: Option<Tz>) -> FrameResult<Scalar> {
        Ok(Scalar::from_datetime(&self.value.replace_tz(tz)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::types::tz_from_str;
    use crate::factory::array::timestamps_from_strs;

    fn naive(values: &[&str]) -> Array {
        timestamps_from_strs(values, None).unwrap()
    }

    #[test]
    fn field_extraction_over_wall_times() {
        let arr = naive(&["2023-03-04 05:06:07", "2024-12-31 23:59:59"]);
        let dt = arr.dt().unwrap();
        let year = dt.year().unwrap();
        assert_eq!(year.at(0).unwrap(), Scalar::Int64(2023));
        assert_eq!(year.at(1).unwrap(), Scalar::Int64(2024));
        assert_eq!(dt.month().unwrap().at(0).unwrap(), Scalar::Int64(3));
        assert_eq!(dt.day().unwrap().at(0).unwrap(), Scalar::Int64(4));
        assert_eq!(dt.hour().unwrap().at(0).unwrap(), Scalar::Int64(5));
        assert_eq!(dt.quarter().unwrap().at(1).unwrap(), Scalar::Int64(4));
        assert_eq!(dt.day_of_year().unwrap().at(0).unwrap(), Scalar::Int64(63));
        assert_eq!(
            dt.days_in_month().unwrap().at(0).unwrap(),
            Scalar::Int64(31)
        );
        assert_eq!(
            dt.is_leap_year().unwrap().at(1).unwrap(),
            Scalar::Boolean(true)
        );
    }

    #[test]
    fn day_of_week_numbering_options() {
        // 2023-03-04 is a Saturday.
        let arr = naive(&["2023-03-04"]);
        let dt = arr.dt().unwrap();
        assert_eq!(
            dt.day_of_week(DayOfWeekOptions::default())
                .unwrap()
                .at(0)
                .unwrap(),
            Scalar::Int64(5)
        );
        assert_eq!(
            dt.day_of_week(DayOfWeekOptions {
                count_from_zero: false,
                week_start: Weekday::Sun,
            })
            .unwrap()
            .at(0)
            .unwrap(),
            Scalar::Int64(7)
        );
    }

    #[test]
    fn iso_calendar_fields_agree() {
        // 2021-01-01 is a Friday in ISO week 53 of ISO year 2020.
        let arr = naive(&["2021-01-01"]);
        let dt = arr.dt().unwrap();
        let iso = dt.iso_calendar().unwrap();
        assert_eq!(iso.year.at(0).unwrap(), Scalar::Int64(2020));
        assert_eq!(iso.week.at(0).unwrap(), Scalar::Int64(53));
        assert_eq!(iso.day.at(0).unwrap(), Scalar::Int64(5));
    }

    #[test]
    fn rounding_modes() {
        let arr = naive(&["2021-05-06 07:38:00"]);
        let dt = arr.dt().unwrap();
        let to = RoundTo {
            multiple: 1,
            unit: TickUnit::Hour,
        };
        assert_eq!(
            dt.floor(to).unwrap().dt().unwrap().hour().unwrap().at(0).unwrap(),
            Scalar::Int64(7)
        );
        assert_eq!(
            dt.ceil(to).unwrap().dt().unwrap().hour().unwrap().at(0).unwrap(),
            Scalar::Int64(8)
        );
        assert_eq!(
            dt.round(to).unwrap().dt().unwrap().hour().unwrap().at(0).unwrap(),
            Scalar::Int64(8)
        );
        let normalized = dt.normalize().unwrap();
        assert_eq!(
            normalized.dt().unwrap().hour().unwrap().at(0).unwrap(),
            Scalar::Int64(0)
        );
    }

    #[test]
    fn strftime_formats_wall_times() {
        let arr = naive(&["2021-05-06 07:08:09"]);
        let formatted = arr.dt().unwrap().strftime("%Y/%m/%d %H:%M").unwrap();
        assert_eq!(
            formatted.at(0).unwrap(),
            Scalar::Utf8("2021/05/06 07:08".to_string())
        );
    }

    #[test]
    fn localize_convert_strip_round_trip() {
        let ny = tz_from_str("America/New_York").unwrap();
        let arr = naive(&["2021-06-01 12:00:00"]);
        let localized = arr
            .dt()
            .unwrap()
            .tz_localize(Some(ny), AmbiguousTime::Raise, NonexistentTime::Raise)
            .unwrap();
        assert!(localized.timestamp_tz().unwrap().is_some());

        // Double localization is rejected.
        assert!(
            localized
                .dt()
                .unwrap()
                .tz_localize(Some(ny), AmbiguousTime::Raise, NonexistentTime::Raise)
                .is_err()
        );
        // Naive conversion is rejected.
        assert!(arr.dt().unwrap().tz_convert(chrono_tz::UTC).is_err());

        // Convert preserves the instant; strip recovers the wall time.
        let utc = localized.dt().unwrap().tz_convert(chrono_tz::UTC).unwrap();
        let instant_before = localized.timestamps().unwrap().value(0);
        assert_eq!(utc.timestamps().unwrap().value(0), instant_before);

        let back = utc
            .dt()
            .unwrap()
            .tz_convert(ny)
            .unwrap()
            .dt()
            .unwrap()
            .tz_localize(None, AmbiguousTime::Raise, NonexistentTime::Raise)
            .unwrap();
        assert!(back.equals(&arr));
    }

    #[test]
    fn is_dst_flags_summer_time() {
        let ny = tz_from_str("America/New_York").unwrap();
        let arr = naive(&["2021-06-01 12:00:00", "2021-01-01 12:00:00"]);
        let aware = arr
            .dt()
            .unwrap()
            .tz_localize(Some(ny), AmbiguousTime::Raise, NonexistentTime::Raise)
            .unwrap();
        let dst = aware.dt().unwrap().is_dst().unwrap();
        assert_eq!(dst.at(0).unwrap(), Scalar::Boolean(true));
        assert_eq!(dst.at(1).unwrap(), Scalar::Boolean(false));
        assert!(arr.dt().unwrap().is_dst().is_err());
    }

    #[test]
    fn scalar_accessor_mirrors_array_fields() {
        let scalar = Scalar::from_datetime(&DateTime::parse("2014-01-17 09:30:00").unwrap());
        let dt = scalar.dt().unwrap();
        assert_eq!(dt.year(), 2014);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 17);
        assert_eq!(dt.weekday(), Weekday::Fri);
        let normalized = dt.normalize().unwrap();
        assert_eq!(
            normalized.dt().unwrap().datetime(),
            DateTime::parse("2014-01-17").unwrap()
        );
    }
}
