//! Timestamp value type.
//!
//! A `DateTime` carries an i64 nanosecond value plus an optional IANA
//! zone, following the arrow convention: zone-aware values are
//! nanoseconds since the Unix epoch in UTC, naive values are wall-clock
//! nanoseconds. Equality and ordering compare the stored value, so two
//! aware timestamps in different zones are equal when they name the same
//! instant.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime as ChronoDateTime, Datelike, Duration as ChronoDur, LocalResult, NaiveDate,
    NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;

use chronoframe_common::{AmbiguousTime, FrameError, FrameErrorKind, FrameResult, NonexistentTime};

use super::timedelta::TimeDelta;

/// Number of days in the given month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Parse an IANA zone name.
pub fn tz_from_str(name: &str) -> FrameResult<Tz> {
    Tz::from_str(name).map_err(|_| {
        FrameError::invalid_argument()
            .with_operation("tz_from_str")
            .with_message("unknown IANA timezone")
            .with_label(name.to_string())
    })
}

/// Wall-clock nanoseconds for a naive datetime.
pub fn naive_to_nanos(naive: NaiveDateTime) -> FrameResult<i64> {
    naive.and_utc().timestamp_nanos_opt().ok_or_else(|| {
        FrameError::overflow()
            .with_operation("naive_to_nanos")
            .with_label(naive.to_string())
    })
}

pub fn nanos_to_naive(value: i64) -> NaiveDateTime {
    ChronoDateTime::<Utc>::from_timestamp_nanos(value).naive_utc()
}

/// Resolve a local wall time in `tz` to UTC nanoseconds under the given
/// fold/gap policies. `Ok(None)` is the NaT outcome.
pub fn resolve_local(
    naive: NaiveDateTime,
    tz: Tz,
    ambiguous: AmbiguousTime,
    nonexistent: NonexistentTime,
) -> FrameResult<Option<i64>> {
    let to_nanos = |dt: ChronoDateTime<Tz>| {
        dt.timestamp_nanos_opt().ok_or_else(|| {
            FrameError::overflow()
                .with_operation("resolve_local")
                .with_label(naive.to_string())
        })
    };
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(Some(to_nanos(dt)?)),
        LocalResult::Ambiguous(earliest, latest) => match ambiguous {
            AmbiguousTime::Raise => Err(FrameError::new(FrameErrorKind::AmbiguousTime)
                .with_operation("tz_localize")
                .with_label(format!("{naive} [{}]", tz.name()))),
            AmbiguousTime::Earliest => Ok(Some(to_nanos(earliest)?)),
            AmbiguousTime::Latest => Ok(Some(to_nanos(latest)?)),
            AmbiguousTime::Nat => Ok(None),
        },
        LocalResult::None => match nonexistent {
            NonexistentTime::Raise => Err(FrameError::new(FrameErrorKind::NonexistentTime)
                .with_operation("tz_localize")
                .with_label(format!("{naive} [{}]", tz.name()))),
            NonexistentTime::Nat => Ok(None),
            NonexistentTime::ShiftForward => shift_out_of_gap(naive, tz, 1).map(Some),
            NonexistentTime::ShiftBackward => shift_out_of_gap(naive, tz, -1).map(Some),
        },
    }
}

/// Walk a wall time out of a DST gap one minute at a time, taking the
/// earliest interpretation once resolvable. Gaps are bounded well below a
/// day; the loop limit only guards malformed zone data.
fn shift_out_of_gap(naive: NaiveDateTime, tz: Tz, direction: i64) -> FrameResult<i64> {
    let step = ChronoDur::minutes(direction);
    let mut probe = naive;
    for _ in 0..(48 * 60) {
        probe += step;
        match tz.from_local_datetime(&probe) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
                return dt.timestamp_nanos_opt().ok_or_else(|| {
                    FrameError::overflow()
                        .with_operation("tz_localize")
                        .with_label(probe.to_string())
                });
            }
            LocalResult::None => continue,
        }
    }
    Err(FrameError::new(FrameErrorKind::NonexistentTime)
        .with_operation("tz_localize")
        .with_message("could not shift out of timezone gap")
        .with_label(naive.to_string()))
}

#[derive(Debug, Copy, Clone)]
pub struct DateTime {
    value: i64,
    tz: Option<Tz>,
}

impl DateTime {
    pub fn new(value: i64, tz: Option<Tz>) -> Self {
        DateTime { value, tz }
    }

    /// Naive timestamp from a wall-clock datetime.
    pub fn from_naive(naive: NaiveDateTime) -> FrameResult<Self> {
        Ok(DateTime {
            value: naive_to_nanos(naive)?,
            tz: None,
        })
    }

    /// Naive midnight timestamp from a calendar date.
    pub fn from_date(date: NaiveDate) -> FrameResult<Self> {
        Self::from_naive(date.and_time(NaiveTime::MIN))
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> FrameResult<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            FrameError::invalid_argument()
                .with_operation("DateTime::from_ymd")
                .with_label(format!("{year:04}-{month:02}-{day:02}"))
        })?;
        Self::from_date(date)
    }

    /// Zone-aware timestamp resolved from a local wall time with `Raise`
    /// policies.
    pub fn from_local(naive: NaiveDateTime, tz: Tz) -> FrameResult<Self> {
        match resolve_local(naive, tz, AmbiguousTime::Raise, NonexistentTime::Raise)? {
            Some(value) => Ok(DateTime {
                value,
                tz: Some(tz),
            }),
            None => unreachable!("Raise policies never produce NaT"),
        }
    }

    /// Parse `"YYYY-MM-DD"` or `"YYYY-MM-DD HH:MM:SS[.ffffff]"` (a `T`
    /// separator is also accepted) into a naive timestamp.
    pub fn parse(s: &str) -> FrameResult<Self> {
        let formats = [
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ];
        for fmt in formats {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Self::from_naive(naive);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Self::from_date(date);
        }
        Err(FrameError::invalid_argument()
            .with_operation("DateTime::parse")
            .with_message("unrecognized datetime literal")
            .with_label(s.to_string()))
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn tz(&self) -> Option<Tz> {
        self.tz
    }

    pub fn is_aware(&self) -> bool {
        self.tz.is_some()
    }

    /// Local wall-clock view of this timestamp.
    pub fn local(&self) -> NaiveDateTime {
        match self.tz {
            Some(tz) => Utc
                .timestamp_nanos(self.value)
                .with_timezone(&tz)
                .naive_local(),
            None => nanos_to_naive(self.value),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.local().date()
    }

    pub fn time(&self) -> NaiveTime {
        self.local().time()
    }

    pub fn year(&self) -> i32 {
        self.local().year()
    }

    pub fn month(&self) -> u32 {
        self.local().month()
    }

    pub fn day(&self) -> u32 {
        self.local().day()
    }

    pub fn weekday(&self) -> Weekday {
        self.local().weekday()
    }

    /// Truncate to local midnight, keeping the zone.
    pub fn normalize(&self) -> FrameResult<Self> {
        Self::combine(self.date(), NaiveTime::MIN, self.tz)
    }

    /// Rebuild from a calendar date, a wall time, and an optional zone.
    /// Zone resolution takes the earliest fold and shifts forward out of
    /// gaps, matching calendar-arithmetic expectations.
    pub fn combine(date: NaiveDate, time: NaiveTime, tz: Option<Tz>) -> FrameResult<Self> {
        let naive = date.and_time(time);
        match tz {
            None => Self::from_naive(naive),
            Some(tz) => {
                let value = resolve_local(
                    naive,
                    tz,
                    AmbiguousTime::Earliest,
                    NonexistentTime::ShiftForward,
                )?
                .ok_or_else(|| {
                    FrameError::new(FrameErrorKind::NonexistentTime)
                        .with_operation("DateTime::combine")
                        .with_label(naive.to_string())
                })?;
                Ok(DateTime {
                    value,
                    tz: Some(tz),
                })
            }
        }
    }

    /// Wall-clock addition: the local fields move by the delta and the
    /// result is re-resolved in the original zone. Tick offsets, by
    /// contrast, add directly on `value`.
    pub fn add_delta(&self, delta: &TimeDelta) -> FrameResult<Self> {
        self.shift_local(ChronoDur::microseconds(delta.total_microseconds_i64()?))
    }

    pub fn sub_delta(&self, delta: &TimeDelta) -> FrameResult<Self> {
        self.add_delta(&delta.neg())
    }

    pub fn add_days(&self, days: i64) -> FrameResult<Self> {
        self.shift_local(ChronoDur::days(days))
    }

    fn shift_local(&self, dur: ChronoDur) -> FrameResult<Self> {
        let shifted = self.local().checked_add_signed(dur).ok_or_else(|| {
            FrameError::overflow()
                .with_operation("DateTime::add_delta")
                .with_label(self.to_string())
        })?;
        match self.tz {
            None => Self::from_naive(shifted),
            Some(tz) => Self::combine(shifted.date(), shifted.time(), Some(tz)),
        }
    }

    /// Signed instant difference `self − other` as a TimeDelta
    /// (microsecond resolution).
    pub fn diff(&self, other: &DateTime) -> FrameResult<TimeDelta> {
        let micros = (self.value - other.value) / 1_000;
        TimeDelta::from_microseconds(micros)
    }

    /// Attach a zone to a naive timestamp, interpreting the stored wall
    /// time in that zone. `Ok(None)` is the NaT outcome of a `Nat` policy.
    pub fn tz_localize(
        &self,
        tz: Tz,
        ambiguous: AmbiguousTime,
        nonexistent: NonexistentTime,
    ) -> FrameResult<Option<Self>> {
        if self.tz.is_some() {
            return Err(FrameError::invalid_argument()
                .with_operation("DateTime::tz_localize")
                .with_message("timestamp is already timezone-aware; use tz_convert")
                .with_label(self.to_string()));
        }
        Ok(
            resolve_local(self.local(), tz, ambiguous, nonexistent)?.map(|value| DateTime {
                value,
                tz: Some(tz),
            }),
        )
    }

    /// Drop the zone, keeping the local wall time.
    pub fn tz_strip(&self) -> FrameResult<Self> {
        Self::from_naive(self.local())
    }

    /// Move an aware timestamp to another zone; the instant is unchanged.
    pub fn tz_convert(&self, tz: Tz) -> FrameResult<Self> {
        if self.tz.is_none() {
            return Err(FrameError::invalid_argument()
                .with_operation("DateTime::tz_convert")
                .with_message("cannot convert a naive timestamp; use tz_localize")
                .with_label(self.to_string()));
        }
        Ok(DateTime {
            value: self.value,
            tz: Some(tz),
        })
    }

    /// Reinterpret the wall time in a different zone (or none). The
    /// instant generally changes.
    pub fn replace_tz(&self, tz: Option<Tz>) -> FrameResult<Self> {
        Self::combine(self.date(), self.time(), tz)
    }
}

impl PartialEq for DateTime {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for DateTime {}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl std::hash::Hash for DateTime {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let local = self.local();
        if local.time() == NaiveTime::MIN {
            write!(f, "{}", local.format("%Y-%m-%d"))?;
        } else {
            write!(f, "{}", local.format("%Y-%m-%d %H:%M:%S%.6f"))?;
        }
        if let Some(tz) = self.tz {
            write!(f, " {}", tz.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parse_date_and_datetime_literals() {
        let d = DateTime::parse("2021-03-04").unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
        assert_eq!(d.time(), NaiveTime::MIN);

        let dt = DateTime::parse("2021-03-04 05:06:07").unwrap();
        assert_eq!(dt.local().hour(), 5);
        assert_eq!(dt.local().second(), 7);

        assert!(DateTime::parse("not a date").is_err());
    }

    #[test]
    fn ordering_is_instant_based() {
        let ny = tz_from_str("America/New_York").unwrap();
        let naive = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let aware = DateTime::from_local(naive, ny).unwrap();
        let utc_view = aware.tz_convert(chrono_tz::UTC).unwrap();
        assert_eq!(aware, utc_view);
        assert_eq!(utc_view.local().hour(), 16);
    }

    #[test]
    fn localize_rejects_aware_and_convert_rejects_naive() {
        let naive = DateTime::parse("2021-01-01 00:00:00").unwrap();
        let aware = naive
            .tz_localize(chrono_tz::UTC, AmbiguousTime::Raise, NonexistentTime::Raise)
            .unwrap()
            .unwrap();
        assert!(
            aware
                .tz_localize(chrono_tz::UTC, AmbiguousTime::Raise, NonexistentTime::Raise)
                .is_err()
        );
        assert!(naive.tz_convert(chrono_tz::UTC).is_err());
    }

    #[test]
    fn ambiguous_fold_resolves_per_policy() {
        let ny = tz_from_str("America/New_York").unwrap();
        // 2021-11-07 01:30 occurs twice in America/New_York.
        let folded = DateTime::parse("2021-11-07 01:30:00").unwrap();
        let earliest = folded
            .tz_localize(ny, AmbiguousTime::Earliest, NonexistentTime::Raise)
            .unwrap()
            .unwrap();
        let latest = folded
            .tz_localize(ny, AmbiguousTime::Latest, NonexistentTime::Raise)
            .unwrap()
            .unwrap();
        assert!(earliest < latest);
        assert_eq!(latest.value() - earliest.value(), 3_600_000_000_000);
        assert!(
            folded
                .tz_localize(ny, AmbiguousTime::Raise, NonexistentTime::Raise)
                .is_err()
        );
        assert_eq!(
            folded
                .tz_localize(ny, AmbiguousTime::Nat, NonexistentTime::Raise)
                .unwrap(),
            None
        );
    }

    #[test]
    fn nonexistent_gap_shifts_forward() {
        let ny = tz_from_str("America/New_York").unwrap();
        // 2021-03-14 02:30 does not exist in America/New_York.
        let gap = DateTime::parse("2021-03-14 02:30:00").unwrap();
        assert!(
            gap.tz_localize(ny, AmbiguousTime::Raise, NonexistentTime::Raise)
                .is_err()
        );
        let shifted = gap
            .tz_localize(ny, AmbiguousTime::Raise, NonexistentTime::ShiftForward)
            .unwrap()
            .unwrap();
        assert_eq!(shifted.local().hour(), 3);
    }

    #[test]
    fn normalize_truncates_to_midnight() {
        let dt = DateTime::parse("2022-05-06 13:14:15").unwrap();
        let midnight = dt.normalize().unwrap();
        assert_eq!(midnight, DateTime::parse("2022-05-06").unwrap());
    }

    #[test]
    fn month_arithmetic_helpers() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2100));
    }
}
