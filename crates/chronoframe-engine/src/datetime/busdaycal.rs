//! Business-day calendars: a weekmask plus a canonical holiday list.

use chrono::{Datelike, Duration as ChronoDur, NaiveDate};
use once_cell::sync::Lazy;

use chronoframe_common::{BusDayRoll, FrameError, FrameResult, WeekMask};

use crate::array::Array;
use crate::factory;

/// A weekmask and a normalized holiday list. Holidays are sorted,
/// deduplicated, and filtered to weekmask days, so membership is a binary
/// search and never double-counts a weekend holiday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessDayCalendar {
    weekmask: WeekMask,
    holidays: Vec<NaiveDate>,
    busdays_per_week: u32,
}

/// Process-wide Monday–Friday calendar with no holidays.
pub fn default_calendar() -> &'static BusinessDayCalendar {
    static DEFAULT: Lazy<BusinessDayCalendar> = Lazy::new(|| {
        BusinessDayCalendar::new(WeekMask::default(), Vec::new())
            .expect("the Mon-Fri weekmask is non-empty")
    });
    &DEFAULT
}

fn next_day(date: NaiveDate) -> FrameResult<NaiveDate> {
    date.succ_opt().ok_or_else(|| {
        FrameError::overflow()
            .with_operation("BusinessDayCalendar")
            .with_label(date.to_string())
    })
}

fn prev_day(date: NaiveDate) -> FrameResult<NaiveDate> {
    date.pred_opt().ok_or_else(|| {
        FrameError::overflow()
            .with_operation("BusinessDayCalendar")
            .with_label(date.to_string())
    })
}

impl BusinessDayCalendar {
    pub fn new(weekmask: WeekMask, holidays: Vec<NaiveDate>) -> FrameResult<Self> {
        let busdays_per_week = weekmask.busdays_per_week();
        if busdays_per_week == 0 {
            return Err(FrameError::invalid_argument()
                .with_operation("BusinessDayCalendar::new")
                .with_message("weekmask cannot be all zeros"));
        }
        let mut normalized: Vec<NaiveDate> = holidays
            .into_iter()
            .filter(|d| weekmask.contains(d.weekday()))
            .collect();
        normalized.sort_unstable();
        normalized.dedup();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            weekmask = %weekmask,
            holidays = normalized.len(),
            "constructed business-day calendar"
        );

        Ok(BusinessDayCalendar {
            weekmask,
            holidays: normalized,
            busdays_per_week,
        })
    }

    pub fn weekmask(&self) -> &WeekMask {
        &self.weekmask
    }

    pub fn holidays(&self) -> &[NaiveDate] {
        &self.holidays
    }

    pub fn busdays_per_week(&self) -> u32 {
        self.busdays_per_week
    }

    pub fn is_busday(&self, date: NaiveDate) -> bool {
        self.weekmask.contains(date.weekday()) && self.holidays.binary_search(&date).is_err()
    }

    /// Holidays within `[from, to)`.
    fn holidays_in_range(&self, from: NaiveDate, to: NaiveDate) -> i64 {
        let lo = self.holidays.partition_point(|h| *h < from);
        let hi = self.holidays.partition_point(|h| *h < to);
        hi as i64 - lo as i64
    }

    fn next_busday(&self, mut date: NaiveDate) -> FrameResult<NaiveDate> {
        loop {
            date = next_day(date)?;
            if self.is_busday(date) {
                return Ok(date);
            }
        }
    }

    fn prev_busday(&self, mut date: NaiveDate) -> FrameResult<NaiveDate> {
        loop {
            date = prev_day(date)?;
            if self.is_busday(date) {
                return Ok(date);
            }
        }
    }

    /// Snap a date onto the calendar per the roll mode. `Ok(None)` is the
    /// NaT outcome of `BusDayRoll::Nat`.
    pub fn roll(&self, date: NaiveDate, roll: BusDayRoll) -> FrameResult<Option<NaiveDate>> {
        if self.is_busday(date) {
            return Ok(Some(date));
        }
        let rolled = match roll {
            BusDayRoll::Raise => {
                return Err(FrameError::invalid_argument()
                    .with_operation("BusinessDayCalendar::roll")
                    .with_message("date is not a business day")
                    .with_label(date.to_string()));
            }
            BusDayRoll::Nat => return Ok(None),
            BusDayRoll::Following => self.next_busday(date)?,
            BusDayRoll::Preceding => self.prev_busday(date)?,
            BusDayRoll::ModifiedFollowing => {
                let forward = self.next_busday(date)?;
                if forward.month() != date.month() || forward.year() != date.year() {
                    self.prev_busday(date)?
                } else {
                    forward
                }
            }
            BusDayRoll::ModifiedPreceding => {
                let backward = self.prev_busday(date)?;
                if backward.month() != date.month() || backward.year() != date.year() {
                    self.next_busday(date)?
                } else {
                    backward
                }
            }
        };
        Ok(Some(rolled))
    }

    /// Roll, then advance `n` business days: whole-week strides over the
    /// weekmask with a binary-searched holiday correction for the stridden
    /// span, then a day-by-day walk for the residue.
    pub fn offset(
        &self,
        date: NaiveDate,
        n: i64,
        roll: BusDayRoll,
    ) -> FrameResult<Option<NaiveDate>> {
        let Some(start) = self.roll(date, roll)? else {
            return Ok(None);
        };
        let bpw = self.busdays_per_week as i64;
        let mut d = start;
        let mut remaining = n;

        if remaining > 0 {
            let weeks = remaining / bpw;
            remaining %= bpw;
            if weeks > 0 {
                let target = d + ChronoDur::days(weeks * 7);
                // Mask-days in (d, target] number weeks*bpw; holidays among
                // them were not really business days, so they stay owed.
                remaining += self.holidays_in_range(next_day(d)?, next_day(target)?);
                d = target;
            }
            while remaining > 0 {
                d = next_day(d)?;
                if self.is_busday(d) {
                    remaining -= 1;
                }
            }
        } else if remaining < 0 {
            let weeks = (-remaining) / bpw;
            remaining = -((-remaining) % bpw);
            if weeks > 0 {
                let target = d - ChronoDur::days(weeks * 7);
                // Mask-days in [target, d); same holiday correction going
                // backward.
                remaining -= self.holidays_in_range(target, d);
                d = target;
            }
            while remaining < 0 {
                d = prev_day(d)?;
                if self.is_busday(d) {
                    remaining += 1;
                }
            }
        }
        Ok(Some(d))
    }

    /// Business days in the half-open interval `[begin, end)`. Reversed
    /// arguments count `−count(end + 1day, begin + 1day)`, so the boundary
    /// day swaps sides; that asymmetry is deliberate.
    pub fn count(&self, begin: NaiveDate, end: NaiveDate) -> FrameResult<i64> {
        if end < begin {
            return Ok(-self.count(next_day(end)?, next_day(begin)?)?);
        }
        let days = (end - begin).num_days();
        let weeks = days / 7;
        let mut count = weeks * self.busdays_per_week as i64;
        let mut d = begin + ChronoDur::days(weeks * 7);
        while d < end {
            if self.weekmask.contains(d.weekday()) {
                count += 1;
            }
            d = next_day(d)?;
        }
        count -= self.holidays_in_range(begin, end);
        Ok(count)
    }

    /* ─────────────────────── vectorized forms ─────────────────────── */

    pub fn is_busday_array(&self, dates: &Array) -> FrameResult<Array> {
        let values = dates.timestamp_values()?;
        let flags: Vec<Option<bool>> = values
            .iter()
            .map(|v| v.map(|dt| self.is_busday(dt.date())))
            .collect();
        Ok(factory::array::from_options_bool(flags))
    }

    pub fn offset_array(&self, dates: &Array, n: i64, roll: BusDayRoll) -> FrameResult<Array> {
        let values = dates.timestamp_values()?;
        let mut out = Vec::with_capacity(values.len());
        for v in values {
            match v {
                None => out.push(None),
                Some(dt) => {
                    let shifted = self.offset(dt.date(), n, roll)?;
                    out.push(match shifted {
                        None => None,
                        Some(date) => Some(crate::datetime::types::DateTime::from_date(date)?),
                    });
                }
            }
        }
        factory::array::from_datetimes(out, dates.timestamp_tz()?)
    }

    pub fn count_array(&self, begin: &Array, end: &Array) -> FrameResult<Array> {
        if begin.len() != end.len() {
            return Err(FrameError::invalid_argument()
                .with_operation("BusinessDayCalendar::count_array")
                .with_message("begin and end arrays must have equal length"));
        }
        let begin_values = begin.timestamp_values()?;
        let end_values = end.timestamp_values()?;
        let mut out = Vec::with_capacity(begin_values.len());
        for (b, e) in begin_values.iter().zip(end_values.iter()) {
            out.push(match (b, e) {
                (Some(b), Some(e)) => Some(self.count(b.date(), e.date())?),
                _ => None,
            });
        }
        Ok(factory::array::from_options_i64(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dates(items: &[&str]) -> Vec<NaiveDate> {
        items.iter().map(|s| date(s)).collect()
    }

    fn offset(cal: &BusinessDayCalendar, d: &str, n: i64) -> NaiveDate {
        cal.offset(date(d), n, BusDayRoll::Following)
            .unwrap()
            .unwrap()
    }

    fn roll(cal: &BusinessDayCalendar, d: &str, mode: BusDayRoll) -> NaiveDate {
        cal.offset(date(d), 0, mode).unwrap().unwrap()
    }

    #[test]
    fn construction_normalizes_holidays() {
        let cal = BusinessDayCalendar::new(
            WeekMask::default(),
            dates(&["2011-11-11", "2011-11-11", "2011-11-12", "2011-11-13"]),
        )
        .unwrap();
        // Duplicate dropped; Saturday/Sunday holidays dropped.
        assert_eq!(cal.holidays(), &[date("2011-11-11")]);
        assert_eq!(cal.busdays_per_week(), 5);
    }

    #[test]
    fn all_false_weekmask_is_rejected() {
        let err = BusinessDayCalendar::new(WeekMask::from_weekdays(&[]), Vec::new());
        assert!(err.is_err());
    }

    #[test]
    fn default_calendar_is_monday_to_friday() {
        let cal = default_calendar();
        assert!(cal.is_busday(date("2011-01-03")));
        assert!(!cal.is_busday(date("2011-01-02")));
        assert!(cal.holidays().is_empty());
    }

    #[test]
    fn roll_modes_match_reference_behavior() {
        let cal = default_calendar();
        // 2010-08-01 is a Sunday.
        assert_eq!(roll(cal, "2010-08-01", BusDayRoll::Preceding), date("2010-07-30"));
        assert_eq!(
            roll(cal, "2010-08-01", BusDayRoll::ModifiedPreceding),
            date("2010-08-02")
        );
        assert_eq!(
            roll(cal, "2010-08-01", BusDayRoll::ModifiedFollowing),
            date("2010-08-02")
        );
        assert_eq!(roll(cal, "2010-08-01", BusDayRoll::Following), date("2010-08-02"));

        assert_eq!(roll(cal, "2010-10-30", BusDayRoll::Following), date("2010-11-01"));
        assert_eq!(
            roll(cal, "2010-10-30", BusDayRoll::ModifiedFollowing),
            date("2010-10-29")
        );
        assert_eq!(
            roll(cal, "2010-10-30", BusDayRoll::ModifiedPreceding),
            date("2010-10-29")
        );
        assert_eq!(
            roll(cal, "2010-10-16", BusDayRoll::ModifiedFollowing),
            date("2010-10-18")
        );
        assert_eq!(
            roll(cal, "2010-10-16", BusDayRoll::ModifiedPreceding),
            date("2010-10-15")
        );

        assert!(cal.offset(date("2010-08-01"), 0, BusDayRoll::Raise).is_err());
        assert_eq!(cal.offset(date("2010-08-01"), 0, BusDayRoll::Nat).unwrap(), None);
        // On-calendar dates pass through every mode untouched.
        assert_eq!(roll(cal, "2010-08-02", BusDayRoll::Raise), date("2010-08-02"));
    }

    #[test]
    fn roll_with_holidays_crossing_month_boundaries() {
        let feb = BusinessDayCalendar::new(
            WeekMask::default(),
            dates(&["2012-02-27", "2012-02-26", "2012-02-28", "2012-03-01", "2012-02-29"]),
        )
        .unwrap();
        assert_eq!(
            roll(&feb, "2012-02-27", BusDayRoll::ModifiedFollowing),
            date("2012-02-24")
        );

        let mar = BusinessDayCalendar::new(
            WeekMask::default(),
            dates(&[
                "2012-03-02", "2012-03-03", "2012-03-01", "2012-03-05", "2012-03-07", "2012-03-06",
            ]),
        )
        .unwrap();
        assert_eq!(
            roll(&mar, "2012-03-06", BusDayRoll::ModifiedPreceding),
            date("2012-03-08")
        );
    }

    #[test]
    fn offset_on_sparse_weekmasks() {
        let mondays =
            BusinessDayCalendar::new(WeekMask::from_weekdays(&[Weekday::Mon]), Vec::new()).unwrap();
        // First Monday of June 2011.
        assert_eq!(offset(&mondays, "2011-06-01", 0), date("2011-06-06"));
        // Last Monday of June 2011, reached backward from July.
        assert_eq!(
            mondays
                .offset(date("2011-07-01"), -1, BusDayRoll::Following)
                .unwrap()
                .unwrap(),
            date("2011-06-27")
        );

        let weekend = BusinessDayCalendar::new(
            WeekMask::from_weekdays(&[Weekday::Sat, Weekday::Sun]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(offset(&weekend, "2007-02-25", 11), date("2007-04-07"));
        assert_eq!(
            weekend
                .offset(date("2007-04-07"), -11, BusDayRoll::Following)
                .unwrap()
                .unwrap(),
            date("2007-02-25")
        );
    }

    #[test]
    fn offset_with_larger_strides() {
        let cal = default_calendar();
        assert_eq!(offset(cal, "2006-02-01", 25), date("2006-03-08"));
        assert_eq!(
            cal.offset(date("2006-03-08"), -25, BusDayRoll::Following)
                .unwrap()
                .unwrap(),
            date("2006-02-01")
        );
    }

    #[test]
    fn offset_skips_holidays() {
        let cal = BusinessDayCalendar::new(WeekMask::default(), dates(&["2011-11-11"])).unwrap();
        assert_eq!(offset(&cal, "2011-11-10", 1), date("2011-11-14"));
        assert_eq!(offset(&cal, "2011-11-04", 5), date("2011-11-14"));
        assert_eq!(offset(&cal, "2011-11-10", 5), date("2011-11-18"));
        assert_eq!(
            cal.offset(date("2011-11-14"), -1, BusDayRoll::Following)
                .unwrap()
                .unwrap(),
            date("2011-11-10")
        );
        assert_eq!(
            cal.offset(date("2011-11-18"), -5, BusDayRoll::Following)
                .unwrap()
                .unwrap(),
            date("2011-11-10")
        );
        assert_eq!(
            cal.offset(date("2011-11-14"), -5, BusDayRoll::Following)
                .unwrap()
                .unwrap(),
            date("2011-11-04")
        );
    }

    #[test]
    fn holiday_jumps_match_holiday_free_equivalents() {
        let cal = BusinessDayCalendar::new(
            WeekMask::default(),
            dates(&[
                "2011-10-10", "2011-11-11", "2011-11-24", "2011-12-25", "2011-05-30",
                "2011-02-21", "2011-12-26", "2012-01-02",
            ]),
        )
        .unwrap();
        let plain = default_calendar();

        for (n, extra) in [(4, 0), (5, 1), (27, 1), (28, 2), (35, 2), (36, 3), (56, 3), (57, 4), (60, 4), (61, 5)]
        {
            assert_eq!(
                offset(&cal, "2011-10-03", n),
                offset(plain, "2011-10-03", n + extra),
                "forward n={n}"
            );
        }
        for (n, extra) in [(-1, -1), (-4, -1), (-5, -2), (-25, -2), (-26, -3), (-33, -3), (-34, -4), (-56, -4), (-57, -5)]
        {
            assert_eq!(
                cal.offset(date("2012-01-03"), n, BusDayRoll::Following)
                    .unwrap()
                    .unwrap(),
                plain
                    .offset(date("2012-01-03"), n + extra, BusDayRoll::Following)
                    .unwrap()
                    .unwrap(),
                "backward n={n}"
            );
        }
    }

    #[test]
    fn count_over_half_open_interval() {
        let cal = default_calendar();
        assert_eq!(cal.count(date("2011-01-03"), date("2011-01-07")).unwrap(), 4);
        // Sunday → Monday holds no full business day.
        assert_eq!(cal.count(date("2023-03-05"), date("2023-03-06")).unwrap(), 0);
        assert_eq!(cal.count(date("2023-03-06"), date("2023-03-12")).unwrap(), 5);
        assert_eq!(cal.count(date("2023-03-10"), date("2023-03-11")).unwrap(), 1);
        assert_eq!(cal.count(date("2023-03-11"), date("2023-03-17")).unwrap(), 4);
    }

    #[test]
    fn reversed_count_shifts_the_boundary_day() {
        let cal = default_calendar();
        assert_eq!(cal.count(date("2023-03-06"), date("2023-03-05")).unwrap(), -1);
        assert_eq!(cal.count(date("2023-03-11"), date("2023-03-10")).unwrap(), 0);

        let mondays =
            BusinessDayCalendar::new(WeekMask::from_weekdays(&[Weekday::Mon]), Vec::new()).unwrap();
        assert_eq!(mondays.count(date("2011-03-01"), date("2011-04-01")).unwrap(), 4);
        assert_eq!(mondays.count(date("2011-04-01"), date("2011-03-01")).unwrap(), -4);
    }

    #[test]
    fn count_inverts_offset() {
        let cal = BusinessDayCalendar::new(
            WeekMask::default(),
            dates(&[
                "2011-01-01", "2011-10-10", "2011-11-11", "2011-11-24", "2011-12-25",
                "2011-05-30", "2011-02-21", "2011-01-17", "2011-12-26", "2012-01-02",
                "2011-07-01", "2011-07-04", "2011-09-05",
            ]),
        )
        .unwrap();
        let origin = date("2011-01-01");
        for k in 0..120 {
            let advanced = cal.offset(origin, k, BusDayRoll::Following).unwrap().unwrap();
            assert_eq!(cal.count(origin, advanced).unwrap(), k, "k={k}");
            assert_eq!(cal.count(advanced, origin).unwrap(), -k - 1, "reverse k={k}");
            assert!(cal.is_busday(advanced));
        }
    }
}
