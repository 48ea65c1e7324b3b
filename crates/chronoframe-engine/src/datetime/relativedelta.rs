//! Hybrid absolute/relative calendar deltas.
//!
//! A `RelativeDelta` mixes two kinds of fields: *relative* fields
//! (years, months, days, hours, …) that are added to a timestamp, and
//! *absolute* fields (year, month, day, weekday, hour, …) that replace
//! the corresponding component before the relative ones are applied.
//! Construction normalizes (`fix`) so months stay within ±11 by carrying
//! into years, and the time fields stay within their calendar ranges.

use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use chronoframe_common::{FrameError, FrameResult};

use crate::util::{divmod, fdivmod, pymod};

use super::timedelta::{TimeDelta, TimeDeltaComponents};
use super::types::{DateTime, days_in_month, is_leap_year};

/// `weekday=MO(3)`-style anchor: the `nth` occurrence of `weekday`
/// relative to the adjusted date. `nth` defaults to 1.
#[derive(Debug, Copy, Clone)]
pub struct WeekdayAnchor {
    pub weekday: Weekday,
    pub nth: Option<i64>,
}

impl WeekdayAnchor {
    pub fn new(weekday: Weekday) -> Self {
        WeekdayAnchor { weekday, nth: None }
    }

    pub fn nth(weekday: Weekday, nth: i64) -> Self {
        WeekdayAnchor {
            weekday,
            nth: Some(nth),
        }
    }
}

impl PartialEq for WeekdayAnchor {
    fn eq(&self, other: &Self) -> bool {
        self.weekday == other.weekday && self.nth.unwrap_or(1) == other.nth.unwrap_or(1)
    }
}

/// Construction options. Plural fields are relative, singular fields are
/// absolute overrides; `yearday`/`nlyearday` derive month/day from an
/// ordinal day of year.
#[derive(Debug, Clone, Default)]
pub struct RelativeDeltaOptions {
    pub years: f64,
    pub months: f64,
    pub weeks: f64,
    pub days: f64,
    pub leapdays: i64,
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub microseconds: f64,

    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub weekday: Option<WeekdayAnchor>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    pub microsecond: Option<u32>,

    pub yearday: Option<i64>,
    pub nlyearday: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelativeDelta {
    years: f64,
    months: f64,
    days: f64,
    leapdays: i64,
    hours: f64,
    minutes: f64,
    seconds: f64,
    microseconds: f64,

    year: Option<i32>,
    month: Option<u32>,
    day: Option<u32>,
    weekday: Option<WeekdayAnchor>,
    hour: Option<u32>,
    minute: Option<u32>,
    second: Option<u32>,
    microsecond: Option<u32>,

    has_time: bool,
}

/// Cumulative day-of-year boundaries for a leap year; used to resolve
/// `yearday` into (month, day).
const YDAY_IDX: [i64; 12] = [31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334, 366];

fn round_digits(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

fn sign_of(value: f64) -> f64 {
    if value < 0.0 { -1.0 } else { 1.0 }
}

impl RelativeDelta {
    pub fn new(options: RelativeDeltaOptions) -> FrameResult<Self> {
        if let Some(month) = options.month {
            if !(1..=12).contains(&month) {
                return Err(FrameError::invalid_argument()
                    .with_operation("RelativeDelta::new")
                    .with_message("absolute month must be in 1..=12")
                    .with_label(month.to_string()));
            }
        }
        if let Some(day) = options.day {
            if !(1..=31).contains(&day) {
                return Err(FrameError::invalid_argument()
                    .with_operation("RelativeDelta::new")
                    .with_message("absolute day must be in 1..=31")
                    .with_label(day.to_string()));
            }
        }

        let mut rd = RelativeDelta {
            years: options.years,
            months: options.months,
            days: options.days + options.weeks * 7.0,
            leapdays: options.leapdays,
            hours: options.hours,
            minutes: options.minutes,
            seconds: options.seconds,
            microseconds: options.microseconds,
            year: options.year,
            month: options.month,
            day: options.day,
            weekday: options.weekday,
            hour: options.hour,
            minute: options.minute,
            second: options.second,
            microsecond: options.microsecond,
            has_time: false,
        };

        let yday = if let Some(nly) = options.nlyearday {
            nly
        } else if let Some(yd) = options.yearday {
            if yd > 59 {
                rd.leapdays = -1;
            }
            yd
        } else {
            0
        };

        if yday != 0 {
            let mut found = false;
            for (idx, bound) in YDAY_IDX.iter().enumerate() {
                if yday <= *bound {
                    rd.month = Some(idx as u32 + 1);
                    rd.day = Some(if idx == 0 {
                        yday as u32
                    } else {
                        (yday - YDAY_IDX[idx - 1]) as u32
                    });
                    found = true;
                    break;
                }
            }
            if !found {
                return Err(FrameError::invalid_argument()
                    .with_operation("RelativeDelta::new")
                    .with_message("invalid year day")
                    .with_label(yday.to_string()));
            }
        }

        rd.fix();
        Ok(rd)
    }

    /// The signed difference such that `dt2 + result == dt1`. The month
    /// count is found by bisection-by-one: start from the civil-field
    /// difference, then walk until `dt2 + result` reaches or passes
    /// `dt1`; the rest is carried as seconds/microseconds.
    pub fn between(dt1: &DateTime, dt2: &DateTime) -> FrameResult<Self> {
        let mut rd = RelativeDelta {
            years: 0.0,
            months: 0.0,
            days: 0.0,
            leapdays: 0,
            hours: 0.0,
            minutes: 0.0,
            seconds: 0.0,
            microseconds: 0.0,
            year: None,
            month: None,
            day: None,
            weekday: None,
            hour: None,
            minute: None,
            second: None,
            microsecond: None,
            has_time: false,
        };

        let d1 = dt1.local();
        let d2 = dt2.local();
        let mut months =
            (d1.year() as i64 - d2.year() as i64) * 12 + (d1.month() as i64 - d2.month() as i64);
        rd.set_months(months);

        let mut dtm = rd.apply(dt2)?;
        let increment = if dt1 < dt2 { 1 } else { -1 };
        let passed = |a: &DateTime, b: &DateTime| if increment > 0 { a > b } else { a < b };
        while passed(dt1, &dtm) {
            months += increment;
            rd.set_months(months);
            dtm = rd.apply(dt2)?;
        }

        let remainder = dt1.diff(&dtm)?;
        rd.seconds = remainder.seconds() as f64 + remainder.days() as f64 * 86_400.0;
        rd.microseconds = remainder.microseconds() as f64;
        rd.fix();
        Ok(rd)
    }

    fn set_months(&mut self, months: i64) {
        if months.abs() > 11 {
            let s = months.signum();
            let (div, rem) = divmod(months * s, 12);
            self.months = (rem * s) as f64;
            self.years = (div * s) as f64;
        } else {
            self.months = months as f64;
            self.years = 0.0;
        }
    }

    /// Carry each field into the next coarser one, keeping residues in
    /// canonical ranges with the sign preserved.
    fn fix(&mut self) {
        if self.microseconds.abs() > 999_999.0 {
            let s = sign_of(self.microseconds);
            let (div, rem) = fdivmod(self.microseconds * s, 1_000_000.0);
            self.microseconds = rem * s;
            self.seconds += div * s;
        }
        if self.seconds.abs() > 59.0 {
            let s = sign_of(self.seconds);
            let (div, rem) = fdivmod(self.seconds * s, 60.0);
            self.seconds = rem * s;
            self.minutes += div * s;
        }
        if self.minutes.abs() > 59.0 {
            let s = sign_of(self.minutes);
            let (div, rem) = fdivmod(self.minutes * s, 60.0);
            self.minutes = rem * s;
            self.hours += div * s;
        }
        if self.hours.abs() > 23.0 {
            let s = sign_of(self.hours);
            let (div, rem) = fdivmod(self.hours * s, 24.0);
            self.hours = rem * s;
            self.days += div * s;
        }
        if self.months.abs() > 11.0 {
            let s = sign_of(self.months);
            let (div, rem) = fdivmod(self.months * s, 12.0);
            self.months = rem * s;
            self.years += div * s;
        }
        self.has_time = self.hours != 0.0
            || self.minutes != 0.0
            || self.seconds != 0.0
            || self.microseconds != 0.0
            || self.hour.is_some()
            || self.minute.is_some()
            || self.second.is_some()
            || self.microsecond.is_some();
    }

    /// Apply to a timestamp: absolute fields replace, relative fields add,
    /// the day clamps to the target month's length, leapdays fire for
    /// post-February dates in leap years, and a weekday anchor advances to
    /// the n-th matching weekday at the end.
    pub fn apply(&self, other: &DateTime) -> FrameResult<DateTime> {
        let integral = |v: f64, what: &str| -> FrameResult<i64> {
            if v.fract() != 0.0 {
                Err(FrameError::invalid_argument()
                    .with_operation("RelativeDelta::apply")
                    .with_message(format!("fractional {what}; call normalized() first"))
                    .with_label(v.to_string()))
            } else {
                Ok(v as i64)
            }
        };

        let local = other.local();
        let mut year = self.year.unwrap_or(local.year()) as i64 + integral(self.years, "years")?;
        let mut month = self.month.unwrap_or(local.month()) as i64;

        let months = integral(self.months, "months")?;
        if months != 0 {
            debug_assert!((1..=12).contains(&months.abs()));
            month += months;
            if month > 12 {
                year += 1;
                month -= 12;
            } else if month < 1 {
                year -= 1;
                month += 12;
            }
        }

        let day = u32::min(
            days_in_month(year as i32, month as u32),
            self.day.unwrap_or(local.day()),
        );

        let mut days = self.days;
        if self.leapdays != 0 && month > 2 && is_leap_year(year as i32) {
            days += self.leapdays as f64;
        }

        let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day).ok_or_else(|| {
            FrameError::invalid_argument()
                .with_operation("RelativeDelta::apply")
                .with_label(format!("{year:04}-{month:02}-{day:02}"))
        })?;
        let mut time = other.time();
        if let Some(hour) = self.hour {
            time = time.with_hour(hour).ok_or_else(invalid_time)?;
        }
        if let Some(minute) = self.minute {
            time = time.with_minute(minute).ok_or_else(invalid_time)?;
        }
        if let Some(second) = self.second {
            time = time.with_second(second).ok_or_else(invalid_time)?;
        }
        if let Some(microsecond) = self.microsecond {
            time = time
                .with_nanosecond(microsecond * 1_000)
                .ok_or_else(invalid_time)?;
        }

        let mut ret = DateTime::combine(date, time, other.tz())?;
        ret = ret.add_delta(&TimeDelta::new(TimeDeltaComponents {
            days,
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds,
            microseconds: self.microseconds,
            ..Default::default()
        })?)?;

        if let Some(anchor) = self.weekday {
            let target = anchor.weekday.num_days_from_monday() as i64;
            let current = ret.weekday().num_days_from_monday() as i64;
            let nth = anchor.nth.unwrap_or(1);
            let mut jumpdays = (nth.abs() - 1) * 7;
            if nth > 0 {
                jumpdays += (7 - current + target) % 7;
            } else {
                jumpdays += pymod(current - target, 7);
                jumpdays = -jumpdays;
            }
            ret = ret.add_days(jumpdays)?;
        }

        Ok(ret)
    }

    /// Carry fractional parts downward (1.5 days becomes 1 day 12 hours),
    /// rounding each stage near the microsecond.
    pub fn normalized(&self) -> FrameResult<Self> {
        let days = self.days.trunc();
        let hours_f = round_digits(self.hours + 24.0 * (self.days - days), 11);
        let hours = hours_f.trunc();
        let minutes_f = round_digits(self.minutes + 60.0 * (hours_f - hours), 10);
        let minutes = minutes_f.trunc();
        let seconds_f = round_digits(self.seconds + 60.0 * (minutes_f - minutes), 8);
        let seconds = seconds_f.trunc();
        let microseconds = (self.microseconds + 1e6 * (seconds_f - seconds)).round();

        RelativeDelta::new(RelativeDeltaOptions {
            years: self.years,
            months: self.months,
            days,
            leapdays: self.leapdays,
            hours,
            minutes,
            seconds,
            microseconds,
            year: self.year,
            month: self.month,
            day: self.day,
            weekday: self.weekday,
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            microsecond: self.microsecond,
            ..Default::default()
        })
    }

    /// Componentwise sum; the right operand's absolute fields win.
    pub fn add(&self, rhs: &RelativeDelta) -> FrameResult<Self> {
        RelativeDelta::new(RelativeDeltaOptions {
            years: rhs.years + self.years,
            months: rhs.months + self.months,
            days: rhs.days + self.days,
            leapdays: if rhs.leapdays != 0 {
                rhs.leapdays
            } else {
                self.leapdays
            },
            hours: rhs.hours + self.hours,
            minutes: rhs.minutes + self.minutes,
            seconds: rhs.seconds + self.seconds,
            microseconds: rhs.microseconds + self.microseconds,
            year: rhs.year.or(self.year),
            month: rhs.month.or(self.month),
            day: rhs.day.or(self.day),
            weekday: rhs.weekday.or(self.weekday),
            hour: rhs.hour.or(self.hour),
            minute: rhs.minute.or(self.minute),
            second: rhs.second.or(self.second),
            microsecond: rhs.microsecond.or(self.microsecond),
            ..Default::default()
        })
    }

    pub fn sub(&self, rhs: &RelativeDelta) -> FrameResult<Self> {
        self.add(&rhs.neg()?)
    }

    pub fn add_timedelta(&self, delta: &TimeDelta) -> FrameResult<Self> {
        RelativeDelta::new(RelativeDeltaOptions {
            years: self.years,
            months: self.months,
            days: self.days + delta.days() as f64,
            leapdays: self.leapdays,
            hours: self.hours,
            minutes: self.minutes,
            seconds: self.seconds + delta.seconds() as f64,
            microseconds: self.microseconds + delta.microseconds() as f64,
            year: self.year,
            month: self.month,
            day: self.day,
            weekday: self.weekday,
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            microsecond: self.microsecond,
            ..Default::default()
        })
    }

    pub fn neg(&self) -> FrameResult<Self> {
        self.mul_f64(-1.0)
    }

    /// Scale relative fields only; absolute fields pass through.
    pub fn mul_f64(&self, factor: f64) -> FrameResult<Self> {
        RelativeDelta::new(RelativeDeltaOptions {
            years: self.years * factor,
            months: self.months * factor,
            days: self.days * factor,
            leapdays: self.leapdays,
            hours: self.hours * factor,
            minutes: self.minutes * factor,
            seconds: self.seconds * factor,
            microseconds: self.microseconds * factor,
            year: self.year,
            month: self.month,
            day: self.day,
            weekday: self.weekday,
            hour: self.hour,
            minute: self.minute,
            second: self.second,
            microsecond: self.microsecond,
            ..Default::default()
        })
    }

    pub fn div_f64(&self, divisor: f64) -> FrameResult<Self> {
        if divisor == 0.0 {
            return Err(FrameError::invalid_argument()
                .with_operation("RelativeDelta::div_f64")
                .with_message("division by zero"));
        }
        self.mul_f64(1.0 / divisor)
    }

    /// True when any field is non-zero or set.
    pub fn is_set(&self) -> bool {
        self.years != 0.0
            || self.months != 0.0
            || self.days != 0.0
            || self.hours != 0.0
            || self.minutes != 0.0
            || self.seconds != 0.0
            || self.microseconds != 0.0
            || self.leapdays != 0
            || self.year.is_some()
            || self.month.is_some()
            || self.day.is_some()
            || self.weekday.is_some()
            || self.hour.is_some()
            || self.minute.is_some()
            || self.second.is_some()
            || self.microsecond.is_some()
    }

    pub fn has_time(&self) -> bool {
        self.has_time
    }

    pub fn years(&self) -> f64 {
        self.years
    }

    pub fn months(&self) -> f64 {
        self.months
    }

    pub fn days(&self) -> f64 {
        self.days
    }

    pub fn weeks(&self) -> f64 {
        (self.days / 7.0).trunc()
    }

    pub fn hours(&self) -> f64 {
        self.hours
    }

    pub fn minutes(&self) -> f64 {
        self.minutes
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    pub fn microseconds(&self) -> f64 {
        self.microseconds
    }
}

fn invalid_time() -> FrameError {
    FrameError::invalid_argument()
        .with_operation("RelativeDelta::apply")
        .with_message("absolute time component out of range")
}

/// Gregorian Easter Sunday for `year` (anonymous Gregorian computus).
pub fn easter(year: i32) -> NaiveDate {
    let y = year as i64;
    let g = y % 19;
    let c = y.div_euclid(100);
    let h = (c - c.div_euclid(4) - (8 * c + 13).div_euclid(25) + 19 * g + 15) % 30;
    let i = h
        - h.div_euclid(28)
            * (1 - h.div_euclid(28) * 29i64.div_euclid(h + 1) * (21 - g).div_euclid(11));
    let j = (y + y.div_euclid(4) + i + 2 - c + c.div_euclid(4)) % 7;
    let p = i - j;
    let d = 1 + (p + 27 + (p + 6).div_euclid(40)) % 31;
    let m = 3 + (p + 26).div_euclid(30);
    NaiveDate::from_ymd_opt(year, m as u32, d as u32).expect("computus stays within March/April")
}
