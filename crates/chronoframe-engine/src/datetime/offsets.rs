//! Frequency offset handlers.
//!
//! One tagged enum covers the whole frequency family; the shared
//! negate/base/rollforward/rollback logic is written once against the
//! capability set {add, diff, is_on_offset, with_n} instead of a
//! class hierarchy. Anchored variants carry their anchor fields.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};

use chronoframe_common::{BusDayRoll, DayAnchor, FrameError, FrameResult};

use crate::array::Array;
use crate::factory;
use crate::util::{floor_div, pymod};

use super::busdaycal::BusinessDayCalendar;
use super::relativedelta::{RelativeDelta, easter};
use super::timedelta::TimeDelta;
use super::types::{DateTime, days_in_month};

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_DAY: i64 = 86_400 * NANOS_PER_SECOND;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TickUnit {
    Day,
    Hour,
    Minute,
    Second,
    Milli,
    Micro,
    Nano,
}

impl TickUnit {
    pub fn nanos(&self) -> i64 {
        match self {
            TickUnit::Day => NANOS_PER_DAY,
            TickUnit::Hour => 3_600 * NANOS_PER_SECOND,
            TickUnit::Minute => 60 * NANOS_PER_SECOND,
            TickUnit::Second => NANOS_PER_SECOND,
            TickUnit::Milli => 1_000_000,
            TickUnit::Micro => 1_000,
            TickUnit::Nano => 1,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            TickUnit::Day => "D",
            TickUnit::Hour => "H",
            TickUnit::Minute => "Min",
            TickUnit::Second => "S",
            TickUnit::Milli => "ms",
            TickUnit::Micro => "us",
            TickUnit::Nano => "ns",
        }
    }
}

#[derive(Debug, Clone)]
pub enum OffsetHandler {
    Tick {
        n: i64,
        unit: TickUnit,
    },
    Week {
        n: i64,
        weekday: Option<Weekday>,
    },
    Month {
        n: i64,
        anchor: DayAnchor,
    },
    Quarter {
        n: i64,
        starting_month: u32,
        anchor: DayAnchor,
    },
    Year {
        n: i64,
        month: u32,
        anchor: DayAnchor,
    },
    Easter {
        n: i64,
    },
    BusinessDay {
        n: i64,
        time_offset: Option<TimeDelta>,
    },
    CustomBusinessDay {
        n: i64,
        calendar: Arc<BusinessDayCalendar>,
        time_offset: Option<TimeDelta>,
    },
    Delta {
        n: i64,
        delta: RelativeDelta,
    },
}

/* ─────────────────────────── roll helpers ─────────────────────────── */

pub fn day_of_month(year: i32, month: u32, anchor: DayAnchor) -> u32 {
    match anchor {
        DayAnchor::Start => 1,
        DayAnchor::End => days_in_month(year, month),
    }
}

/// Consume one period when the anchor in the current period still lies
/// ahead (forward) or behind (backward) of `other`.
pub fn roll_convention(other: u32, n: i64, compare: u32) -> i64 {
    if n > 0 && other < compare {
        n - 1
    } else if n <= 0 && other > compare {
        n + 1
    } else {
        n
    }
}

fn roll_qtrday_since(date: NaiveDate, n: i64, months_since: i64, anchor: DayAnchor) -> i64 {
    let anchor_day = day_of_month(date.year(), date.month(), anchor);
    if n > 0 {
        if months_since < 0 || (months_since == 0 && date.day() < anchor_day) {
            return n - 1;
        }
    } else if months_since > 0 || (months_since == 0 && date.day() > anchor_day) {
        return n + 1;
    }
    n
}

/// Combined month-and-day adjustment for quarter (`modby == 3`) and year
/// (`modby == 12`) anchoring.
pub fn roll_qtrday(date: NaiveDate, n: i64, month: u32, anchor: DayAnchor, modby: i64) -> i64 {
    let months_since = if modby == 12 {
        date.month() as i64 - month as i64
    } else {
        (date.month() as i64 % modby) - (month as i64 % modby)
    };
    roll_qtrday_since(date, n, months_since, anchor)
}

/// Shift a civil date by whole months, choosing the day from the anchor
/// (or clamping the original day to the target month's length).
pub fn shift_month(date: NaiveDate, months: i64, anchor: Option<DayAnchor>) -> FrameResult<NaiveDate> {
    let total = date.month() as i64 + months;
    let (mut dy, mut month) = (floor_div(total, 12), pymod(total, 12));
    if month == 0 {
        month = 12;
        dy -= 1;
    }
    let year = date.year() as i64 + dy;
    let year = i32::try_from(year).map_err(|_| {
        FrameError::overflow()
            .with_operation("shift_month")
            .with_label(format!("{year}"))
    })?;
    let day = match anchor {
        None => u32::min(date.day(), days_in_month(year, month as u32)),
        Some(DayAnchor::Start) => 1,
        Some(DayAnchor::End) => days_in_month(year, month as u32),
    };
    NaiveDate::from_ymd_opt(year, month as u32, day).ok_or_else(|| {
        FrameError::invalid_argument()
            .with_operation("shift_month")
            .with_label(format!("{year:04}-{month:02}-{day:02}"))
    })
}

/// Count how many applications of `handler` fit in `(start, end]`,
/// walking forward one application at a time.
fn relative_diff(start: &DateTime, end: &DateTime, handler: &OffsetHandler) -> FrameResult<i64> {
    let mut count = 0i64;
    let mut current = *start;
    while current < *end {
        let next = handler.add(&current)?;
        if next <= current {
            return Err(FrameError::invalid_frequency()
                .with_operation("OffsetHandler::diff")
                .with_message(format!("offset {} did not advance the date", handler.name())));
        }
        if next > *end {
            break;
        }
        count += 1;
        current = next;
    }
    Ok(count)
}

impl OffsetHandler {
    pub fn n(&self) -> i64 {
        match self {
            OffsetHandler::Tick { n, .. }
            | OffsetHandler::Week { n, .. }
            | OffsetHandler::Month { n, .. }
            | OffsetHandler::Quarter { n, .. }
            | OffsetHandler::Year { n, .. }
            | OffsetHandler::Easter { n }
            | OffsetHandler::BusinessDay { n, .. }
            | OffsetHandler::CustomBusinessDay { n, .. }
            | OffsetHandler::Delta { n, .. } => *n,
        }
    }

    /// Same frequency with a different multiplier.
    pub fn with_n(&self, n: i64) -> Self {
        let mut out = self.clone();
        match &mut out {
            OffsetHandler::Tick { n: slot, .. }
            | OffsetHandler::Week { n: slot, .. }
            | OffsetHandler::Month { n: slot, .. }
            | OffsetHandler::Quarter { n: slot, .. }
            | OffsetHandler::Year { n: slot, .. }
            | OffsetHandler::Easter { n: slot }
            | OffsetHandler::BusinessDay { n: slot, .. }
            | OffsetHandler::CustomBusinessDay { n: slot, .. }
            | OffsetHandler::Delta { n: slot, .. } => *slot = n,
        }
        out
    }

    pub fn mul(&self, factor: i64) -> Self {
        self.with_n(self.n() * factor)
    }

    pub fn negate(&self) -> Self {
        self.mul(-1)
    }

    pub fn base(&self) -> Self {
        self.with_n(1)
    }

    /// Constant-increment frequencies (ticks) expose their unit.
    pub fn as_tick(&self) -> Option<(TickUnit, i64)> {
        match self {
            OffsetHandler::Tick { n, unit } => Some((*unit, *n)),
            _ => None,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, OffsetHandler::Tick { .. })
    }

    /// Total nanosecond increment for tick frequencies.
    pub fn nanos(&self) -> FrameResult<i64> {
        match self.as_tick() {
            Some((unit, n)) => n.checked_mul(unit.nanos()).ok_or_else(|| {
                FrameError::overflow()
                    .with_operation("OffsetHandler::nanos")
                    .with_label(self.name())
            }),
            None => Err(FrameError::invalid_frequency()
                .with_operation("OffsetHandler::nanos")
                .with_message("only tick frequencies have a fixed nanosecond increment")
                .with_label(self.name())),
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(
            self,
            OffsetHandler::Month {
                anchor: DayAnchor::End,
                ..
            } | OffsetHandler::Quarter {
                anchor: DayAnchor::End,
                ..
            } | OffsetHandler::Year {
                anchor: DayAnchor::End,
                ..
            }
        )
    }

    pub fn is_week(&self) -> bool {
        matches!(self, OffsetHandler::Week { .. })
    }

    pub fn code(&self) -> String {
        match self {
            OffsetHandler::Tick { unit, .. } => unit.code().to_string(),
            OffsetHandler::Week { weekday, .. } => match weekday {
                Some(w) => format!("W-{}", weekday_code(*w)),
                None => "W".to_string(),
            },
            OffsetHandler::Month { anchor, .. } => match anchor {
                DayAnchor::Start => "MS".to_string(),
                DayAnchor::End => "ME".to_string(),
            },
            OffsetHandler::Quarter { anchor, .. } => match anchor {
                DayAnchor::Start => "QS".to_string(),
                DayAnchor::End => "QE".to_string(),
            },
            OffsetHandler::Year { anchor, .. } => match anchor {
                DayAnchor::Start => "YS".to_string(),
                DayAnchor::End => "YE".to_string(),
            },
            OffsetHandler::Easter { .. } => "Easter".to_string(),
            OffsetHandler::BusinessDay { .. } => "B".to_string(),
            OffsetHandler::CustomBusinessDay { .. } => "C".to_string(),
            OffsetHandler::Delta { .. } => "DateOffset".to_string(),
        }
    }

    pub fn name(&self) -> String {
        format!("{}{}", self.n(), self.code())
    }

    /// Advance `ts` by `n` units of this frequency.
    pub fn add(&self, ts: &DateTime) -> FrameResult<DateTime> {
        match self {
            OffsetHandler::Tick { .. } => {
                let increment = self.nanos()?;
                let value = ts.value().checked_add(increment).ok_or_else(|| {
                    FrameError::overflow()
                        .with_operation("OffsetHandler::add")
                        .with_label(self.name())
                })?;
                Ok(DateTime::new(value, ts.tz()))
            }
            OffsetHandler::Week { n, weekday } => match weekday {
                None => ts.add_delta(&TimeDelta::from_weeks(*n as f64)?),
                Some(anchor) => {
                    let mut k = *n;
                    let mut result = *ts;
                    let current = result.weekday();
                    if current != *anchor {
                        let gap = pymod(
                            anchor.num_days_from_monday() as i64
                                - current.num_days_from_monday() as i64,
                            7,
                        );
                        result = result.add_days(gap)?;
                        if k > 0 {
                            k -= 1;
                        }
                    }
                    result.add_delta(&TimeDelta::from_weeks(k as f64)?)
                }
            },
            OffsetHandler::Month { n, anchor } => {
                let date = ts.date();
                let compare = day_of_month(date.year(), date.month(), *anchor);
                let n_eff = roll_convention(date.day(), *n, compare);
                let shifted = shift_month(date, n_eff, Some(*anchor))?;
                DateTime::combine(shifted, chrono::NaiveTime::MIN, ts.tz())
            }
            OffsetHandler::Quarter {
                n,
                starting_month,
                anchor,
            } => {
                let date = ts.date();
                let months_since =
                    (date.month() as i64 % 3) - (*starting_month as i64 % 3);
                let qtrs = roll_qtrday(date, *n, *starting_month, *anchor, 3);
                let months = qtrs * 3 - months_since;
                let shifted = shift_month(date, months, Some(*anchor))?;
                DateTime::combine(shifted, chrono::NaiveTime::MIN, ts.tz())
            }
            OffsetHandler::Year { n, month, anchor } => {
                let date = ts.date();
                let years = roll_qtrday(date, *n, *month, *anchor, 12);
                let months = years * 12 + *month as i64 - date.month() as i64;
                let shifted = shift_month(date, months, Some(*anchor))?;
                DateTime::combine(shifted, chrono::NaiveTime::MIN, ts.tz())
            }
            OffsetHandler::Easter { n } => {
                let date = ts.date();
                let current = easter(date.year());
                let mut steps = *n;
                if steps >= 0 && date < current {
                    steps -= 1;
                } else if steps < 0 && date > current {
                    steps += 1;
                }
                let target_year = date.year() + i32::try_from(steps).map_err(|_| {
                    FrameError::overflow()
                        .with_operation("OffsetHandler::add")
                        .with_label(self.name())
                })?;
                DateTime::combine(easter(target_year), ts.time(), ts.tz())
            }
            OffsetHandler::BusinessDay { n, time_offset } => {
                let wday = ts.weekday().num_days_from_monday() as i64;
                let weeks = floor_div(*n, 5);
                let days = adjust_business_days(*n, wday, weeks);
                let mut result = ts.add_delta(&TimeDelta::from_days((7 * weeks + days) as f64)?)?;
                if let Some(extra) = time_offset {
                    result = result.add_delta(extra)?;
                }
                Ok(result)
            }
            OffsetHandler::CustomBusinessDay {
                n,
                calendar,
                time_offset,
            } => {
                // Start-of-count convention: land on the calendar before
                // stepping, without consuming a step in the n > 0 case.
                let roll = if *n > 0 {
                    BusDayRoll::Preceding
                } else {
                    BusDayRoll::Following
                };
                let shifted = calendar.offset(ts.date(), *n, roll)?.ok_or_else(|| {
                    FrameError::invalid_argument()
                        .with_operation("OffsetHandler::add")
                        .with_message("business-day roll produced NaT")
                })?;
                let mut result = DateTime::combine(shifted, ts.time(), ts.tz())?;
                if let Some(extra) = time_offset {
                    result = result.add_delta(extra)?;
                }
                Ok(result)
            }
            OffsetHandler::Delta { n, delta } => {
                let tz = ts.tz();
                let naive = if tz.is_some() { ts.tz_strip()? } else { *ts };
                let applied = delta.mul_f64(*n as f64)?.apply(&naive)?;
                match tz {
                    None => Ok(applied),
                    Some(tz) => applied
                        .tz_localize(
                            tz,
                            chronoframe_common::AmbiguousTime::Raise,
                            chronoframe_common::NonexistentTime::Raise,
                        )?
                        .ok_or_else(|| {
                            FrameError::invalid_argument()
                                .with_operation("OffsetHandler::add")
                                .with_message("re-localization produced NaT")
                        }),
                }
            }
        }
    }

    /// Integer count of this frequency fitting in `(start, end]`.
    pub fn diff(&self, start: &DateTime, end: &DateTime) -> FrameResult<i64> {
        match self {
            OffsetHandler::Tick { .. } => {
                let step = self.nanos()?;
                let span = end.value() - start.value();
                // ceil(span / step)
                Ok(-floor_div(-span, step))
            }
            OffsetHandler::Month { .. } => {
                let (a, b) = (start.local(), end.local());
                Ok((b.year() as i64 - a.year() as i64) * 12 + (b.month() as i64 - a.month() as i64))
            }
            OffsetHandler::Quarter { .. } => {
                let (a, b) = (start.local(), end.local());
                let months = (b.year() as i64 - a.year() as i64) * 12
                    + (b.month() as i64 - a.month() as i64);
                Ok(months / 3)
            }
            OffsetHandler::Year { .. } => {
                Ok(end.local().year() as i64 - start.local().year() as i64)
            }
            _ => relative_diff(start, end, self),
        }
    }

    pub fn is_on_offset(&self, ts: &DateTime) -> bool {
        match self {
            OffsetHandler::Tick { .. } | OffsetHandler::Delta { .. } => true,
            OffsetHandler::Week { weekday, .. } => match weekday {
                None => true,
                Some(anchor) => ts.weekday() == *anchor,
            },
            OffsetHandler::Month { anchor, .. } => {
                let date = ts.date();
                date.day() == day_of_month(date.year(), date.month(), *anchor)
            }
            OffsetHandler::Quarter {
                starting_month,
                anchor,
                ..
            } => {
                let date = ts.date();
                pymod(date.month() as i64 - *starting_month as i64, 3) == 0
                    && date.day() == day_of_month(date.year(), date.month(), *anchor)
            }
            OffsetHandler::Year { month, anchor, .. } => {
                let date = ts.date();
                date.month() == *month
                    && date.day() == day_of_month(date.year(), date.month(), *anchor)
            }
            OffsetHandler::Easter { .. } => {
                let date = ts.date();
                date == easter(date.year())
            }
            OffsetHandler::BusinessDay { .. } => ts.weekday().num_days_from_monday() < 5,
            OffsetHandler::CustomBusinessDay { calendar, .. } => calendar.is_busday(ts.date()),
        }
    }

    /// `negate().add(ts)`.
    pub fn rsub(&self, ts: &DateTime) -> FrameResult<DateTime> {
        self.negate().add(ts)
    }

    /// Snap forward onto the anchor; identity when already on-offset.
    pub fn rollforward(&self, ts: &DateTime) -> FrameResult<DateTime> {
        if self.is_on_offset(ts) {
            Ok(*ts)
        } else {
            self.base().add(ts)
        }
    }

    /// Snap backward onto the anchor; identity when already on-offset.
    pub fn rollback(&self, ts: &DateTime) -> FrameResult<DateTime> {
        if self.is_on_offset(ts) {
            Ok(*ts)
        } else {
            self.base().rsub(ts)
        }
    }

    /// Apply `add` elementwise over a timestamp array, preserving nulls.
    pub fn add_array(&self, values: &Array) -> FrameResult<Array> {
        let tz = values.timestamp_tz()?;
        let items = values.timestamp_values()?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            out.push(match item {
                None => None,
                Some(ts) => Some(self.add(&ts)?),
            });
        }
        factory::array::from_datetimes(out, tz)
    }
}

/// The business-day weekend table: residual days to move once whole
/// weeks are stripped, covering starts on weekends and week crossings.
fn adjust_business_days(n: i64, wday: i64, weeks: i64) -> i64 {
    let mut n = n;
    if n <= 0 && wday > 4 {
        n += 1;
    }
    n -= 5 * weeks;

    if n == 0 && wday > 4 {
        4 - wday
    } else if wday > 4 {
        (7 - wday) + (n - 1)
    } else if wday + n <= 4 {
        n
    } else {
        n + 2
    }
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}
