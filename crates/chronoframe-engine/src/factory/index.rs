//! Index builders, including calendar-aware `date_range`.

use std::sync::Arc;

use arrow_array::Int64Array;
use chrono_tz::Tz;

use chronoframe_common::{AmbiguousTime, EdgeSide, FrameError, FrameResult, NonexistentTime};

use crate::array::Array;
use crate::datetime::offsets::OffsetHandler;
use crate::datetime::types::DateTime;
use crate::factory::array::{from_datetimes, from_slice_str};
use crate::index::Index;

/// Integer index over `start..stop` with the given step.
pub fn range(start: i64, stop: i64, step: i64) -> FrameResult<Index> {
    if step == 0 {
        return Err(FrameError::invalid_argument()
            .with_operation("index::range")
            .with_message("step cannot be zero"));
    }
    let mut values = Vec::new();
    let mut v = start;
    while (step > 0 && v < stop) || (step < 0 && v > stop) {
        values.push(v);
        v += step;
    }
    Index::new(Array::new(Arc::new(Int64Array::from(values))), "")
}

pub fn from_range(stop: i64) -> FrameResult<Index> {
    range(0, stop, 1)
}

pub fn string_index(labels: &[&str], name: &str) -> FrameResult<Index> {
    Index::new(from_slice_str(labels), name)
}

pub fn datetime_index(values: Vec<DateTime>, name: &str) -> FrameResult<Index> {
    let tz = values.first().and_then(|dt| dt.tz());
    let options = values.into_iter().map(Some).collect();
    Index::new(from_datetimes(options, tz)?, name)
}

/// Options for `date_range`. Exactly three of
/// `{start, end, periods, offset}` must be provided.
#[derive(Clone)]
pub struct DateRangeOptions {
    pub start: Option<DateTime>,
    pub end: Option<DateTime>,
    pub periods: Option<i64>,
    pub offset: Option<OffsetHandler>,
    pub tz: Option<Tz>,
    /// Drop the endpoint on the named side when it sits on the boundary.
    pub closed: Option<EdgeSide>,
    pub ambiguous: AmbiguousTime,
    pub nonexistent: NonexistentTime,
}

impl Default for DateRangeOptions {
    fn default() -> Self {
        DateRangeOptions {
            start: None,
            end: None,
            periods: None,
            offset: None,
            tz: None,
            closed: None,
            ambiguous: AmbiguousTime::Raise,
            nonexistent: NonexistentTime::Raise,
        }
    }
}

pub fn date_range(options: DateRangeOptions) -> FrameResult<Index> {
    let provided = [
        options.start.is_some(),
        options.end.is_some(),
        options.periods.is_some(),
        options.offset.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count();
    if provided != 3 {
        return Err(FrameError::invalid_argument()
            .with_operation("index::date_range")
            .with_message(format!(
                "exactly three of start, end, periods, offset must be provided; got {provided}"
            )));
    }
    if let Some(periods) = options.periods {
        if periods < 0 {
            return Err(FrameError::invalid_argument()
                .with_operation("index::date_range")
                .with_message("periods cannot be negative"));
        }
    }

    // Generation happens in naive wall time; the timezone is applied at
    // the end under the requested policies.
    let (start, end) = if options.tz.is_some() {
        let strip = |dt: Option<DateTime>| -> FrameResult<Option<DateTime>> {
            Ok(match dt {
                Some(dt) if dt.is_aware() => Some(dt.tz_strip()?),
                other => other,
            })
        };
        (strip(options.start)?, strip(options.end)?)
    } else {
        (options.start, options.end)
    };

    let mut values: Vec<DateTime> = match options.offset.as_ref() {
        None => linear_range(start, end, options.periods)?,
        Some(offset) => offset_range(offset, start, end, options.periods)?,
    };

    if let Some(side) = options.closed {
        match side {
            EdgeSide::Left => {
                values.pop();
            }
            EdgeSide::Right => {
                if !values.is_empty() {
                    values.remove(0);
                }
            }
        }
    }

    let tz = match options.tz {
        None => values.first().and_then(|dt| dt.tz()),
        Some(tz) => {
            let mut localized = Vec::with_capacity(values.len());
            for dt in values {
                let resolved = if dt.is_aware() {
                    dt.tz_convert(tz)?
                } else {
                    dt.tz_localize(tz, options.ambiguous, options.nonexistent)?
                        .ok_or_else(|| {
                            FrameError::invalid_argument()
                                .with_operation("index::date_range")
                                .with_message("localization produced NaT inside a range")
                        })?
                };
                localized.push(resolved);
            }
            values = localized;
            Some(tz)
        }
    };

    let options_vec = values.into_iter().map(Some).collect();
    Index::new(from_datetimes(options_vec, tz)?, "")
}

/// Evenly spaced timestamps when no frequency is given.
fn linear_range(
    start: Option<DateTime>,
    end: Option<DateTime>,
    periods: Option<i64>,
) -> FrameResult<Vec<DateTime>> {
    let (start, end, periods) = match (start, end, periods) {
        (Some(s), Some(e), Some(p)) => (s, e, p),
        _ => {
            return Err(FrameError::invalid_argument()
                .with_operation("index::date_range")
                .with_message("without an offset, start, end, and periods are all required"));
        }
    };
    if periods == 0 {
        return Ok(Vec::new());
    }
    if periods == 1 {
        return Ok(vec![start]);
    }
    let span = end.value() - start.value();
    let step = span / (periods - 1);
    Ok((0..periods)
        .map(|i| {
            if i == periods - 1 {
                end
            } else {
                DateTime::new(start.value() + i * step, start.tz())
            }
        })
        .collect())
}

fn offset_range(
    offset: &OffsetHandler,
    start: Option<DateTime>,
    end: Option<DateTime>,
    periods: Option<i64>,
) -> FrameResult<Vec<DateTime>> {
    match (start, end, periods) {
        (Some(start), Some(end), None) => {
            if end < start {
                return Err(FrameError::invalid_argument()
                    .with_operation("index::date_range")
                    .with_message("end precedes start"));
            }
            if offset.is_fixed() {
                let periods = offset.diff(&start, &end)? + 1;
                let step = offset.nanos()?;
                Ok((0..periods)
                    .map(|i| DateTime::new(start.value() + i * step, start.tz()))
                    .filter(|dt| *dt <= end)
                    .collect())
            } else {
                // Snap onto the anchor, then iterate until past the end.
                let mut current = offset.rollforward(&start)?;
                let mut out = Vec::new();
                while current <= end {
                    out.push(current);
                    let next = offset.add(&current)?;
                    if next <= current {
                        return Err(FrameError::invalid_frequency()
                            .with_operation("index::date_range")
                            .with_message(format!("offset {} did not advance", offset.name())));
                    }
                    current = next;
                }
                Ok(out)
            }
        }
        (Some(start), None, Some(periods)) => {
            let mut out = Vec::with_capacity(periods as usize);
            let mut current = if offset.is_fixed() {
                start
            } else {
                offset.rollforward(&start)?
            };
            for _ in 0..periods {
                out.push(current);
                current = offset.add(&current)?;
            }
            Ok(out)
        }
        (None, Some(end), Some(periods)) => {
            let mut out = Vec::with_capacity(periods as usize);
            let mut current = if offset.is_fixed() {
                end
            } else {
                offset.rollback(&end)?
            };
            for _ in 0..periods {
                out.push(current);
                current = offset.rsub(&current)?;
            }
            out.reverse();
            Ok(out)
        }
        _ => Err(FrameError::invalid_argument()
            .with_operation("index::date_range")
            .with_message("offset ranges need exactly two of start, end, periods")),
    }
}
