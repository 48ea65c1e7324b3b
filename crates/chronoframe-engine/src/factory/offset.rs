//! Offset handler constructors.

use std::sync::Arc;

use chrono::{NaiveDate, Weekday};

use chronoframe_common::{DayAnchor, FrameError, FrameResult, WeekMask};

use crate::datetime::busdaycal::BusinessDayCalendar;
use crate::datetime::holiday::AbstractHolidayCalendar;
use crate::datetime::offsets::{OffsetHandler, TickUnit};
use crate::datetime::relativedelta::{RelativeDelta, RelativeDeltaOptions};
use crate::datetime::timedelta::TimeDelta;

pub fn days(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Day,
    }
}

pub fn hours(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Hour,
    }
}

pub fn minutes(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Minute,
    }
}

pub fn seconds(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Second,
    }
}

pub fn milliseconds(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Milli,
    }
}

pub fn microseconds(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Micro,
    }
}

pub fn nanoseconds(n: i64) -> OffsetHandler {
    OffsetHandler::Tick {
        n,
        unit: TickUnit::Nano,
    }
}

pub fn weeks(n: i64, weekday: Option<Weekday>) -> OffsetHandler {
    OffsetHandler::Week { n, weekday }
}

pub fn month_start(n: i64) -> OffsetHandler {
    OffsetHandler::Month {
        n,
        anchor: DayAnchor::Start,
    }
}

pub fn month_end(n: i64) -> OffsetHandler {
    OffsetHandler::Month {
        n,
        anchor: DayAnchor::End,
    }
}

/// Quarter cycle anchored at `starting_month` (default March).
pub fn quarter_start(n: i64, starting_month: Option<u32>) -> OffsetHandler {
    OffsetHandler::Quarter {
        n,
        starting_month: starting_month.unwrap_or(3),
        anchor: DayAnchor::Start,
    }
}

pub fn quarter_end(n: i64, starting_month: Option<u32>) -> OffsetHandler {
    OffsetHandler::Quarter {
        n,
        starting_month: starting_month.unwrap_or(3),
        anchor: DayAnchor::End,
    }
}

/// Year anchored at `month` (default January for starts, December for
/// ends, as in the frequency strings `YS`/`YE`).
pub fn year_start(n: i64, month: Option<u32>) -> OffsetHandler {
    OffsetHandler::Year {
        n,
        month: month.unwrap_or(1),
        anchor: DayAnchor::Start,
    }
}

pub fn year_end(n: i64, month: Option<u32>) -> OffsetHandler {
    OffsetHandler::Year {
        n,
        month: month.unwrap_or(12),
        anchor: DayAnchor::End,
    }
}

pub fn easter_offset(n: i64) -> OffsetHandler {
    OffsetHandler::Easter { n }
}

pub fn bday(n: i64, time_offset: Option<TimeDelta>) -> OffsetHandler {
    OffsetHandler::BusinessDay { n, time_offset }
}

/// Calendar input for custom business days: an existing business-day
/// calendar, or an abstract holiday calendar to materialize.
#[derive(Clone)]
pub enum CalendarSource {
    BusinessDays(Arc<BusinessDayCalendar>),
    HolidayRules(Arc<AbstractHolidayCalendar>),
}

/// Construction parameters for `cbday`. When `calendar` is set it wins;
/// holiday-rule calendars are materialized over their default window and
/// merged with any explicit holidays.
#[derive(Clone, Default)]
pub struct BusinessDayParams {
    pub weekmask: WeekMask,
    pub holidays: Vec<NaiveDate>,
    pub calendar: Option<CalendarSource>,
}

pub fn cbday(
    params: BusinessDayParams,
    n: i64,
    time_offset: Option<TimeDelta>,
) -> FrameResult<OffsetHandler> {
    let calendar = match params.calendar {
        Some(CalendarSource::BusinessDays(calendar)) => calendar,
        Some(CalendarSource::HolidayRules(rules)) => {
            let mut holidays = rules.holidays(None, None)?;
            holidays.extend(params.holidays);
            Arc::new(BusinessDayCalendar::new(params.weekmask, holidays)?)
        }
        None => Arc::new(BusinessDayCalendar::new(params.weekmask, params.holidays)?),
    };
    Ok(OffsetHandler::CustomBusinessDay {
        n,
        calendar,
        time_offset,
    })
}

/// Generic calendar offset from relative-delta fields.
pub fn date_offset(n: i64, options: RelativeDeltaOptions) -> FrameResult<OffsetHandler> {
    let delta = RelativeDelta::new(options)?;
    if !delta.is_set() {
        return Err(FrameError::invalid_argument()
            .with_operation("offset::date_offset")
            .with_message("relative delta has no fields set"));
    }
    Ok(OffsetHandler::Delta { n, delta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::types::DateTime;

    #[test]
    fn cbday_builds_from_weekmask_and_holidays() {
        let holidays = vec![NaiveDate::from_ymd_opt(2013, 5, 1).unwrap()];
        let egypt_week =
            WeekMask::from_weekdays(&[Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu]);
        let handler = cbday(
            BusinessDayParams {
                weekmask: egypt_week,
                holidays,
                calendar: None,
            },
            2,
            None,
        )
        .unwrap();
        let start = DateTime::parse("2013-04-30").unwrap();
        assert_eq!(handler.add(&start).unwrap(), DateTime::parse("2013-05-05").unwrap());
    }

    #[test]
    fn cbday_with_sparse_weekmasks() {
        let saudi = WeekMask::from_weekdays(&[
            Weekday::Sat,
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
        ]);
        let uae = WeekMask::from_weekdays(&[
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
        ]);
        let dt = DateTime::parse("2013-05-01").unwrap();
        let saudi_bday = cbday(
            BusinessDayParams {
                weekmask: saudi,
                ..Default::default()
            },
            1,
            None,
        )
        .unwrap();
        let uae_bday = cbday(
            BusinessDayParams {
                weekmask: uae,
                ..Default::default()
            },
            1,
            None,
        )
        .unwrap();
        assert_eq!(saudi_bday.add(&dt).unwrap(), DateTime::parse("2013-05-04").unwrap());
        assert_eq!(uae_bday.add(&dt).unwrap(), DateTime::parse("2013-05-02").unwrap());
        assert_eq!(
            saudi_bday.with_n(2).add(&dt).unwrap(),
            DateTime::parse("2013-05-05").unwrap()
        );
        assert_eq!(
            uae_bday.with_n(2).add(&dt).unwrap(),
            DateTime::parse("2013-05-05").unwrap()
        );
    }

    #[test]
    fn date_offset_requires_fields() {
        assert!(date_offset(1, RelativeDeltaOptions::default()).is_err());
    }
}
