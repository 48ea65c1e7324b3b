//! Holiday rules and rule-based calendars.
//!
//! A `Holiday` is either a fixed (year, month, day) date or a yearly
//! (month, day) rule refined by an offset chain (nth-weekday anchors) or
//! an observance function, optionally bounded and filtered by weekday.
//! An `AbstractHolidayCalendar` is a named rule set that materializes a
//! merged, sorted holiday list between two dates.

use chrono::{Datelike, Duration as ChronoDur, NaiveDate, Weekday};
use once_cell::sync::Lazy;

use chronoframe_common::{FrameError, FrameResult};

use crate::factory;
use crate::index::Index;

use super::offsets::OffsetHandler;
use super::relativedelta::{RelativeDelta, RelativeDeltaOptions, WeekdayAnchor};
use super::types::DateTime;

pub type Observance = fn(NaiveDate) -> NaiveDate;

/// Saturday observes on Friday, Sunday on Monday.
pub fn nearest_workday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - ChronoDur::days(1),
        Weekday::Sun => date + ChronoDur::days(1),
        _ => date,
    }
}

pub fn sunday_to_monday(date: NaiveDate) -> NaiveDate {
    if date.weekday() == Weekday::Sun {
        date + ChronoDur::days(1)
    } else {
        date
    }
}

pub fn next_monday(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date + ChronoDur::days(2),
        Weekday::Sun => date + ChronoDur::days(1),
        _ => date,
    }
}

#[derive(Clone)]
pub struct Holiday {
    name: String,
    year: Option<i32>,
    month: u32,
    day: u32,
    offsets: Vec<OffsetHandler>,
    observance: Option<Observance>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    days_of_week: Vec<Weekday>,
}

impl Holiday {
    pub fn new(name: impl Into<String>, month: u32, day: u32) -> Self {
        Holiday {
            name: name.into(),
            year: None,
            month,
            day,
            offsets: Vec::new(),
            observance: None,
            start_date: None,
            end_date: None,
            days_of_week: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-shot holiday in a single year.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_offset(mut self, offset: OffsetHandler) -> Self {
        self.offsets.push(offset);
        self
    }

    /// Shorthand for the nth-weekday anchor offsets rules mostly use.
    pub fn with_weekday_anchor(self, weekday: Weekday, nth: i64) -> FrameResult<Self> {
        let delta = RelativeDelta::new(RelativeDeltaOptions {
            weekday: Some(WeekdayAnchor::nth(weekday, nth)),
            ..Default::default()
        })?;
        Ok(self.with_offset(OffsetHandler::Delta { n: 1, delta }))
    }

    pub fn with_observance(mut self, observance: Observance) -> Self {
        self.observance = Some(observance);
        self
    }

    pub fn with_start_date(mut self, start: NaiveDate) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn with_end_date(mut self, end: NaiveDate) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn with_days_of_week(mut self, days: Vec<Weekday>) -> Self {
        self.days_of_week = days;
        self
    }

    /// Observed dates within `[start, end]`, ascending.
    pub fn dates(&self, start: NaiveDate, end: NaiveDate) -> FrameResult<Vec<NaiveDate>> {
        if self.observance.is_some() && !self.offsets.is_empty() {
            return Err(FrameError::invalid_argument()
                .with_operation("Holiday::dates")
                .with_message("cannot use both offset and observance")
                .with_label(self.name.clone()));
        }

        let window_start = match self.start_date {
            Some(bound) => start.max(bound),
            None => start,
        };
        let window_end = match self.end_date {
            Some(bound) => end.min(bound),
            None => end,
        };

        let mut out = Vec::new();
        if let Some(year) = self.year {
            if let Some(date) = NaiveDate::from_ymd_opt(year, self.month, self.day) {
                if date >= window_start && date <= window_end {
                    out.push(date);
                }
            }
            return Ok(out);
        }

        for year in (start.year() - 1)..=(end.year() + 1) {
            let Some(reference) = NaiveDate::from_ymd_opt(year, self.month, self.day) else {
                continue;
            };
            let observed = match self.observance {
                Some(observance) => observance(reference),
                None => {
                    let mut current = DateTime::from_date(reference)?;
                    for offset in &self.offsets {
                        current = offset.add(&current)?;
                    }
                    current.date()
                }
            };
            if !self.days_of_week.is_empty() && !self.days_of_week.contains(&observed.weekday()) {
                continue;
            }
            if observed >= window_start && observed <= window_end {
                out.push(observed);
            }
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }
}

/// Named set of holiday rules.
pub struct AbstractHolidayCalendar {
    name: String,
    rules: Vec<Holiday>,
}

/// Default materialization window, matching the reference rule engines.
const WINDOW_START: (i32, u32, u32) = (1970, 1, 1);
const WINDOW_END: (i32, u32, u32) = (2200, 12, 31);

impl AbstractHolidayCalendar {
    pub fn new(name: impl Into<String>, rules: Vec<Holiday>) -> Self {
        AbstractHolidayCalendar {
            name: name.into(),
            rules,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rules(&self) -> &[Holiday] {
        &self.rules
    }

    /// Merged, sorted, deduplicated holiday dates; the bounds default to
    /// the 1970–2200 window.
    pub fn holidays(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> FrameResult<Vec<NaiveDate>> {
        if self.rules.is_empty() {
            return Err(FrameError::invalid_argument()
                .with_operation("AbstractHolidayCalendar::holidays")
                .with_message("holiday calendar has no rules")
                .with_label(self.name.clone()));
        }
        let start = start.unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(WINDOW_START.0, WINDOW_START.1, WINDOW_START.2)
                .expect("window start is a valid date")
        });
        let end = end.unwrap_or_else(|| {
            NaiveDate::from_ymd_opt(WINDOW_END.0, WINDOW_END.1, WINDOW_END.2)
                .expect("window end is a valid date")
        });
        let mut out = Vec::new();
        for rule in &self.rules {
            out.extend(rule.dates(start, end)?);
        }
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// Materialize as a timestamp index for composition with frames.
    pub fn holiday_index(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> FrameResult<Index> {
        let dates = self.holidays(start, end)?;
        let values = dates
            .into_iter()
            .map(|d| DateTime::from_date(d).map(Some))
            .collect::<FrameResult<Vec<_>>>()?;
        Index::new(factory::array::from_datetimes(values, None)?, self.name.clone())
    }
}

/// The built-in US federal calendar.
pub fn us_federal_holiday_calendar() -> FrameResult<AbstractHolidayCalendar> {
    let rules = vec![
        Holiday::new("New Year's Day", 1, 1).with_observance(nearest_workday),
        Holiday::new("Birthday of Martin Luther King, Jr.", 1, 1)
            .with_start_date(NaiveDate::from_ymd_opt(1986, 1, 1).expect("valid date"))
            .with_weekday_anchor(Weekday::Mon, 3)?,
        Holiday::new("Washington's Birthday", 2, 1).with_weekday_anchor(Weekday::Mon, 3)?,
        Holiday::new("Memorial Day", 5, 31).with_weekday_anchor(Weekday::Mon, -1)?,
        Holiday::new("Juneteenth National Independence Day", 6, 19)
            .with_start_date(NaiveDate::from_ymd_opt(2021, 6, 18).expect("valid date"))
            .with_observance(nearest_workday),
        Holiday::new("Independence Day", 7, 4).with_observance(nearest_workday),
        Holiday::new("Labor Day", 9, 1).with_weekday_anchor(Weekday::Mon, 1)?,
        Holiday::new("Columbus Day", 10, 1).with_weekday_anchor(Weekday::Mon, 2)?,
        Holiday::new("Veterans Day", 11, 11).with_observance(nearest_workday),
        Holiday::new("Thanksgiving Day", 11, 1).with_weekday_anchor(Weekday::Thu, 4)?,
        Holiday::new("Christmas Day", 12, 25).with_observance(nearest_workday),
    ];
    Ok(AbstractHolidayCalendar::new("USFederalHolidayCalendar", rules))
}

/// Registry lookup by canonical name.
pub fn get_holiday_calendar(name: &str) -> FrameResult<&'static AbstractHolidayCalendar> {
    static US_FEDERAL: Lazy<AbstractHolidayCalendar> = Lazy::new(|| {
        us_federal_holiday_calendar().expect("built-in federal rules are valid")
    });
    match name {
        "USFederalHolidayCalendar" => Ok(&US_FEDERAL),
        _ => Err(FrameError::key_not_found()
            .with_operation("get_holiday_calendar")
            .with_label(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn observance_helpers() {
        assert_eq!(nearest_workday(date("2021-07-04")), date("2021-07-05"));
        assert_eq!(nearest_workday(date("2021-12-25")), date("2021-12-24"));
        assert_eq!(nearest_workday(date("2021-11-11")), date("2021-11-11"));
        assert_eq!(sunday_to_monday(date("2021-07-04")), date("2021-07-05"));
        assert_eq!(sunday_to_monday(date("2021-12-25")), date("2021-12-25"));
        assert_eq!(next_monday(date("2021-12-25")), date("2021-12-27"));
    }

    #[test]
    fn nth_weekday_rules() {
        let mlk = Holiday::new("MLK", 1, 1)
            .with_weekday_anchor(Weekday::Mon, 3)
            .unwrap();
        assert_eq!(
            mlk.dates(date("2014-01-01"), date("2014-12-31")).unwrap(),
            vec![date("2014-01-20")]
        );

        let memorial = Holiday::new("Memorial Day", 5, 31)
            .with_weekday_anchor(Weekday::Mon, -1)
            .unwrap();
        assert_eq!(
            memorial.dates(date("2011-01-01"), date("2011-12-31")).unwrap(),
            vec![date("2011-05-30")]
        );

        let thanksgiving = Holiday::new("Thanksgiving", 11, 1)
            .with_weekday_anchor(Weekday::Thu, 4)
            .unwrap();
        assert_eq!(
            thanksgiving
                .dates(date("2014-01-01"), date("2014-12-31"))
                .unwrap(),
            vec![date("2014-11-27")]
        );
    }

    #[test]
    fn bounded_rules_respect_start_date() {
        let mlk = Holiday::new("MLK", 1, 1)
            .with_start_date(date("1986-01-01"))
            .with_weekday_anchor(Weekday::Mon, 3)
            .unwrap();
        assert!(mlk.dates(date("1980-01-01"), date("1980-12-31")).unwrap().is_empty());
        assert_eq!(
            mlk.dates(date("1986-01-01"), date("1986-12-31")).unwrap(),
            vec![date("1986-01-20")]
        );
    }

    #[test]
    fn fixed_year_rules_emit_at_most_once() {
        let one_off = Holiday::new("once", 3, 15).with_year(2020);
        assert_eq!(
            one_off.dates(date("2019-01-01"), date("2021-12-31")).unwrap(),
            vec![date("2020-03-15")]
        );
        assert!(one_off.dates(date("2021-01-01"), date("2021-12-31")).unwrap().is_empty());
    }

    #[test]
    fn observance_and_offsets_are_mutually_exclusive() {
        let broken = Holiday::new("broken", 1, 1)
            .with_weekday_anchor(Weekday::Mon, 1)
            .unwrap()
            .with_observance(nearest_workday);
        assert!(broken.dates(date("2020-01-01"), date("2020-12-31")).is_err());
    }

    #[test]
    fn federal_calendar_2014() {
        let calendar = get_holiday_calendar("USFederalHolidayCalendar").unwrap();
        let holidays = calendar
            .holidays(Some(date("2014-01-01")), Some(date("2014-12-31")))
            .unwrap();
        assert!(holidays.contains(&date("2014-01-01"))); // New Year's Day
        assert!(holidays.contains(&date("2014-01-20"))); // MLK
        assert!(holidays.contains(&date("2014-05-26"))); // Memorial Day
        assert!(holidays.contains(&date("2014-07-04"))); // Independence Day
        assert!(holidays.contains(&date("2014-11-27"))); // Thanksgiving
        assert!(holidays.contains(&date("2014-12-25"))); // Christmas
        // Juneteenth begins in 2021.
        assert!(!holidays.contains(&date("2014-06-19")));
        assert!(holidays.iter().is_sorted());

        assert!(get_holiday_calendar("NoSuchCalendar").is_err());
    }

    #[test]
    fn saturday_observances_shift() {
        let calendar = get_holiday_calendar("USFederalHolidayCalendar").unwrap();
        let holidays = calendar
            .holidays(Some(date("2021-01-01")), Some(date("2021-12-31")))
            .unwrap();
        // July 4, 2021 is a Sunday: observed Monday July 5.
        assert!(holidays.contains(&date("2021-07-05")));
        // Christmas 2021 is a Saturday: observed Friday December 24.
        assert!(holidays.contains(&date("2021-12-24")));
        assert!(holidays.contains(&date("2021-06-18"))); // Juneteenth observed
    }

    #[test]
    fn holiday_index_is_a_datetime_index() {
        let calendar = get_holiday_calendar("USFederalHolidayCalendar").unwrap();
        let index = calendar
            .holiday_index(Some(date("2014-01-01")), Some(date("2014-12-31")))
            .unwrap();
        assert_eq!(index.kind(), crate::index::IndexKind::Datetime);
        assert!(index.is_monotonic_increasing());
        assert_eq!(index.size(), 10);
    }
}
