//! Business-day calendars end to end: custom calendars, the federal
//! holiday rules, and the count/offset inversion laws.

use chrono::NaiveDate;
use chronoframe_engine::datetime::holiday::get_holiday_calendar;
use chronoframe_engine::factory::array::timestamps_from_strs;
use chronoframe_engine::factory::offset::{self, BusinessDayParams, CalendarSource};
use chronoframe_engine::{
    BusDayRoll, BusinessDayCalendar, DateTime, Scalar, TimeDelta, TimeDeltaComponents, WeekMask,
    default_calendar,
};
use proptest::prelude::*;
use std::sync::Arc;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn dt(s: &str) -> DateTime {
    DateTime::parse(s).unwrap()
}

#[test]
fn federal_calendar_skips_mlk_day() {
    let calendar = get_holiday_calendar("USFederalHolidayCalendar").unwrap();
    let cbday = offset::cbday(
        BusinessDayParams {
            calendar: Some(CalendarSource::HolidayRules(Arc::new(
                chronoframe_engine::datetime::holiday::us_federal_holiday_calendar().unwrap(),
            ))),
            ..Default::default()
        },
        1,
        None,
    )
    .unwrap();
    // 2014-01-20 is Martin Luther King Day; Friday the 17th jumps to
    // Tuesday the 21st.
    assert_eq!(cbday.add(&dt("2014-01-17")).unwrap(), dt("2014-01-21"));
    assert!(!cbday.is_on_offset(&dt("2014-01-20")));
    assert!(cbday.is_on_offset(&dt("2014-01-21")));

    // The registry view drives the same calendar.
    let holidays = calendar
        .holidays(Some(date("2014-01-01")), Some(date("2014-01-31")))
        .unwrap();
    assert_eq!(holidays, vec![date("2014-01-01"), date("2014-01-20")]);
}

#[test]
fn default_calendar_counts() {
    let cal = default_calendar();
    assert_eq!(cal.count(date("2011-01-03"), date("2011-01-07")).unwrap(), 4);

    let mondays =
        BusinessDayCalendar::new(WeekMask::from_weekdays(&[chrono::Weekday::Mon]), Vec::new())
            .unwrap();
    assert_eq!(
        mondays.count(date("2011-03-01"), date("2011-04-01")).unwrap(),
        4
    );
}

#[test]
fn cbday_carries_a_time_offset() {
    let shift = TimeDelta::new(TimeDeltaComponents {
        hours: 2.0,
        ..Default::default()
    })
    .unwrap();
    let handler = offset::cbday(BusinessDayParams::default(), 1, Some(shift)).unwrap();
    assert_eq!(
        handler.add(&dt("2014-01-16 09:00:00")).unwrap(),
        dt("2014-01-17 11:00:00")
    );

    let plain = offset::bday(1, Some(shift));
    assert_eq!(
        plain.add(&dt("2014-01-16 09:00:00")).unwrap(),
        dt("2014-01-17 11:00:00")
    );
}

#[test]
fn vectorized_calendar_operations() {
    let cal = BusinessDayCalendar::new(WeekMask::default(), vec![date("2011-11-11")]).unwrap();
    let dates = timestamps_from_strs(&["2011-11-10", "2011-11-11", "2011-11-12"], None).unwrap();

    let busdays = cal.is_busday_array(&dates).unwrap();
    assert_eq!(busdays.at(0).unwrap(), Scalar::Boolean(true));
    assert_eq!(busdays.at(1).unwrap(), Scalar::Boolean(false));
    assert_eq!(busdays.at(2).unwrap(), Scalar::Boolean(false));

    let shifted = cal.offset_array(&dates, 1, BusDayRoll::Following).unwrap();
    assert_eq!(
        shifted.at(0).unwrap().as_datetime().unwrap(),
        dt("2011-11-14")
    );

    let begin = timestamps_from_strs(&["2011-11-07", "2011-11-07"], None).unwrap();
    let end = timestamps_from_strs(&["2011-11-14", "2011-11-07"], None).unwrap();
    let counts = cal.count_array(&begin, &end).unwrap();
    assert_eq!(counts.at(0).unwrap(), Scalar::Int64(4));
    assert_eq!(counts.at(1).unwrap(), Scalar::Int64(0));
}

#[test]
fn nat_roll_produces_none() {
    let cal = default_calendar();
    assert_eq!(
        cal.offset(date("2011-01-01"), 3, BusDayRoll::Nat).unwrap(),
        None
    );
    assert!(cal.offset(date("2011-01-01"), 3, BusDayRoll::Raise).is_err());
}

proptest! {
    #[test]
    fn offset_lands_on_business_days(day_offset in 0i64..3000, n in -60i64..60) {
        let cal = BusinessDayCalendar::new(
            WeekMask::default(),
            vec![date("2011-01-17"), date("2011-05-30"), date("2011-09-05")],
        )
        .unwrap();
        let start = date("2010-01-01") + chrono::Duration::days(day_offset);
        let landed = cal.offset(start, n, BusDayRoll::Following).unwrap().unwrap();
        prop_assert!(cal.is_busday(landed));
    }

    #[test]
    fn count_inverts_offset(day_offset in 0i64..2000, k in 0i64..80) {
        let cal = BusinessDayCalendar::new(
            WeekMask::default(),
            vec![date("2011-01-17"), date("2011-05-30"), date("2011-09-05")],
        )
        .unwrap();
        let raw = date("2010-01-01") + chrono::Duration::days(day_offset);
        let start = cal.offset(raw, 0, BusDayRoll::Following).unwrap().unwrap();
        let advanced = cal.offset(start, k, BusDayRoll::Following).unwrap().unwrap();
        prop_assert_eq!(cal.count(start, advanced).unwrap(), k);
    }

    #[test]
    fn count_matches_day_by_day_walk(day_offset in 0i64..1000, span in 0i64..200) {
        let cal = default_calendar();
        let a = date("2012-01-01") + chrono::Duration::days(day_offset);
        let b = a + chrono::Duration::days(span);

        // Half-open [a, b) reference walk.
        let mut brute = 0i64;
        let mut d = a;
        while d < b {
            if cal.is_busday(d) {
                brute += 1;
            }
            d += chrono::Duration::days(1);
        }
        prop_assert_eq!(cal.count(a, b).unwrap(), brute);

        // Reversed arguments negate with the one-day boundary shift.
        let mut shifted = 0i64;
        let mut d = a + chrono::Duration::days(1);
        while d < b + chrono::Duration::days(1) {
            if cal.is_busday(d) {
                shifted += 1;
            }
            d += chrono::Duration::days(1);
        }
        prop_assert_eq!(cal.count(b, a).unwrap(), -shifted);
    }
}
