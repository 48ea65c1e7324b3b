//! Calendar offset behavior across the frequency family, including the
//! roll invariants, exercised through the public factory surface.

use chrono::Weekday;
use chronoframe_engine::factory::offset;
use chronoframe_engine::{DateTime, OffsetHandler};
use proptest::prelude::*;

fn dt(s: &str) -> DateTime {
    DateTime::parse(s).unwrap()
}

#[test]
fn business_day_from_monday() {
    let bday = offset::bday(1, None);
    assert_eq!(bday.add(&dt("2008-01-07")).unwrap(), dt("2008-01-08"));
}

#[test]
fn month_end_clamps() {
    let month_end = offset::month_end(1);
    assert_eq!(month_end.add(&dt("2023-01-31")).unwrap(), dt("2023-02-28"));
    assert_eq!(month_end.add(&dt("2024-01-31")).unwrap(), dt("2024-02-29"));
}

#[test]
fn easter_sequence() {
    let next = offset::easter_offset(1);
    assert_eq!(next.add(&dt("2010-01-01")).unwrap(), dt("2010-04-04"));
    assert_eq!(next.add(&dt("2010-04-05")).unwrap(), dt("2011-04-24"));
    assert_eq!(
        offset::easter_offset(-1).add(&dt("2010-04-04")).unwrap(),
        dt("2009-04-12")
    );
}

#[test]
fn quarter_roll_from_mid_quarter() {
    let quarter = offset::quarter_start(1, Some(1));
    assert_eq!(quarter.add(&dt("2023-02-15")).unwrap(), dt("2023-04-01"));
}

#[test]
fn anchored_week_add_and_diff() {
    let monday = offset::weeks(1, Some(Weekday::Mon));
    assert_eq!(monday.add(&dt("2008-01-04")).unwrap(), dt("2008-01-07"));
    assert_eq!(monday.add(&dt("2008-01-07")).unwrap(), dt("2008-01-14"));
    assert_eq!(
        monday.diff(&dt("2008-01-07"), &dt("2008-02-04")).unwrap(),
        4
    );
}

#[test]
fn offset_names_match_frequency_codes() {
    assert_eq!(offset::days(1).name(), "1D");
    assert_eq!(offset::minutes(5).name(), "5Min");
    assert_eq!(offset::month_start(1).name(), "1MS");
    assert_eq!(offset::quarter_end(2, None).name(), "2QE");
    assert_eq!(offset::easter_offset(1).name(), "1Easter");
}

fn arbitrary_timestamp() -> impl Strategy<Value = DateTime> {
    // Seconds range spanning 1970..2100, mapped to naive timestamps.
    (0i64..4_102_444_800, 0i64..86_400).prop_map(|(day_seconds, seconds)| {
        DateTime::new((day_seconds / 86_400 * 86_400 + seconds) * 1_000_000_000, None)
    })
}

fn anchored_offsets() -> Vec<OffsetHandler> {
    vec![
        offset::weeks(1, Some(Weekday::Wed)),
        offset::month_start(1),
        offset::month_end(1),
        offset::quarter_start(1, None),
        offset::quarter_end(1, Some(2)),
        offset::year_start(1, None),
        offset::year_end(1, None),
        offset::easter_offset(1),
        offset::bday(1, None),
    ]
}

proptest! {
    #[test]
    fn rollforward_and_rollback_land_on_offset(ts in arbitrary_timestamp()) {
        for handler in anchored_offsets() {
            let forward = handler.rollforward(&ts).unwrap();
            let backward = handler.rollback(&ts).unwrap();
            prop_assert!(handler.is_on_offset(&forward), "{} forward", handler.name());
            prop_assert!(handler.is_on_offset(&backward), "{} backward", handler.name());
            prop_assert!(forward >= ts, "{} forward ordering", handler.name());
            prop_assert!(backward <= ts, "{} backward ordering", handler.name());
        }
    }

    #[test]
    fn negate_add_is_identity_for_ticks(ts in arbitrary_timestamp(), n in -1000i64..1000) {
        prop_assume!(n != 0);
        for handler in [offset::minutes(n), offset::hours(n), offset::seconds(n)] {
            let advanced = handler.add(&ts).unwrap();
            let back = handler.negate().add(&advanced).unwrap();
            prop_assert_eq!(back, ts);
        }
    }

    #[test]
    fn tick_diff_counts_whole_periods(n in 1i64..500) {
        let start = dt("2000-01-01 00:00:00");
        let handler = offset::minutes(5);
        let mut current = start;
        for _ in 0..n {
            current = handler.add(&current).unwrap();
        }
        prop_assert_eq!(handler.diff(&start, &current).unwrap(), n);
    }
}
