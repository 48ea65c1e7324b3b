//! Scalar builders and datetime literal parsing.

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

use chronoframe_common::FrameResult;

use crate::datetime::types::DateTime;
use crate::scalar::Scalar;

pub fn from_datetime(dt: &DateTime) -> Scalar {
    Scalar::from_datetime(dt)
}

pub fn from_date(date: NaiveDate) -> FrameResult<Scalar> {
    Ok(Scalar::from_datetime(&DateTime::from_date(date)?))
}

pub fn from_naive(naive: NaiveDateTime) -> FrameResult<Scalar> {
    Ok(Scalar::from_datetime(&DateTime::from_naive(naive)?))
}

pub fn from_ymd(year: i32, month: u32, day: u32) -> FrameResult<Scalar> {
    Ok(Scalar::from_datetime(&DateTime::from_ymd(year, month, day)?))
}

pub fn from_nanos(value: i64, tz: Option<Tz>) -> Scalar {
    Scalar::Timestamp { value, tz }
}

/// Parse a `"YYYY-MM-DD"` date literal.
pub fn parse_date(s: &str) -> FrameResult<Scalar> {
    let dt = DateTime::parse(s)?;
    Ok(Scalar::from_datetime(&dt.normalize()?))
}

/// Parse a `"YYYY-MM-DD HH:MM:SS"` datetime literal.
pub fn parse_datetime(s: &str) -> FrameResult<Scalar> {
    Ok(Scalar::from_datetime(&DateTime::parse(s)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_parsers() {
        let date = parse_date("2014-01-17").unwrap();
        let datetime = parse_datetime("2014-01-17 09:30:00").unwrap();
        assert_eq!(date.dt().unwrap().day(), 17);
        assert_eq!(
            datetime.as_datetime().unwrap().time(),
            chrono::NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(parse_datetime("17/01/2014").is_err());
    }

    #[test]
    fn ymd_factory_validates() {
        assert!(from_ymd(2023, 2, 29).is_err());
        assert_eq!(
            from_ymd(2024, 2, 29).unwrap().as_datetime().unwrap(),
            DateTime::parse("2024-02-29").unwrap()
        );
    }
}
