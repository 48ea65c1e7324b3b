//! Fixed-duration deltas.
//!
//! `TimeDelta` is normalized to `(days, seconds ∈ [0, 86400),
//! microseconds ∈ [0, 1_000_000))` with the sign carried on `days`, the
//! same canonical form CPython's `timedelta` uses. Construction accepts
//! fractional components and cascades them downward, rounding at the
//! microsecond.

use chronoframe_common::{FrameError, FrameResult};

use crate::util::divmod;

pub const MAX_DELTA_DAYS: i64 = 999_999_999;

const US_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;
const US_PER_DAY: i128 = (US_PER_SECOND * SECONDS_PER_DAY) as i128;

/// Fractional construction components. All fields default to zero.
#[derive(Debug, Copy, Clone, Default)]
pub struct TimeDeltaComponents {
    pub weeks: f64,
    pub days: f64,
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub milliseconds: f64,
    pub microseconds: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeDelta {
    days: i64,
    seconds: i32,
    microseconds: i32,
}

fn modf(value: f64) -> (f64, f64) {
    (value.fract(), value.trunc())
}

fn guard(condition: bool, what: &str, value: f64) -> FrameResult<()> {
    if condition {
        Ok(())
    } else {
        Err(FrameError::overflow()
            .with_operation("TimeDelta::new")
            .with_message(format!("{what} out of bounds"))
            .with_label(format!("{value}")))
    }
}

impl TimeDelta {
    /// Normalize fractional components into canonical form. Fails with an
    /// overflow error when any intermediate leaves its documented bound or
    /// the day count exceeds ±999_999_999.
    pub fn new(c: TimeDeltaComponents) -> FrameResult<Self> {
        let days = c.days + c.weeks * 7.0;
        let seconds = c.seconds + c.minutes * 60.0 + c.hours * 3600.0;
        let microseconds = c.microseconds + c.milliseconds * 1000.0;
        guard(
            days.is_finite() && seconds.is_finite() && microseconds.is_finite(),
            "components",
            days,
        )?;
        guard(days.abs() < 1e15, "days", days)?;

        let (dayfrac, whole_days) = modf(days);
        let mut d = whole_days as i64;
        let mut s: i64 = 0;
        let mut daysecondsfrac = 0.0;
        if dayfrac != 0.0 {
            let (dsfrac, dswhole) = modf(dayfrac * (SECONDS_PER_DAY as f64));
            s = dswhole as i64;
            daysecondsfrac = dsfrac;
        }
        guard(daysecondsfrac.abs() <= 1.0, "fractional seconds", daysecondsfrac)?;
        guard(s.abs() <= SECONDS_PER_DAY, "seconds of day", s as f64)?;

        let (sfrac, whole_seconds) = modf(seconds);
        let secondsfrac = if sfrac != 0.0 {
            sfrac + daysecondsfrac
        } else {
            daysecondsfrac
        };
        guard(secondsfrac.abs() < 2.0, "fractional seconds", secondsfrac)?;
        guard(whole_seconds.abs() < 9.0e18, "seconds", whole_seconds)?;

        let (dd, ss) = divmod(whole_seconds as i64, SECONDS_PER_DAY);
        d += dd;
        s += ss;
        guard(s.abs() <= 2 * SECONDS_PER_DAY, "seconds", s as f64)?;

        let usdouble = secondsfrac * 1e6;
        guard(usdouble.abs() < 2.1e6, "microseconds", usdouble)?;
        guard(microseconds.abs() < 9.0e18, "microseconds", microseconds)?;

        let mut us: i64;
        if microseconds.fract() != 0.0 {
            let rounded = (microseconds + usdouble).round() as i64;
            let (sec, micro) = divmod(rounded, US_PER_SECOND);
            let (dd, sec) = divmod(sec, SECONDS_PER_DAY);
            d += dd;
            s += sec;
            us = micro;
        } else {
            let (sec, micro) = divmod(microseconds as i64, US_PER_SECOND);
            let (dd, sec) = divmod(sec, SECONDS_PER_DAY);
            d += dd;
            s += sec;
            us = (micro as f64 + usdouble).round() as i64;
        }
        guard(s.abs() <= 3 * SECONDS_PER_DAY, "seconds", s as f64)?;
        guard((us.abs() as f64) < 3.1e6, "microseconds", us as f64)?;

        let (sec, micro) = divmod(us, US_PER_SECOND);
        us = micro;
        s += sec;
        let (dd, sec) = divmod(s, SECONDS_PER_DAY);
        d += dd;
        s = sec;

        debug_assert!((0..SECONDS_PER_DAY).contains(&s));
        debug_assert!((0..US_PER_SECOND).contains(&us));
        guard(d.abs() <= MAX_DELTA_DAYS, "days", d as f64)?;

        Ok(TimeDelta {
            days: d,
            seconds: s as i32,
            microseconds: us as i32,
        })
    }

    pub fn from_microseconds(micros: i64) -> FrameResult<Self> {
        Self::from_micros128(micros as i128)
    }

    fn from_micros128(micros: i128) -> FrameResult<Self> {
        let days = micros.div_euclid(US_PER_DAY);
        let rem = micros.rem_euclid(US_PER_DAY);
        if days.abs() > MAX_DELTA_DAYS as i128 {
            return Err(FrameError::overflow()
                .with_operation("TimeDelta::from_microseconds")
                .with_label(format!("{micros}us")));
        }
        let seconds = (rem / US_PER_SECOND as i128) as i32;
        let microseconds = (rem % US_PER_SECOND as i128) as i32;
        Ok(TimeDelta {
            days: days as i64,
            seconds,
            microseconds,
        })
    }

    pub fn days(&self) -> i64 {
        self.days
    }

    pub fn seconds(&self) -> i32 {
        self.seconds
    }

    pub fn microseconds(&self) -> i32 {
        self.microseconds
    }

    pub fn total_microseconds(&self) -> i128 {
        self.days as i128 * US_PER_DAY
            + self.seconds as i128 * US_PER_SECOND as i128
            + self.microseconds as i128
    }

    pub fn total_microseconds_i64(&self) -> FrameResult<i64> {
        i64::try_from(self.total_microseconds()).map_err(|_| {
            FrameError::overflow()
                .with_operation("TimeDelta::total_microseconds")
                .with_label(format!("{self:?}"))
        })
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_microseconds() as f64 / US_PER_SECOND as f64
    }

    pub fn to_nanoseconds(&self) -> FrameResult<i64> {
        self.total_microseconds_i64()?
            .checked_mul(1_000)
            .ok_or_else(|| {
                FrameError::overflow()
                    .with_operation("TimeDelta::to_nanoseconds")
                    .with_label(format!("{self:?}"))
            })
    }

    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.seconds == 0 && self.microseconds == 0
    }

    pub fn neg(self) -> Self {
        // Total-microsecond negation stays in range for any canonical value.
        Self::from_micros128(-self.total_microseconds()).expect("negation cannot overflow")
    }

    pub fn checked_add(&self, other: &TimeDelta) -> FrameResult<Self> {
        Self::from_micros128(self.total_microseconds() + other.total_microseconds())
    }

    pub fn checked_sub(&self, other: &TimeDelta) -> FrameResult<Self> {
        Self::from_micros128(self.total_microseconds() - other.total_microseconds())
    }

    /// Integer scalar multiplication; exact.
    pub fn checked_mul(&self, factor: i64) -> FrameResult<Self> {
        Self::from_micros128(self.total_microseconds() * factor as i128)
    }

    /// Floating scalar multiplication. Fails unless the product is exactly
    /// representable at microsecond resolution.
    pub fn mul_f64(&self, factor: f64) -> FrameResult<Self> {
        let product = self.total_microseconds() as f64 * factor;
        if !product.is_finite() || product.fract() != 0.0 {
            return Err(FrameError::invalid_argument()
                .with_operation("TimeDelta::mul_f64")
                .with_message("product is not exactly representable in microseconds")
                .with_label(format!("{factor}")));
        }
        Self::from_micros128(product as i128)
    }

    /// Integer scalar division, rounding half to even at the microsecond.
    pub fn checked_div(&self, divisor: i64) -> FrameResult<Self> {
        if divisor == 0 {
            return Err(FrameError::invalid_argument()
                .with_operation("TimeDelta::checked_div")
                .with_message("division by zero"));
        }
        let a = self.total_microseconds();
        let b = divisor as i128;
        let mut q = a.div_euclid(b);
        let r = a.rem_euclid(b);
        let twice = r * 2;
        let b_abs = b.abs();
        if twice > b_abs || (twice == b_abs && q % 2 != 0) {
            q += b.signum();
        }
        Self::from_micros128(q)
    }
}

impl std::ops::Neg for TimeDelta {
    type Output = TimeDelta;

    fn neg(self) -> TimeDelta {
        TimeDelta::neg(self)
    }
}

impl std::fmt::Display for TimeDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (h, rem) = divmod(self.seconds as i64, 3600);
        let (m, s) = divmod(rem, 60);
        write!(f, "{} days {:02}:{:02}:{:02}", self.days, h, m, s)?;
        if self.microseconds != 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }
        Ok(())
    }
}

/// Convenience constructors used throughout the offsets code.
impl TimeDelta {
    pub fn from_days(days: f64) -> FrameResult<Self> {
        Self::new(TimeDeltaComponents {
            days,
            ..Default::default()
        })
    }

    pub fn from_weeks(weeks: f64) -> FrameResult<Self> {
        Self::new(TimeDeltaComponents {
            weeks,
            ..Default::default()
        })
    }

    pub fn from_hours(hours: f64) -> FrameResult<Self> {
        Self::new(TimeDeltaComponents {
            hours,
            ..Default::default()
        })
    }
}
