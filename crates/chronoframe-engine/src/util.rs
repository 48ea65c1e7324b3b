//! Small numeric helpers shared by the calendar and grouper code.

use arrow_schema::ArrowError;
use chronoframe_common::{FrameError, FrameErrorKind};

/// Python-style floor division for integers.
#[inline]
pub fn floor_div(a: i64, b: i64) -> i64 {
    let mut q = a / b;
    if (a % b != 0) && ((a < 0) != (b < 0)) {
        q -= 1;
    }
    q
}

/// Python-style modulo: the result carries the sign of the divisor.
#[inline]
pub fn pymod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }
}

/// Python-style divmod over integers.
#[inline]
pub fn divmod(a: i64, b: i64) -> (i64, i64) {
    (floor_div(a, b), pymod(a, b))
}

/// Floating divmod with a floor quotient, matching Python `divmod` on
/// floats.
#[inline]
pub fn fdivmod(a: f64, b: f64) -> (f64, f64) {
    let q = (a / b).floor();
    (q, a - q * b)
}

/// Map an arrow compute error onto the engine taxonomy. Cast and type
/// errors become `TypeMismatch`; everything else surfaces as
/// `InvalidArgument` with the kernel message attached.
pub fn from_arrow(err: ArrowError) -> FrameError {
    let kind = match &err {
        ArrowError::CastError(_) => FrameErrorKind::TypeMismatch,
        ArrowError::ComputeError(msg) if msg.contains("type") => FrameErrorKind::TypeMismatch,
        _ => FrameErrorKind::InvalidArgument,
    };
    FrameError::new(kind).with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_division_matches_python() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
    }

    #[test]
    fn pymod_carries_divisor_sign() {
        assert_eq!(pymod(7, 3), 1);
        assert_eq!(pymod(-7, 3), 2);
        assert_eq!(pymod(7, -3), -2);
        assert_eq!(pymod(-6, 3), 0);
    }

    #[test]
    fn fdivmod_floors() {
        let (q, r) = fdivmod(-7.5, 2.0);
        assert_eq!(q, -4.0);
        assert_eq!(r, 0.5);
    }
}
