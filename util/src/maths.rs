//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `lhs` is much smaller than `rhs.abs()` in magnitude and `lhs < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle in degrees into the range `(-180, 180]`.
///
/// Used when computing steering errors so that the vehicle always turns the
/// short way round.
pub fn wrap_signed_deg<T>(angle: T) -> T
where
    T: Float,
{
    let full: T = T::from(360.0).unwrap();
    let half: T = T::from(180.0).unwrap();

    let wrapped = rem_euclid(angle, full);

    if wrapped > half {
        wrapped - full
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rem_euclid() {
        assert_eq!(rem_euclid(-90f64, 360f64), 270f64);
        assert_eq!(rem_euclid(450f64, 360f64), 90f64);
        assert_eq!(rem_euclid(0f64, 360f64), 0f64);
    }

    #[test]
    fn test_wrap_signed_deg() {
        assert_eq!(wrap_signed_deg(0f64), 0f64);
        assert_eq!(wrap_signed_deg(180f64), 180f64);
        assert_eq!(wrap_signed_deg(181f64), -179f64);
        assert_eq!(wrap_signed_deg(-90f64), -90f64);
        assert_eq!(wrap_signed_deg(270f64), -90f64);
        assert_eq!(wrap_signed_deg(-270f64), 90f64);
        assert_eq!(wrap_signed_deg(720f64), 0f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(120f64, -90f64, 90f64), 90f64);
        assert_eq!(clamp(-120f64, -90f64, 90f64), -90f64);
        assert_eq!(clamp(45f64, -90f64, 90f64), 45f64);
    }
}
