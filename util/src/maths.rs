//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Replace a non-finite value (NaN or infinite) with zero.
pub fn finite_or_zero<T>(value: T) -> T
where
    T: Float,
{
    if value.is_finite() {
        value
    } else {
        T::zero()
    }
}

/// Apply a deadband to a value, rescaling the remaining range so that the edge of the deadband
/// maps to zero and full scale still maps to full scale.
///
/// A deadband outside `[0, 1)` leaves the value untouched.
pub fn deadband<T>(value: T, band: T) -> T
where
    T: Float,
{
    if band <= T::zero() || band >= T::one() {
        return value;
    }

    if value.abs() < band {
        T::zero()
    } else {
        value.signum() * (value.abs() - band) / (T::one() - band)
    }
}

/// Move `current` towards `target` by no more than `max_step`.
pub fn slew<T>(current: T, target: T, max_step: T) -> T
where
    T: Float,
{
    let delta = target - current;

    if delta.abs() > max_step {
        current + max_step * delta.signum()
    } else {
        target
    }
}

/// Clamp a value symmetrically about zero, returning the clamped value and whether the clamp was
/// active.
pub fn clamp_sym<T>(value: T, limit: T) -> (T, bool)
where
    T: Float,
{
    if value > limit {
        (limit, true)
    } else if value < -limit {
        (-limit, true)
    } else {
        (value, false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_finite_or_zero() {
        assert_eq!(finite_or_zero(0.3f64), 0.3);
        assert_eq!(finite_or_zero(f64::NAN), 0.0);
        assert_eq!(finite_or_zero(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_deadband() {
        assert_eq!(deadband(0.04f64, 0.05), 0.0);
        assert_eq!(deadband(-0.04f64, 0.05), 0.0);
        assert_eq!(deadband(1.0f64, 0.05), 1.0);
        assert_eq!(deadband(-1.0f64, 0.05), -1.0);
        assert!((deadband(0.525f64, 0.05) - 0.5).abs() < 1e-12);
        assert_eq!(deadband(0.01f64, 0.0), 0.01);
    }

    #[test]
    fn test_slew() {
        assert_eq!(slew(0.0f64, 1.0, 0.25), 0.25);
        assert_eq!(slew(0.5f64, -0.5, 0.25), 0.25);
        assert_eq!(slew(0.5f64, 0.6, 0.25), 0.6);
    }

    #[test]
    fn test_clamp_sym() {
        assert_eq!(clamp_sym(2.0f64, 0.8), (0.8, true));
        assert_eq!(clamp_sym(-2.0f64, 0.8), (-0.8, true));
        assert_eq!(clamp_sym(0.3f64, 0.8), (0.3, false));
    }
}
