use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Fractional error of `actual` relative to a non-zero `expected`.
pub fn fractional_error(actual: Real, expected: Real) -> Real {
    (actual - expected).abs() / expected.abs()
}
