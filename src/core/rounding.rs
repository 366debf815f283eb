//! Fixed-Precision Rounding
//!
//! Deterministic "round half away from zero", used at every point where a
//! multiplier or monetary value is derived. Keeping all rounding behind one
//! function is what makes outcomes reproducible by third-party verifiers:
//! the exact placement of rounding calls is part of the published algorithm.

use thiserror::Error;

/// Errors from the rounding utility.
#[derive(Debug, Error, PartialEq)]
pub enum RoundingError {
    /// Value is NaN or infinite.
    #[error("value to round is not finite: {0}")]
    NotFinite(f64),
}

/// Round `value` to `decimals` places, half away from zero.
///
/// Works on `value * 10^decimals` and divides back, so repeated calls do not
/// accumulate drift. `f64::round` is half-away-from-zero, which is the
/// behavior the public verification contract documents.
pub fn round_to_decimals(value: f64, decimals: u32) -> Result<f64, RoundingError> {
    if !value.is_finite() {
        return Err(RoundingError::NotFinite(value));
    }
    let factor = 10f64.powi(decimals as i32);
    Ok((value * factor).round() / factor)
}

/// Round to the 2 decimal places used throughout the multiplier math.
pub fn round2(value: f64) -> Result<f64, RoundingError> {
    round_to_decimals(value, 2)
}
