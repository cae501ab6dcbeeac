//! Evidence calculator: one interaction event to one evidence delta.

use crate::types::error::{KsError, KsResult};
use crate::types::MAX_READING_DEPTH;

/// Reading depth assumed when the capture pipeline did not report one.
pub const DEFAULT_READING_DEPTH: f64 = 1.0;

/// Compute the evidence contributed by a single interaction.
///
/// Formula: `weight * relevance * clamp(reading_depth, 0, 1.5)`
///
/// - `weight` must be `>= 0`
/// - `relevance` must lie in `[0, 1]`
/// - `reading_depth` is clamped, never rejected; `None` means 1.0
///
/// Out-of-range weight or relevance is an error rather than being clamped.
pub fn compute_delta(weight: f64, relevance: f64, reading_depth: Option<f64>) -> KsResult<f64> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(KsError::invalid(format!(
            "interaction weight must be >= 0, got {weight}"
        )));
    }
    if !(0.0..=1.0).contains(&relevance) {
        return Err(KsError::invalid(format!(
            "relevance must be within [0, 1], got {relevance}"
        )));
    }

    let depth = match reading_depth {
        Some(d) if d.is_nan() => DEFAULT_READING_DEPTH,
        Some(d) => d.clamp(0.0, MAX_READING_DEPTH),
        None => DEFAULT_READING_DEPTH,
    };

    Ok(weight * relevance * depth)
}
