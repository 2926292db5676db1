//! Cosine similarity between two embeddings.

use crate::error::ComparisonError;

/// Cosine similarity of `a` and `b`, in [-1.0, 1.0].
///
/// Sums are accumulated in `f64` left to right, so the result is
/// deterministic and symmetric for a given pair. Rounding overshoot is
/// clamped back into range.
///
/// # Errors
///
/// - [`ComparisonError::DimensionMismatch`] when the lengths differ.
/// - [`ComparisonError::NonFinite`] when either vector holds NaN or infinity.
/// - [`ComparisonError::ZeroNorm`] when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, ComparisonError> {
    if a.len() != b.len() {
        return Err(ComparisonError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (&x, &y) in a.iter().zip(b) {
        if !x.is_finite() || !y.is_finite() {
            return Err(ComparisonError::NonFinite);
        }
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Err(ComparisonError::ZeroNorm);
    }

    let score = dot / (norm_a.sqrt() * norm_b.sqrt());
    if !score.is_finite() {
        return Err(ComparisonError::NonFinite);
    }
    Ok(score.clamp(-1.0, 1.0))
}
