//! Numeric helpers: mean and squared-error metrics.

use crate::error::{KnnError, Result};

/// Arithmetic mean; NaN for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Mean squared error between parallel prediction/target sequences.
///
/// NaN for empty input; `LengthMismatch` when the lengths differ.
pub fn mse(predictions: &[f64], targets: &[f64]) -> Result<f64> {
    if predictions.len() != targets.len() {
        return Err(KnnError::LengthMismatch {
            predictions: predictions.len(),
            targets: targets.len(),
        });
    }
    Ok(mean(
        predictions
            .iter()
            .zip(targets)
            .map(|(p, t)| (p - t) * (p - t)),
    ))
}

pub fn rmse(predictions: &[f64], targets: &[f64]) -> Result<f64> {
    mse(predictions, targets).map(f64::sqrt)
}
