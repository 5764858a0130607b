//! Descriptive statistics over price and return slices
//!
//! Sample statistics use the `n - 1` denominator, population statistics use
//! `n`. Callers pick explicitly; nothing here guesses.

use crate::{MathError, Result};
use statrs::statistics::Statistics;

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().mean())
}

/// Sample variance (`n - 1` denominator)
pub fn sample_variance(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample variance needs at least 2 values, have {}",
            values.len()
        )));
    }
    Ok(values.iter().variance())
}

/// Sample standard deviation (`n - 1` denominator)
pub fn sample_std(values: &[f64]) -> Result<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Population standard deviation (`n` denominator)
pub fn population_std(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the standard deviation of an empty series".to_string(),
        ));
    }
    Ok(values.iter().population_std_dev())
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in percent (`0.0..=100.0`). For sorted values `v` of length `n`
/// the rank is `q / 100 * (n - 1)` and the result interpolates between the
/// two neighbouring order statistics.
pub fn percentile(values: &[f64], q: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take a percentile of an empty series".to_string(),
        ));
    }
    if !(0.0..=100.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Percentile must be within [0, 100], got {}",
            q
        )));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Percentile input contains NaN".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Log returns `ln(p[i] / p[i - 1])` of a price series
///
/// Returns one fewer element than the input; fewer than two prices yield an
/// empty vector.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    prices.windows(2).map(|w| (w[1] / w[0]).ln()).collect()
}
