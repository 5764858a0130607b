//! Fixed-size rolling window statistics over gap-aware series
//!
//! A window produces a value only when it is completely filled with
//! defined observations. Output index `i` summarises the window ending at
//! input index `i`, so the first `window - 1` outputs are always `None`.

use crate::statistics;
use crate::{MathError, Result};

fn validate_window(window: usize) -> Result<()> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Rolling window must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Apply `stat` to every full window of defined values
fn rolling_apply<F>(values: &[Option<f64>], window: usize, stat: F) -> Result<Vec<Option<f64>>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    validate_window(window)?;

    let mut out = vec![None; values.len()];
    let mut buffer = Vec::with_capacity(window);

    for end in (window - 1)..values.len() {
        buffer.clear();
        buffer.extend(values[end + 1 - window..=end].iter().flatten());
        if buffer.len() == window {
            out[end] = stat(&buffer);
        }
    }

    Ok(out)
}

/// Rolling arithmetic mean
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    rolling_apply(values, window, |w| statistics::mean(w).ok())
}

/// Rolling sample variance; a window of one observation has no variance
pub fn rolling_var(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    rolling_apply(values, window, |w| statistics::sample_variance(w).ok())
}

/// Rolling sample standard deviation
pub fn rolling_std(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    rolling_apply(values, window, |w| statistics::sample_std(w).ok())
}
