//! Threshold-based calibration of jump-diffusion parameters
//!
//! Returns further than `threshold` sample standard deviations from the
//! sample mean are classified as jumps. Jumps are modelled as downside
//! shocks only, so the fitted jump mean is never positive.

use crate::config::CalibrationConfig;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use trade_math::{mean, sample_std};

/// Jump mean used when no jump is observed in the window
pub const DEFAULT_JUMP_MEAN: f64 = -0.0001;

/// Jump standard deviation used when fewer than two jumps are observed
pub const DEFAULT_JUMP_STD: f64 = 0.0002;

/// Parameters of a Merton jump-diffusion with downside-only jumps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibratedParameters {
    /// Drift per unit time (mu)
    pub drift: f64,
    /// Diffusion volatility (sigma)
    pub diffusion_vol: f64,
    /// Jump intensity per unit time (lambda)
    pub jump_intensity: f64,
    /// Mean jump size, non-positive
    pub jump_mean: f64,
    /// Jump size standard deviation
    pub jump_std: f64,
}

impl CalibratedParameters {
    /// Build parameters, checking the model invariants
    pub fn new(
        drift: f64,
        diffusion_vol: f64,
        jump_intensity: f64,
        jump_mean: f64,
        jump_std: f64,
    ) -> Result<Self> {
        let params = Self {
            drift,
            diffusion_vol,
            jump_intensity,
            jump_mean,
            jump_std,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check finiteness, non-negative spreads and intensity, non-positive jump mean
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("drift", self.drift),
            ("diffusion_vol", self.diffusion_vol),
            ("jump_intensity", self.jump_intensity),
            ("jump_mean", self.jump_mean),
            ("jump_std", self.jump_std),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        if self.diffusion_vol < 0.0 || self.jump_std < 0.0 || self.jump_intensity < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "diffusion_vol, jump_std and jump_intensity must be non-negative".to_string(),
            ));
        }
        if self.jump_mean > 0.0 {
            return Err(ForecastError::InvalidParameter(format!(
                "jump_mean must be non-positive, got {}",
                self.jump_mean
            )));
        }
        Ok(())
    }
}

/// Jump classification threshold and the two post-hoc scale factors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpRule {
    /// Threshold in standard deviations
    pub threshold: f64,
    /// Multiplier on the jump standard deviation
    pub jump_std_scale: f64,
    /// Multiplier on the empirical jump frequency
    pub lambda_scale: f64,
}

impl Default for JumpRule {
    fn default() -> Self {
        Self::from(&CalibrationConfig::default())
    }
}

impl From<&CalibrationConfig> for JumpRule {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            threshold: config.threshold,
            jump_std_scale: config.jump_std_scale,
            lambda_scale: config.lambda_scale,
        }
    }
}

impl JumpRule {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("threshold", self.threshold),
            ("jump_std_scale", self.jump_std_scale),
            ("lambda_scale", self.lambda_scale),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Returns with `|r - mu| > threshold * sigma`, in input order
pub fn detect_jumps(returns: &[f64], mu: f64, sigma: f64, threshold: f64) -> Vec<f64> {
    returns
        .iter()
        .copied()
        .filter(|r| (r - mu).abs() > threshold * sigma)
        .collect()
}

/// Calibrate jump-diffusion parameters from log returns
///
/// The intensity is the fraction of returns classified as jumps multiplied
/// by `lambda_scale`; it is an empirical per-step frequency, not a
/// likelihood fit. Fails with `InsufficientData` on fewer than two returns.
pub fn calibrate(returns: &[f64], rule: &JumpRule) -> Result<CalibratedParameters> {
    rule.validate()?;
    if returns.len() < 2 {
        return Err(ForecastError::InsufficientData(format!(
            "Calibration needs at least 2 returns, have {}",
            returns.len()
        )));
    }

    let mu = mean(returns)?;
    let sigma = sample_std(returns)?;
    let jumps = detect_jumps(returns, mu, sigma, rule.threshold);

    let jump_intensity = jumps.len() as f64 / returns.len() as f64 * rule.lambda_scale;
    let jump_mean = if jumps.is_empty() {
        DEFAULT_JUMP_MEAN
    } else {
        -mean(&jumps)?.abs()
    };
    let jump_std = if jumps.len() < 2 {
        DEFAULT_JUMP_STD
    } else {
        sample_std(&jumps)? * rule.jump_std_scale
    };

    debug!(
        n_returns = returns.len(),
        n_jumps = jumps.len(),
        mu,
        sigma,
        jump_intensity,
        jump_mean,
        jump_std,
        "calibrated jump-diffusion"
    );

    CalibratedParameters::new(mu, sigma, jump_intensity, jump_mean, jump_std)
}
