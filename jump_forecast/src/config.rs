//! Engine configuration
//!
//! Every section has working defaults, so a JSON file only needs the keys
//! it overrides:
//!
//! ```json
//! { "simulation": { "n_paths": 5000, "seed": 42 }, "grid_search": { "n_samples": 50 } }
//! ```

use crate::error::{ForecastError, Result};
use chrono::NaiveTime;
use minute_data::session::{session_open, TRADING_MINUTES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest number of steps a simulated path may have
pub const MAX_STEPS: usize = 1_000_000;

/// Monte Carlo discretisation and ensemble size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Time step in trading days (one minute is 1/390)
    pub dt: f64,
    /// Horizon in trading days (one hour is 1/6.5)
    pub horizon: f64,
    /// Number of simulated paths
    pub n_paths: usize,
    /// Minutes per session, used to scale per-minute volatility
    pub trading_minutes: u32,
    /// Seed for the random source; drawn from entropy when absent
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 390.0,
            horizon: 1.0 / 6.5,
            n_paths: 1000,
            trading_minutes: TRADING_MINUTES,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Number of time steps per path, including the seed price column
    pub fn n_steps(&self) -> usize {
        (self.horizon / self.dt).round() as usize
    }

    /// Reject non-positive steps, horizons shorter than one step, step
    /// counts above [`MAX_STEPS`] and empty ensembles
    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        if !self.horizon.is_finite() || self.horizon < self.dt {
            return Err(ForecastError::InvalidParameter(format!(
                "horizon {} covers no step of size {}",
                self.horizon, self.dt
            )));
        }
        let ratio = self.horizon / self.dt;
        if !ratio.is_finite() || ratio.round() > MAX_STEPS as f64 {
            return Err(ForecastError::InvalidParameter(format!(
                "horizon {} over dt {} needs more than {} steps",
                self.horizon, self.dt, MAX_STEPS
            )));
        }
        if self.n_paths == 0 {
            return Err(ForecastError::InvalidParameter(
                "n_paths must be greater than zero".to_string(),
            ));
        }
        if self.trading_minutes == 0 {
            return Err(ForecastError::InvalidParameter(
                "trading_minutes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Jump classification and scaling used by calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Number of most recent overnight returns to calibrate on
    pub window_size: usize,
    /// Jump threshold in standard deviations
    pub threshold: f64,
    /// Multiplier on the standard deviation of detected jumps
    pub jump_std_scale: f64,
    /// Multiplier on the empirical jump frequency
    pub lambda_scale: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            threshold: 3.0,
            jump_std_scale: 1.5,
            lambda_scale: 2.0,
        }
    }
}

impl CalibrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        check_non_negative("threshold", self.threshold)?;
        check_non_negative("jump_std_scale", self.jump_std_scale)?;
        check_non_negative("lambda_scale", self.lambda_scale)
    }
}

/// Randomised hyperparameter search settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSearchConfig {
    /// Number of sampled hyperparameter triples
    pub n_samples: usize,
    /// Uniform sampling range for the jump threshold
    pub threshold_range: (f64, f64),
    /// Uniform sampling range for the jump std multiplier
    pub jump_std_scale_range: (f64, f64),
    /// Uniform sampling range for the intensity multiplier
    pub lambda_scale_range: (f64, f64),
    /// Lower percentile of the coverage band
    pub lower_percentile: f64,
    /// Upper percentile of the coverage band
    pub upper_percentile: f64,
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            n_samples: 25,
            threshold_range: (2.0, 3.5),
            jump_std_scale_range: (0.9, 1.6),
            lambda_scale_range: (1.0, 2.0),
            lower_percentile: 5.0,
            upper_percentile: 95.0,
        }
    }
}

impl GridSearchConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, (lo, hi)) in [
            ("threshold_range", self.threshold_range),
            ("jump_std_scale_range", self.jump_std_scale_range),
            ("lambda_scale_range", self.lambda_scale_range),
        ] {
            check_non_negative(name, lo)?;
            if !(hi.is_finite() && lo <= hi) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must satisfy low <= high, got ({}, {})",
                    name, lo, hi
                )));
            }
        }
        let band_ok = 0.0 <= self.lower_percentile
            && self.lower_percentile < self.upper_percentile
            && self.upper_percentile <= 100.0;
        if !band_ok {
            return Err(ForecastError::InvalidParameter(format!(
                "coverage band ({}, {}) must be increasing within [0, 100]",
                self.lower_percentile, self.upper_percentile
            )));
        }
        Ok(())
    }
}

/// Intraday estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Resample interval in minutes
    pub resample_minutes: u32,
    /// Rolling window in resampled bars
    pub window: usize,
    /// Minutes per session, used to scale the window volatility
    pub trading_minutes: u32,
    /// Time of the per-session reference point
    pub reference_time: NaiveTime,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            resample_minutes: 5,
            window: 5,
            trading_minutes: TRADING_MINUTES,
            reference_time: session_open(),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "estimator window must be at least 2, got {}",
                self.window
            )));
        }
        if self.resample_minutes == 0 || self.trading_minutes == 0 {
            return Err(ForecastError::InvalidParameter(
                "resample_minutes and trading_minutes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub simulation: SimulationConfig,
    pub calibration: CalibrationConfig,
    pub grid_search: GridSearchConfig,
    pub estimators: EstimatorConfig,
}

impl ForecastConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.calibration.validate()?;
        self.grid_search.validate()?;
        self.estimators.validate()
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_horizon_is_sixty_steps() {
        assert_eq!(SimulationConfig::default().n_steps(), 60);
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(ForecastConfig::default().validate().is_ok());
    }

    #[test]
    fn test_horizon_shorter_than_one_step_is_rejected() {
        let config = SimulationConfig {
            dt: 0.01,
            horizon: 0.006,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_step_count_is_bounded() {
        let tiny_step = SimulationConfig {
            dt: 1e-300,
            horizon: 1.0,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            tiny_step.validate(),
            Err(ForecastError::InvalidParameter(_))
        ));

        let at_limit = SimulationConfig {
            dt: 1.0,
            horizon: MAX_STEPS as f64,
            ..SimulationConfig::default()
        };
        assert!(at_limit.validate().is_ok());
        let over_limit = SimulationConfig {
            horizon: (MAX_STEPS + 1) as f64,
            ..at_limit
        };
        assert!(over_limit.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ForecastConfig::from_json_str(
            r#"{ "simulation": { "n_paths": 200, "seed": 9 }, "estimators": { "window": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.simulation.n_paths, 200);
        assert_eq!(config.simulation.seed, Some(9));
        assert_eq!(config.simulation.n_steps(), 60);
        assert_eq!(config.estimators.window, 10);
        assert_eq!(config.calibration, CalibrationConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ForecastConfig::from_json_str(r#"{ "simulation": { "dt": 0.0 } }"#).is_err());
        assert!(ForecastConfig::from_json_str(r#"{ "estimators": { "window": 1 } }"#).is_err());
        assert!(
            ForecastConfig::from_json_str(r#"{ "grid_search": { "threshold_range": [3.0, 2.0] } }"#)
                .is_err()
        );
        assert!(matches!(
            ForecastConfig::from_json_str("{ not json"),
            Err(ForecastError::ConfigError(_))
        ));
    }
}
