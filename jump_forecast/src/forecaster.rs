//! End-to-end forecasting over one minute series
//!
//! [`JumpDiffusionForecaster`] ties the pieces together for the most recent
//! session: overnight returns calibrate the model, the session's first
//! price at or after the open seeds the simulation, and the session's
//! closes from the open onwards are the realised path that grid search
//! scores against.

use crate::calibration::{calibrate, CalibratedParameters, JumpRule};
use crate::config::ForecastConfig;
use crate::error::{ForecastError, Result};
use crate::grid_search::{grid_search, GridSearchResult};
use crate::overnight::recent_overnight_returns;
use crate::simulation::{simulate_paths, SimulatedPathEnsemble};
use minute_data::session::{from_time, session_open};
use minute_data::MinuteSeries;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use trade_math::{mean, population_std};

/// Summary of one simulated forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityForecast {
    /// Mean of the per-path volatilities
    pub mean_vol: f64,
    /// Population std of the per-path volatilities
    pub std_vol: f64,
    /// Parameters the paths were simulated with
    pub parameters: CalibratedParameters,
    /// Starting price of every path
    pub seed_price: f64,
}

/// Jump-diffusion forecaster over a minute series
#[derive(Debug, Clone)]
pub struct JumpDiffusionForecaster {
    series: MinuteSeries,
    config: ForecastConfig,
}

impl JumpDiffusionForecaster {
    /// Create a forecaster, validating the configuration
    pub fn new(series: MinuteSeries, config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { series, config })
    }

    pub fn series(&self) -> &MinuteSeries {
        &self.series
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// The most recent `window_size` overnight log returns
    pub fn overnight_returns(&self) -> Result<Vec<f64>> {
        recent_overnight_returns(&self.series, self.config.calibration.window_size)
    }

    /// Closes of the latest session from the open onwards
    pub fn observed_path(&self) -> Vec<f64> {
        match self.series.latest_session_date() {
            Some(date) => from_time(self.series.session(date), session_open())
                .iter()
                .map(|b| b.close)
                .collect(),
            None => Vec::new(),
        }
    }

    /// First close of the latest session at or after the open, else the last close
    pub fn seed_price(&self) -> Result<f64> {
        self.observed_path()
            .first()
            .copied()
            .or_else(|| self.series.last().map(|b| b.close))
            .ok_or_else(|| ForecastError::InsufficientData("series has no bars".to_string()))
    }

    /// Calibrate on the recent overnight returns with the configured rule
    pub fn calibrate(&self) -> Result<CalibratedParameters> {
        let returns = self.overnight_returns()?;
        calibrate(&returns, &JumpRule::from(&self.config.calibration))
    }

    /// Calibrate and simulate an ensemble from the seed price
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<(CalibratedParameters, SimulatedPathEnsemble)> {
        let parameters = self.calibrate()?;
        let ensemble = simulate_paths(self.seed_price()?, &parameters, &self.config.simulation, rng)?;
        Ok((parameters, ensemble))
    }

    /// Calibrate, simulate and summarise the per-path volatilities
    pub fn forecast_volatility<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<VolatilityForecast> {
        let (parameters, ensemble) = self.simulate(rng)?;
        let path_vols = ensemble.path_volatilities(self.config.simulation.trading_minutes)?;
        let forecast = VolatilityForecast {
            mean_vol: mean(&path_vols)?,
            std_vol: population_std(&path_vols)?,
            parameters,
            seed_price: ensemble.seed_price(),
        };

        info!(
            mean_vol = forecast.mean_vol,
            std_vol = forecast.std_vol,
            jump_intensity = parameters.jump_intensity,
            seed_price = forecast.seed_price,
            "volatility forecast"
        );
        Ok(forecast)
    }

    /// Tune the jump rule against the latest session's realised path
    pub fn grid_search<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<GridSearchResult> {
        let returns = self.overnight_returns()?;
        grid_search(
            &returns,
            self.seed_price()?,
            &self.observed_path(),
            &self.config.grid_search,
            &self.config.simulation,
            rng,
        )
    }
}
