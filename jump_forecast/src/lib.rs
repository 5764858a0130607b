//! # Jump Forecast
//!
//! Short-horizon volatility forecasting for index futures with a Merton
//! jump-diffusion, plus a family of intraday estimators to benchmark it.
//!
//! ## Features
//!
//! - Overnight (close-to-open) return extraction from minute bars
//! - Threshold-based calibration with downside-only jumps
//! - Seedable, parallel Monte Carlo path simulation
//! - Randomised hyperparameter search scored by coverage and z-score
//! - Realized, Parkinson, Garman-Klass and Yang-Zhang estimators
//! - Dislocation of estimator volatility against a reference implied volatility
//!
//! ## Quick Start
//!
//! ```no_run
//! use jump_forecast::config::ForecastConfig;
//! use jump_forecast::forecaster::JumpDiffusionForecaster;
//! use minute_data::loader::load_minute_bars;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let series = load_minute_bars(
//!     "es_futures_1m_all.csv",
//!     chrono_tz::UTC,
//!     chrono_tz::America::New_York,
//! )?;
//! let forecaster = JumpDiffusionForecaster::new(series, ForecastConfig::default())?;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let forecast = forecaster.forecast_volatility(&mut rng)?;
//! println!("mean vol {:.4} +/- {:.4}", forecast.mean_vol, forecast.std_vol);
//!
//! let search = forecaster.grid_search(&mut rng)?;
//! if let Some(best) = search.best() {
//!     println!("best threshold {:.2} (z = {:.2})", best.threshold, best.z_score);
//! }
//! # Ok::<(), jump_forecast::ForecastError>(())
//! ```

pub mod calibration;
pub mod config;
pub mod dislocation;
pub mod error;
pub mod estimators;
pub mod forecaster;
pub mod grid_search;
pub mod overnight;
pub mod simulation;

// Re-export commonly used types
pub use crate::calibration::{calibrate, CalibratedParameters, JumpRule};
pub use crate::config::ForecastConfig;
pub use crate::dislocation::{analyze_vol_dislocation, DislocationRecord};
pub use crate::error::{ForecastError, Result};
pub use crate::estimators::{EstimatorKind, EstimatorSeries, VolatilityEstimate};
pub use crate::forecaster::{JumpDiffusionForecaster, VolatilityForecast};
pub use crate::grid_search::{grid_search, GridSearchEntry, GridSearchResult};
pub use crate::overnight::{extract_overnight_returns, OvernightReturn};
pub use crate::simulation::{simulate_path, simulate_paths, PathSimulator, SimulatedPathEnsemble};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
