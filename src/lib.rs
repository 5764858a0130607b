//! # Vol Forecast Workspace
//!
//! Umbrella crate for the volatility forecasting workspace. It re-exports
//! the member crates so downstream code can depend on a single package:
//!
//! - [`trade_math`]: statistics and rolling-window primitives
//! - [`minute_data`]: minute bars, sessions, resampling and loaders
//! - [`jump_forecast`]: calibration, simulation, grid search and estimators
//!
//! ## Example
//!
//! ```
//! use vol_forecast_workspace::jump_forecast::{ForecastConfig, JumpDiffusionForecaster};
//! use vol_forecast_workspace::minute_data::synthetic::{generate_minute_bars, SyntheticSpec};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let spec = SyntheticSpec { days: 20, ..SyntheticSpec::default() };
//! let series = generate_minute_bars(&mut rng, &spec).unwrap();
//!
//! let forecaster = JumpDiffusionForecaster::new(series, ForecastConfig::default()).unwrap();
//! let params = forecaster.calibrate().unwrap();
//! assert!(params.jump_mean <= 0.0);
//! ```

pub use jump_forecast;
pub use minute_data;
pub use trade_math;
