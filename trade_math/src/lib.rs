//! # Trade Math
//!
//! Statistical primitives shared by the volatility estimators and the
//! simulation scoring code. Everything here works on plain slices; series
//! with gaps are represented as `Option<f64>` where `None` marks a missing
//! observation, mirroring how a rolling window is undefined until it fills.

use thiserror::Error;

pub mod rolling;
pub mod statistics;

pub use rolling::{rolling_mean, rolling_std, rolling_var};
pub use statistics::{
    log_returns, mean, percentile, population_std, sample_std, sample_variance,
};

/// Errors that can occur in trading-related calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for trading math operations
pub type Result<T> = std::result::Result<T, MathError>;
