//! Error types for the jump_forecast crate

use chrono::{NaiveDate, NaiveTime};
use minute_data::DataError;
use thiserror::Error;
use trade_math::MathError;

/// Custom error types for the jump_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Too few observations to calibrate or to score a configuration
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A spread of zero that would leave a standardised score undefined
    #[error("Degenerate distribution: {0}")]
    DegenerateDistribution(String),

    /// A session has no resampled bar at the reference time
    #[error("Missing reference point: session {session_date} has no bar at {time}")]
    MissingReferencePoint {
        session_date: NaiveDate,
        time: NaiveTime,
    },

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error loading or validating configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from the minute data store
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ForecastError {
    /// Whether the failure only invalidates one sample or session
    ///
    /// Batch operations skip the affected unit and continue on these; every
    /// other kind aborts the batch.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ForecastError::InsufficientData(_)
                | ForecastError::DegenerateDistribution(_)
                | ForecastError::MissingReferencePoint { .. }
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData(msg) => ForecastError::InsufficientData(msg),
            MathError::InvalidInput(msg) => ForecastError::InvalidParameter(msg),
            MathError::CalculationError(msg) => ForecastError::DegenerateDistribution(msg),
        }
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(err: serde_json::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
