//! Error types for the price_forecast crate

use forecast_math::MathError;
use thiserror::Error;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Input data could not be read or is malformed
    #[error("Data load error: {0}")]
    DataLoad(String),

    /// Too few observations for the requested model or test
    #[error("Insufficient data for {model}: need at least {required} observations, got {actual}")]
    InsufficientData {
        model: String,
        required: usize,
        actual: usize,
    },

    /// A custom seasonality definition is invalid
    #[error("Invalid seasonality: {0}")]
    InvalidSeasonality(String),

    /// Forecast and actual series do not line up
    #[error("Misaligned series: {0}")]
    MisalignedSeries(String),

    /// Parameter estimation failed
    #[error("Model did not converge: {0}")]
    NonConvergence(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    Polars(String),

    /// Error from numerical routines
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Chart rendering failed
    #[error("Render error: {0}")]
    Render(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP download failed
    #[cfg(feature = "fetch")]
    #[error("Fetch error: {0}")]
    Fetch(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::Polars(err.to_string())
    }
}

impl ForecastError {
    /// Shorthand for [`ForecastError::InsufficientData`]
    pub fn insufficient(model: impl Into<String>, required: usize, actual: usize) -> Self {
        ForecastError::InsufficientData {
            model: model.into(),
            required,
            actual,
        }
    }
}
