//! # Forecast Math
//!
//! Numerical building blocks for time series forecasting.
//! This crate provides the pieces the model layer is assembled from:
//! descriptive statistics and autocorrelation, dense least squares,
//! Nelder-Mead minimization, lag polynomial algebra, moving averages and
//! the Augmented Dickey-Fuller unit-root test.

use thiserror::Error;

pub mod linalg;
pub mod moving_averages;
pub mod optimize;
pub mod polynomial;
pub mod stationarity;
pub mod stats;

/// Errors that can occur in numerical routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Matrix is singular or not positive definite: {0}")]
    Singular(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_context() {
        let err = MathError::InsufficientData("need 10 values, have 3".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient data for calculation: need 10 values, have 3"
        );
    }
}
