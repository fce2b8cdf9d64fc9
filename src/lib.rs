//! # Stock Forecast
//!
//! Workspace facade over the forecasting crates:
//!
//! - [`math`]: numerical building blocks (statistics, least squares,
//!   Nelder-Mead, lag polynomials, the ADF test)
//! - [`forecast`]: price series, models, evaluation, reporting and the
//!   end-to-end pipeline
//!
//! The command-line tool and the dashboard live in the `forecast_app`
//! member crate.
//!
//! ## Example
//!
//! ```
//! use stock_forecast_workspace::forecast::utils::{business_days_after, parse_date};
//!
//! let friday = parse_date("2024-03-01").unwrap();
//! let next = business_days_after(friday, 1).unwrap();
//! assert_eq!(next[0], parse_date("2024-03-04").unwrap());
//! ```

pub use forecast_math as math;
pub use price_forecast as forecast;

pub use price_forecast::{
    fit, run_pipeline, FitParams, ForecastError, ForecastResult, PipelineConfig, Reporter, Series,
};
