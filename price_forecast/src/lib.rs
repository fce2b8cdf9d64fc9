//! # Price Forecast
//!
//! Daily stock price forecasting as one reusable pipeline:
//! load → prepare → fit → forecast → evaluate → report.
//!
//! ## Features
//!
//! - Clean, sorted, de-duplicated price series from CSV (or the Yahoo
//!   Finance chart API with the `fetch` feature)
//! - Differencing, Augmented Dickey-Fuller test, ACF/PACF and classical
//!   seasonal decomposition
//! - ARIMA and seasonal ARIMA estimated by conditional sum of squares
//! - Prophet-style trend + Fourier seasonality regression with simulated
//!   intervals
//! - MAE/RMSE evaluation against held-out data
//! - SVG charts and markdown summaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use price_forecast::config::PipelineConfig;
//! use price_forecast::models::FitParams;
//! use price_forecast::pipeline::run_pipeline;
//! use price_forecast::report::Reporter;
//!
//! # fn main() -> price_forecast::Result<()> {
//! let config = PipelineConfig::default()
//!     .with_input("AAPL.csv")
//!     .with_model(FitParams::arima(1, 1, 1))
//!     .with_horizon(30)
//!     .with_evaluation(true);
//!
//! let report = run_pipeline(&config)?;
//! println!("MAE: {:?}", report.metrics.map(|m| m.mae));
//!
//! Reporter::new().render_report(&report)?.write_to("out")?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod pipeline;
pub mod prepare;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use crate::config::PipelineConfig;
pub use crate::data::{CsvSource, DataSource, MemorySource, Observation, PriceField, Series};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluation::{evaluate, evaluate_by_position, Alignment, Metrics};
pub use crate::models::{fit, FitParams, FittedModel, ForecastPoint, ForecastResult};
pub use crate::pipeline::{run_comparison, run_pipeline, Pipeline, Report};
pub use crate::report::{RenderedOutput, Reporter};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
