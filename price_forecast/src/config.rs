//! Pipeline configuration
//!
//! A [`PipelineConfig`] can be built in code, loaded from JSON, and then
//! overridden field by field (the CLI does this with its flags).

use crate::data::PriceField;
use crate::error::{ForecastError, Result};
use crate::evaluation::Alignment;
use crate::models::FitParams;
use crate::prepare::validate_significance;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Everything one pipeline run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// CSV file read by [`crate::pipeline::run_pipeline`]
    pub input: Option<PathBuf>,
    pub price_field: PriceField,
    /// Explicit price column, overriding `price_field`
    pub price_column: Option<String>,
    /// Inclusive date range applied after loading
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Number of business days to forecast
    pub horizon: usize,
    /// Hold out the last `horizon` observations and score the forecast
    pub evaluate: bool,
    pub alignment: Alignment,
    pub model: FitParams,
    /// Significance level for the informational stationarity check
    pub significance: f64,
    /// Maximum ADF lag; `None` uses the default schedule
    pub adf_max_lag: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: None,
            price_field: PriceField::AdjClose,
            price_column: None,
            start: None,
            end: None,
            horizon: 30,
            evaluate: false,
            alignment: Alignment::ByPosition,
            model: FitParams::default(),
            significance: 0.05,
            adf_max_lag: None,
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from a JSON file; missing fields take defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config: PipelineConfig = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_input<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.input = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_model(mut self, model: FitParams) -> Self {
        self.model = model;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_evaluation(mut self, evaluate: bool) -> Self {
        self.evaluate = evaluate;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be at least 1".to_string(),
            ));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ForecastError::InvalidParameter(format!(
                    "Start date {} is after end date {}",
                    start, end
                )));
            }
        }
        validate_significance(self.significance)?;
        self.model.validate()
    }
}
