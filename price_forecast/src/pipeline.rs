//! End-to-end forecast run: load, prepare, fit, forecast, evaluate
//!
//! The pipeline is side-effect free apart from reading its data source.
//! Rendering and file output belong to [`crate::report`] and the binaries.

use crate::config::PipelineConfig;
use crate::data::{CsvSource, DataSource, Series};
use crate::error::{ForecastError, Result};
use crate::evaluation::{evaluate_aligned, Metrics};
use crate::models::{fit, FitParams, ForecastResult, ModelSummary};
use crate::prepare::{stationarity, StationarityReport};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub model: String,
    pub params: FitParams,
    /// Loaded (and date-sliced) series
    pub series: Series,
    pub training_end: NaiveDate,
    /// ADF result on the training data; `None` when it could not be computed
    pub stationarity: Option<StationarityReport>,
    pub forecast: ForecastResult,
    /// Held-out observations, when evaluation was requested
    pub actual: Option<Series>,
    pub metrics: Option<Metrics>,
    pub summary: ModelSummary,
}

/// A pipeline bound to one data source
pub struct Pipeline<S: DataSource> {
    source: S,
}

impl<S: DataSource> Pipeline<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run with the model in `config`
    pub fn run(&self, config: &PipelineConfig) -> Result<Report> {
        config.validate()?;
        let series = self.load(config)?;
        run_on_series(series, config, &config.model)
    }

    /// Run every model on the same data
    pub fn compare(&self, config: &PipelineConfig, models: &[FitParams]) -> Result<Vec<Report>> {
        config.validate()?;
        if models.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Nothing to compare: no models given".to_string(),
            ));
        }

        let series = self.load(config)?;
        models
            .iter()
            .map(|params| {
                params.validate()?;
                run_on_series(series.clone(), config, params)
            })
            .collect()
    }

    fn load(&self, config: &PipelineConfig) -> Result<Series> {
        info!(source = self.source.name(), "Loading data");
        let series = self.source.load()?.between(config.start, config.end)?;
        if series.is_empty() {
            return Err(ForecastError::DataLoad(format!(
                "No observations from {} in the requested date range",
                self.source.name()
            )));
        }
        Ok(series)
    }
}

fn run_on_series(series: Series, config: &PipelineConfig, params: &FitParams) -> Result<Report> {
    let (training, actual) = if config.evaluate {
        let (train, hold) = series.split_last(config.horizon).map_err(|_| {
            ForecastError::insufficient(
                format!("{} with a {}-day holdout", params.name(), config.horizon),
                config.horizon + 1,
                series.len(),
            )
        })?;
        (train, Some(hold))
    } else {
        (series.clone(), None)
    };

    let stationarity = match stationarity(&training, config.adf_max_lag) {
        Ok(report) => {
            info!(
                p_value = report.p_value,
                stationary = report.is_stationary_at(config.significance),
                "Stationarity check"
            );
            Some(report)
        }
        Err(e) => {
            warn!(error = %e, "Stationarity check skipped");
            None
        }
    };

    let fitted = fit(&training, params)?;
    let forecast = fitted.forecast(config.horizon)?;

    let metrics = match &actual {
        Some(actual) => {
            let m = evaluate_aligned(&forecast, actual, config.alignment)?;
            info!(model = fitted.name(), mae = m.mae, rmse = m.rmse, "Holdout accuracy");
            Some(m)
        }
        None => None,
    };

    Ok(Report {
        model: fitted.name().to_string(),
        params: params.clone(),
        training_end: fitted.training_end(),
        series,
        stationarity,
        forecast,
        actual,
        metrics,
        summary: fitted.summary(),
    })
}

/// CSV source for `config.input`, honouring `price_field` and `price_column`
pub fn source_from_config(config: &PipelineConfig) -> Result<CsvSource> {
    let input = config.input.as_ref().ok_or_else(|| {
        ForecastError::InvalidParameter("No input file configured".to_string())
    })?;

    let source = CsvSource::new(input).with_price_field(config.price_field);
    Ok(match &config.price_column {
        Some(column) => source.with_price_column(column.clone()),
        None => source,
    })
}

/// Run the configured model on the configured CSV input
pub fn run_pipeline(config: &PipelineConfig) -> Result<Report> {
    Pipeline::new(source_from_config(config)?).run(config)
}

/// Run several models on the configured CSV input
pub fn run_comparison(config: &PipelineConfig, models: &[FitParams]) -> Result<Vec<Report>> {
    Pipeline::new(source_from_config(config)?).compare(config, models)
}

/// The four models compared by default
pub fn default_comparison_models() -> Vec<FitParams> {
    vec![
        FitParams::arima(1, 1, 1),
        FitParams::arima(2, 1, 2),
        FitParams::sarima((1, 1, 1), (1, 1, 1, 12)),
        FitParams::prophet(),
    ]
}
