//! Metrics for evaluating forecast performance

use crate::data::Series;
use crate::error::{ForecastError, Result};
use crate::models::ForecastResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Forecast accuracy against held-out observations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean absolute error
    pub mae: f64,
    /// Root mean squared error
    pub rmse: f64,
}

/// How forecast points are paired with actual observations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Dates must match exactly, position by position
    ByDate,
    /// Pair by position; dates come from the actual series
    ///
    /// The business-day calendar does not know exchange holidays, so a
    /// held-out window rarely has exactly the forecast dates.
    #[default]
    ByPosition,
}

/// Compare a forecast with actual observations on identical dates
pub fn evaluate(forecast: &ForecastResult, actual: &Series) -> Result<Metrics> {
    check_lengths(forecast, actual)?;

    for (p, o) in forecast.points.iter().zip(actual.observations()) {
        if p.date != o.date {
            return Err(ForecastError::MisalignedSeries(format!(
                "Forecast date {} does not match actual date {}",
                p.date, o.date
            )));
        }
    }

    compute(forecast, actual)
}

/// Compare a forecast with actual observations position by position
pub fn evaluate_by_position(forecast: &ForecastResult, actual: &Series) -> Result<Metrics> {
    check_lengths(forecast, actual)?;
    compute(forecast, actual)
}

/// Dispatch on an [`Alignment`]
pub fn evaluate_aligned(
    forecast: &ForecastResult,
    actual: &Series,
    alignment: Alignment,
) -> Result<Metrics> {
    match alignment {
        Alignment::ByDate => evaluate(forecast, actual),
        Alignment::ByPosition => evaluate_by_position(forecast, actual),
    }
}

fn check_lengths(forecast: &ForecastResult, actual: &Series) -> Result<()> {
    if forecast.is_empty() || actual.is_empty() {
        return Err(ForecastError::MisalignedSeries(
            "Cannot evaluate an empty series".to_string(),
        ));
    }
    if forecast.len() != actual.len() {
        return Err(ForecastError::MisalignedSeries(format!(
            "Forecast has {} points but actual has {}",
            forecast.len(),
            actual.len()
        )));
    }
    Ok(())
}

fn compute(forecast: &ForecastResult, actual: &Series) -> Result<Metrics> {
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;

    for (p, o) in forecast.points.iter().zip(actual.observations()) {
        let value = o.value.ok_or_else(|| {
            ForecastError::MisalignedSeries(format!("Actual value on {} is undefined", o.date))
        })?;
        let error = p.point - value;
        abs_sum += error.abs();
        sq_sum += error * error;
    }

    let n = forecast.len() as f64;
    let metrics = Metrics {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
    };
    debug!(mae = metrics.mae, rmse = metrics.rmse, "Evaluated forecast");
    Ok(metrics)
}
