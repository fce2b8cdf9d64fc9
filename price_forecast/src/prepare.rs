//! Series preparation: differencing, stationarity, autocorrelation and
//! classical seasonal decomposition
//!
//! Nothing here transforms a series implicitly. Callers decide whether to
//! difference based on the stationarity report.

use crate::data::{Observation, Series};
use crate::error::{ForecastError, Result};
use forecast_math::moving_averages::centered_moving_average;
use forecast_math::stationarity::{self, AdfResult, CriticalValues};
use forecast_math::stats;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// First difference `out[i] = s[i] - s[i-1]`
///
/// Index 0, and any position where either operand is undefined, is
/// undefined. Dates are unchanged.
pub fn differenced(series: &Series) -> Series {
    let obs = series.observations();
    let values = obs.iter().enumerate().map(|(i, o)| {
        if i == 0 {
            return None;
        }
        match (o.value, obs[i - 1].value) {
            (Some(cur), Some(prev)) => Some(cur - prev),
            _ => None,
        }
    });
    series.with_values(format!("{}_diff", series.label()), values)
}

/// Outcome of an Augmented Dickey-Fuller test on a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityReport {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl StationarityReport {
    /// `true` iff the p-value is strictly below `significance`
    pub fn is_stationary_at(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

impl From<AdfResult> for StationarityReport {
    fn from(r: AdfResult) -> Self {
        Self {
            statistic: r.statistic,
            p_value: r.p_value,
            used_lag: r.used_lag,
            nobs: r.nobs,
            critical_values: r.critical_values,
        }
    }
}

/// ADF test on the defined values of `series`
pub fn stationarity(series: &Series, max_lag: Option<usize>) -> Result<StationarityReport> {
    let values = series.defined_values();
    if values.len() < stationarity::MIN_OBSERVATIONS {
        return Err(ForecastError::insufficient(
            "ADF test",
            stationarity::MIN_OBSERVATIONS,
            values.len(),
        ));
    }

    let report: StationarityReport = stationarity::adf_test(&values, max_lag)?.into();
    debug!(
        series = series.label(),
        statistic = report.statistic,
        p_value = report.p_value,
        used_lag = report.used_lag,
        "ADF test"
    );
    Ok(report)
}

/// Whether the ADF p-value is strictly below `significance`
pub fn is_stationary(series: &Series, significance: f64) -> Result<bool> {
    validate_significance(significance)?;
    Ok(stationarity(series, None)?.is_stationary_at(significance))
}

pub(crate) fn validate_significance(significance: f64) -> Result<()> {
    if !(significance > 0.0 && significance < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Significance must be in (0, 1), got {}",
            significance
        )));
    }
    Ok(())
}

/// Sample autocorrelations for lags `0..=lags`
pub fn autocorrelation(series: &Series, lags: usize) -> Result<Vec<f64>> {
    let values = series.defined_values();
    if values.len() <= lags {
        return Err(ForecastError::insufficient("ACF", lags + 1, values.len()));
    }
    Ok(stats::acf(&values, lags)?)
}

/// Sample partial autocorrelations for lags `0..=lags`
pub fn partial_autocorrelation(series: &Series, lags: usize) -> Result<Vec<f64>> {
    let values = series.defined_values();
    if values.len() <= lags {
        return Err(ForecastError::insufficient("PACF", lags + 1, values.len()));
    }
    Ok(stats::pacf(&values, lags)?)
}

/// How the components combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionKind {
    /// `y = trend + seasonal + residual`
    #[default]
    Additive,
    /// `y = trend * seasonal * residual`
    Multiplicative,
}

/// Trend, seasonal and residual components on the input dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    pub kind: DecompositionKind,
    pub period: usize,
    pub trend: Series,
    pub seasonal: Series,
    pub residual: Series,
}

/// Classical decomposition by centered moving average
///
/// Undefined values are dropped first. Trend and residual are undefined at
/// the `period / 2` positions at each end.
pub fn decompose(series: &Series, period: usize, kind: DecompositionKind) -> Result<Decomposition> {
    if period < 2 {
        return Err(ForecastError::InvalidParameter(format!(
            "Decomposition period must be at least 2, got {}",
            period
        )));
    }

    let clean = series.defined();
    let values = clean.defined_values();
    if values.len() < 2 * period {
        return Err(ForecastError::insufficient(
            "seasonal decomposition",
            2 * period,
            values.len(),
        ));
    }
    if kind == DecompositionKind::Multiplicative && values.iter().any(|v| *v <= 0.0) {
        return Err(ForecastError::InvalidParameter(
            "Multiplicative decomposition needs strictly positive values".to_string(),
        ));
    }

    let trend = centered_moving_average(&values, period)?;

    let detrended: Vec<Option<f64>> = values
        .iter()
        .zip(&trend)
        .map(|(y, t)| {
            t.map(|t| match kind {
                DecompositionKind::Additive => y - t,
                DecompositionKind::Multiplicative => y / t,
            })
        })
        .collect();

    // Average detrended value per position in the cycle
    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, v) in detrended.iter().enumerate() {
        if let Some(v) = v {
            sums[i % period] += v;
            counts[i % period] += 1;
        }
    }
    let mut indices: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();

    let centre = indices.iter().sum::<f64>() / period as f64;
    for idx in indices.iter_mut() {
        match kind {
            DecompositionKind::Additive => *idx -= centre,
            DecompositionKind::Multiplicative => *idx /= centre,
        }
    }

    let seasonal: Vec<f64> = (0..values.len()).map(|i| indices[i % period]).collect();
    let residual: Vec<Option<f64>> = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((y, t), s)| {
            t.map(|t| match kind {
                DecompositionKind::Additive => y - t - s,
                DecompositionKind::Multiplicative => y / (t * s),
            })
        })
        .collect();

    let dates = clean.dates();
    let build = |suffix: &str, vals: Vec<Option<f64>>| {
        let observations = dates
            .iter()
            .zip(vals)
            .map(|(&date, value)| Observation { date, value })
            .collect();
        Series::new(format!("{}_{}", clean.label(), suffix), observations)
    };

    Ok(Decomposition {
        kind,
        period,
        trend: build("trend", trend)?,
        seasonal: build("seasonal", seasonal.into_iter().map(Some).collect())?,
        residual: build("residual", residual)?,
    })
}
