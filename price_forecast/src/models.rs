//! Forecasting models for daily price series
//!
//! One entry point, [`fit`], takes a training series and a tagged
//! [`FitParams`] and returns a [`FittedModel`]. Every fitted model forecasts
//! onto the business-day calendar that follows the last training date.

use crate::data::{Observation, Series};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

pub mod arima;
pub mod prophet;
pub mod sarima;

pub use arima::{ArimaOrder, BoxJenkinsModel};
pub use prophet::{CustomSeasonality, ProphetModel, ProphetParams};
pub use sarima::SeasonalOrder;

/// Default confidence level of Box-Jenkins forecast intervals
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// Deterministic term of a Box-Jenkins model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Constant iff the total differencing order `d + D` is at most 1
    #[default]
    Auto,
    /// No constant
    None,
    /// Constant (a drift term once the series is differenced)
    Constant,
}

impl Trend {
    pub(crate) fn includes_constant(&self, total_differencing: usize) -> bool {
        match self {
            Trend::Auto => total_differencing <= 1,
            Trend::None => false,
            Trend::Constant => true,
        }
    }
}

/// Model choice and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum FitParams {
    Arima {
        order: ArimaOrder,
        #[serde(default)]
        trend: Trend,
        #[serde(default = "default_confidence")]
        confidence: f64,
    },
    Sarima {
        order: ArimaOrder,
        seasonal: SeasonalOrder,
        #[serde(default)]
        trend: Trend,
        #[serde(default = "default_confidence")]
        confidence: f64,
    },
    Prophet(ProphetParams),
}

impl FitParams {
    pub fn arima(p: usize, d: usize, q: usize) -> Self {
        FitParams::Arima {
            order: ArimaOrder::new(p, d, q),
            trend: Trend::Auto,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn sarima(order: (usize, usize, usize), seasonal: (usize, usize, usize, usize)) -> Self {
        FitParams::Sarima {
            order: ArimaOrder::new(order.0, order.1, order.2),
            seasonal: SeasonalOrder::new(seasonal.0, seasonal.1, seasonal.2, seasonal.3),
            trend: Trend::Auto,
            confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn prophet() -> Self {
        FitParams::Prophet(ProphetParams::default())
    }

    /// Display name such as `ARIMA(1,1,1)` or `SARIMA(1,1,1)(1,1,1,12)`
    pub fn name(&self) -> String {
        match self {
            FitParams::Arima { order, .. } => format!("ARIMA{}", order),
            FitParams::Sarima {
                order, seasonal, ..
            } => format!("SARIMA{}{}", order, seasonal),
            FitParams::Prophet(_) => "Prophet".to_string(),
        }
    }

    /// Check parameters that do not depend on the data
    pub fn validate(&self) -> Result<()> {
        match self {
            FitParams::Arima { confidence, .. } => validate_confidence(*confidence),
            FitParams::Sarima {
                seasonal,
                confidence,
                ..
            } => {
                seasonal.validate()?;
                validate_confidence(*confidence)
            }
            FitParams::Prophet(params) => params.validate(),
        }
    }
}

impl Default for FitParams {
    fn default() -> Self {
        FitParams::arima(1, 1, 1)
    }
}

pub(crate) fn validate_confidence(level: f64) -> Result<()> {
    if !(level > 0.0 && level < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Interval level must be in (0, 1), got {}",
            level
        )));
    }
    Ok(())
}

/// One forecast step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Ordered forecast for a requested horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub model: String,
    /// Nominal coverage of `[lower, upper]`
    pub interval_level: f64,
    pub points: Vec<ForecastPoint>,
}

impl ForecastResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn point_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.point).collect()
    }

    /// Point forecasts as a series labelled with the model name
    pub fn as_series(&self) -> Result<Series> {
        Series::new(
            self.model.clone(),
            self.points
                .iter()
                .map(|p| Observation::new(p.date, p.point))
                .collect(),
        )
    }
}

/// Estimated coefficients and fit statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model: String,
    pub nobs: usize,
    pub coefficients: Vec<(String, f64)>,
    /// Innovation (or observation noise) variance
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
}

impl ModelSummary {
    /// Gaussian log likelihood, AIC and BIC from a residual sum of squares
    pub(crate) fn gaussian(
        model: String,
        nobs: usize,
        coefficients: Vec<(String, f64)>,
        sse: f64,
        n_params: usize,
    ) -> Self {
        let n = nobs.max(1) as f64;
        let sigma2 = sse / n;
        let log_likelihood = -0.5 * n * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let k = n_params as f64;

        Self {
            model,
            nobs,
            coefficients,
            sigma2,
            log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * n.ln(),
        }
    }
}

/// A model fitted to one training series
#[derive(Debug, Clone)]
pub enum FittedModel {
    BoxJenkins(BoxJenkinsModel),
    Prophet(ProphetModel),
}

impl FittedModel {
    pub fn name(&self) -> &str {
        match self {
            FittedModel::BoxJenkins(m) => m.name(),
            FittedModel::Prophet(m) => m.name(),
        }
    }

    /// Exactly `horizon` points on the business days after the training end
    pub fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        match self {
            FittedModel::BoxJenkins(m) => m.forecast(horizon),
            FittedModel::Prophet(m) => m.forecast(horizon),
        }
    }

    /// In-sample one-step-ahead (Box-Jenkins) or smoothed (Prophet) values
    pub fn fitted_values(&self) -> Result<Series> {
        match self {
            FittedModel::BoxJenkins(m) => m.fitted_values(),
            FittedModel::Prophet(m) => m.fitted_values(),
        }
    }

    pub fn summary(&self) -> ModelSummary {
        match self {
            FittedModel::BoxJenkins(m) => m.summary(),
            FittedModel::Prophet(m) => m.summary(),
        }
    }

    /// Last date of the training series
    pub fn training_end(&self) -> NaiveDate {
        match self {
            FittedModel::BoxJenkins(m) => m.training_end(),
            FittedModel::Prophet(m) => m.training_end(),
        }
    }
}

/// Fit the model described by `params` to `training`
///
/// Undefined values (such as the leading gap of a differenced series) are
/// dropped first.
pub fn fit(training: &Series, params: &FitParams) -> Result<FittedModel> {
    params.validate()?;
    let clean = training.defined();

    info!(
        model = %params.name(),
        observations = clean.len(),
        "Fitting model"
    );

    let fitted = match params {
        FitParams::Arima {
            order,
            trend,
            confidence,
        } => FittedModel::BoxJenkins(arima::fit_arima(&clean, *order, *trend, *confidence)?),
        FitParams::Sarima {
            order,
            seasonal,
            trend,
            confidence,
        } => FittedModel::BoxJenkins(sarima::fit_sarima(
            &clean,
            *order,
            *seasonal,
            *trend,
            *confidence,
        )?),
        FitParams::Prophet(p) => FittedModel::Prophet(prophet::fit_prophet(&clean, p)?),
    };

    Ok(fitted)
}
