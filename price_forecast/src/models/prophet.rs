//! Prophet-style additive regression
//!
//! `y(t) = g(t) + s(t) + e(t)` where `g` is a piecewise-linear trend with
//! changepoints spread over the first part of the history and `s` is a sum
//! of Fourier series (yearly, weekly and any custom periods). Time is
//! scaled to `[0, 1]` over the history and `y` by its maximum magnitude.
//!
//! The MAP estimate is a penalized least squares fit: each coefficient
//! group gets a Gaussian prior whose scale is the matching prior-scale
//! parameter. Forecast intervals are simulated: future trend changes arrive
//! as a Poisson process with Laplace-distributed rate changes, and
//! observation noise is added on top.

use crate::data::{Observation, Series};
use crate::error::{ForecastError, Result};
use crate::models::{ForecastPoint, ForecastResult, ModelSummary};
use crate::utils::{business_days_after, days_since_epoch};
use chrono::NaiveDate;
use forecast_math::linalg::{least_squares, ridge};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, Poisson};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use tracing::{debug, info};

/// Prior scale of the base growth rate and offset
const TREND_PRIOR_SCALE: f64 = 5.0;
/// Floor on the noise variance used to derive penalties (scaled units)
const MIN_NOISE_VARIANCE: f64 = 1e-8;

/// User-defined Fourier seasonality
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomSeasonality {
    pub name: String,
    /// Period in days
    pub period_days: f64,
    pub fourier_order: usize,
}

impl CustomSeasonality {
    pub fn new(name: impl Into<String>, period_days: f64, fourier_order: usize) -> Self {
        Self {
            name: name.into(),
            period_days,
            fourier_order,
        }
    }
}

/// Settings of the Prophet-style model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProphetParams {
    pub seasonalities: Vec<CustomSeasonality>,
    /// `None` enables yearly seasonality when the history spans two years
    pub yearly: Option<bool>,
    /// `None` enables weekly seasonality for sub-weekly data over two weeks
    pub weekly: Option<bool>,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    /// Nominal coverage of the forecast interval
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for ProphetParams {
    fn default() -> Self {
        Self {
            seasonalities: Vec::new(),
            yearly: None,
            weekly: None,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 42,
        }
    }
}

impl ProphetParams {
    /// Add a custom seasonality
    pub fn with_seasonality(
        mut self,
        name: impl Into<String>,
        period_days: f64,
        fourier_order: usize,
    ) -> Self {
        self.seasonalities
            .push(CustomSeasonality::new(name, period_days, fourier_order));
        self
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for s in &self.seasonalities {
            if s.name.trim().is_empty() {
                return Err(ForecastError::InvalidSeasonality(
                    "Seasonality name must not be empty".to_string(),
                ));
            }
            if !names.insert(s.name.as_str()) {
                return Err(ForecastError::InvalidSeasonality(format!(
                    "Seasonality '{}' is defined twice",
                    s.name
                )));
            }
            if !(s.period_days.is_finite() && s.period_days > 0.0) {
                return Err(ForecastError::InvalidSeasonality(format!(
                    "Seasonality '{}' has period {}; must be positive",
                    s.name, s.period_days
                )));
            }
            if s.fourier_order < 1 {
                return Err(ForecastError::InvalidSeasonality(format!(
                    "Seasonality '{}' needs a Fourier order of at least 1",
                    s.name
                )));
            }
        }

        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        for (label, scale) in [
            ("changepoint_prior_scale", self.changepoint_prior_scale),
            ("seasonality_prior_scale", self.seasonality_prior_scale),
        ] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ForecastError::InvalidParameter(format!(
                    "{} must be positive, got {}",
                    label, scale
                )));
            }
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        if self.uncertainty_samples == 0 {
            return Err(ForecastError::InvalidParameter(
                "uncertainty_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fourier seasonality actually used by a fitted model
#[derive(Debug, Clone, PartialEq)]
struct Seasonality {
    name: String,
    period: f64,
    order: usize,
}

impl Seasonality {
    fn new(name: &str, period: f64, order: usize) -> Self {
        Self {
            name: name.to_string(),
            period,
            order,
        }
    }
}

/// A fitted Prophet-style model
#[derive(Debug, Clone)]
pub struct ProphetModel {
    params: ProphetParams,
    seasonalities: Vec<Seasonality>,
    changepoints: Vec<f64>,
    start_day: f64,
    span_days: f64,
    y_scale: f64,
    coefficients: Vec<f64>,
    noise_sd: f64,
    dates: Vec<NaiveDate>,
    history: Vec<f64>,
    fitted: Vec<f64>,
}

/// Fit the Prophet-style model; `series` must be fully defined
pub fn fit_prophet(series: &Series, params: &ProphetParams) -> Result<ProphetModel> {
    params.validate()?;

    let n = series.len();
    if n < 2 {
        return Err(ForecastError::insufficient("Prophet", 2, n));
    }

    let dates = series.dates();
    let history = series.defined_values();
    let days: Vec<f64> = dates.iter().map(|d| days_since_epoch(*d)).collect();
    let start_day = days[0];
    let span_days = days[n - 1] - start_day;
    let t: Vec<f64> = days.iter().map(|d| (d - start_day) / span_days).collect();

    let y_scale = history.iter().fold(0.0_f64, |m, y| m.max(y.abs()));
    let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
    let y = Array1::from_iter(history.iter().map(|v| v / y_scale));

    let changepoints = place_changepoints(&t, params);
    let seasonalities = choose_seasonalities(&days, span_days, params);

    let mut model = ProphetModel {
        params: params.clone(),
        seasonalities,
        changepoints,
        start_day,
        span_days,
        y_scale,
        coefficients: Vec::new(),
        noise_sd: 0.0,
        dates,
        history: history.clone(),
        fitted: Vec::new(),
    };

    let x = model.design(&t, &days);
    let prior_sds = model.prior_scales();

    // Noise level for the first pass comes from a plain linear trend
    let linear = least_squares(x.slice(ndarray::s![.., 0..2]), y.view())?;
    let mut noise_var = (linear.sse / n as f64).max(MIN_NOISE_VARIANCE);

    let mut fit = None;
    for pass in 0..2 {
        let penalties = Array1::from_iter(prior_sds.iter().map(|sd| noise_var / (sd * sd)));
        let current = ridge(x.view(), y.view(), penalties.view())?;
        noise_var = (current.sse / n as f64).max(MIN_NOISE_VARIANCE);
        debug!(pass, noise_var, "Prophet penalized fit");
        fit = Some(current);
    }
    let fit = fit.ok_or_else(|| ForecastError::NonConvergence("Prophet fit".to_string()))?;

    model.coefficients = fit.coefficients.to_vec();
    model.noise_sd = (fit.sse / n as f64).sqrt();
    model.fitted = x
        .dot(&fit.coefficients)
        .iter()
        .map(|v| v * y_scale)
        .collect();

    info!(
        changepoints = model.changepoints.len(),
        seasonalities = ?model.seasonalities.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        noise_sd = model.noise_sd * y_scale,
        "Fitted Prophet model"
    );
    Ok(model)
}

/// Evenly spaced changepoints within the first `changepoint_range` of the
/// history, never at the first observation
fn place_changepoints(t: &[f64], params: &ProphetParams) -> Vec<f64> {
    let hist_size = (t.len() as f64 * params.changepoint_range).floor() as usize;
    let count = params.n_changepoints.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    let mut changepoints: Vec<f64> = (1..=count)
        .map(|i| {
            let idx = (last * i as f64 / count as f64).round() as usize;
            t[idx]
        })
        .collect();
    changepoints.dedup();
    changepoints
}

fn choose_seasonalities(days: &[f64], span_days: f64, params: &ProphetParams) -> Vec<Seasonality> {
    let min_spacing = days
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);

    let mut out = Vec::new();
    if params.yearly.unwrap_or(span_days >= 730.0) {
        out.push(Seasonality::new("yearly", 365.25, 10));
    }
    if params.weekly.unwrap_or(span_days >= 14.0 && min_spacing < 7.0) {
        out.push(Seasonality::new("weekly", 7.0, 3));
    }
    for s in &params.seasonalities {
        out.push(Seasonality::new(&s.name, s.period_days, s.fourier_order));
    }
    out
}

impl ProphetModel {
    pub fn name(&self) -> &str {
        "Prophet"
    }

    pub fn training_end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Names of the seasonal components in use
    pub fn seasonality_names(&self) -> Vec<&str> {
        self.seasonalities.iter().map(|s| s.name.as_str()).collect()
    }

    /// Changepoint locations in scaled time
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    /// Columns: growth, offset, one hinge per changepoint, then sin/cos
    /// pairs per seasonality and harmonic
    fn design(&self, t: &[f64], days: &[f64]) -> Array2<f64> {
        let n_seasonal: usize = self.seasonalities.iter().map(|s| 2 * s.order).sum();
        let cols = 2 + self.changepoints.len() + n_seasonal;

        let mut x = Array2::<f64>::zeros((t.len(), cols));
        for (row, (&ti, &day)) in t.iter().zip(days).enumerate() {
            x[[row, 0]] = ti;
            x[[row, 1]] = 1.0;
            for (j, &c) in self.changepoints.iter().enumerate() {
                x[[row, 2 + j]] = (ti - c).max(0.0);
            }

            let mut col = 2 + self.changepoints.len();
            for s in &self.seasonalities {
                for k in 1..=s.order {
                    let angle = 2.0 * PI * k as f64 * day / s.period;
                    x[[row, col]] = angle.sin();
                    x[[row, col + 1]] = angle.cos();
                    col += 2;
                }
            }
        }
        x
    }

    fn prior_scales(&self) -> Vec<f64> {
        let n_seasonal: usize = self.seasonalities.iter().map(|s| 2 * s.order).sum();
        let mut scales = vec![TREND_PRIOR_SCALE, TREND_PRIOR_SCALE];
        scales.extend(std::iter::repeat(self.params.changepoint_prior_scale).take(self.changepoints.len()));
        scales.extend(std::iter::repeat(self.params.seasonality_prior_scale).take(n_seasonal));
        scales
    }

    fn scaled_time(&self, date: NaiveDate) -> (f64, f64) {
        let day = days_since_epoch(date);
        ((day - self.start_day) / self.span_days, day)
    }

    pub fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let dates = business_days_after(self.training_end(), horizon)?;
        let (t, days): (Vec<f64>, Vec<f64>) =
            dates.iter().map(|d| self.scaled_time(*d)).unzip();

        let x = self.design(&t, &days);
        let beta = Array1::from_vec(self.coefficients.clone());
        let points: Vec<f64> = x.dot(&beta).to_vec();

        let (lower, upper) = self.simulate_intervals(&t, &points)?;

        let forecast_points = dates
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                let point = points[i] * self.y_scale;
                ForecastPoint {
                    date,
                    point,
                    lower: (lower[i] * self.y_scale).min(point),
                    upper: (upper[i] * self.y_scale).max(point),
                }
            })
            .collect();

        Ok(ForecastResult {
            model: self.name().to_string(),
            interval_level: self.params.interval_width,
            points: forecast_points,
        })
    }

    /// Quantile bands (scaled units) from simulated future trends and noise
    fn simulate_intervals(&self, t: &[f64], points: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
        let horizon = t.len();
        let samples = self.params.uncertainty_samples;
        let mut rng = StdRng::seed_from_u64(self.params.seed);

        let n_cp = self.changepoints.len();
        let deltas = &self.coefficients[2..2 + n_cp];
        let delta_scale = deltas.iter().map(|d| d.abs()).sum::<f64>() / n_cp.max(1) as f64 + 1e-8;
        let t_end = t.iter().copied().fold(1.0_f64, f64::max);
        // Changepoints per unit of scaled time, as observed in the history
        let expected_changes = n_cp as f64 * (t_end - 1.0);

        let noise = Normal::new(0.0, self.noise_sd)
            .map_err(|e| ForecastError::InvalidParameter(format!("noise distribution: {}", e)))?;
        let magnitude = Exp::new(1.0 / delta_scale)
            .map_err(|e| ForecastError::InvalidParameter(format!("changepoint distribution: {}", e)))?;
        let arrivals = if expected_changes > 0.0 {
            Some(Poisson::new(expected_changes).map_err(|e| {
                ForecastError::InvalidParameter(format!("changepoint rate: {}", e))
            })?)
        } else {
            None
        };

        let mut draws: Vec<Vec<f64>> = vec![Vec::with_capacity(samples); horizon];
        for _ in 0..samples {
            let count = arrivals
                .as_ref()
                .map(|p| p.sample(&mut rng) as usize)
                .unwrap_or(0);
            let changes: Vec<(f64, f64)> = (0..count)
                .map(|_| {
                    let at = rng.gen_range(1.0..t_end);
                    let size = magnitude.sample(&mut rng);
                    let delta = if rng.gen_bool(0.5) { size } else { -size };
                    (at, delta)
                })
                .collect();

            for (i, &ti) in t.iter().enumerate() {
                let trend_shift: f64 = changes
                    .iter()
                    .map(|(at, delta)| delta * (ti - at).max(0.0))
                    .sum();
                draws[i].push(points[i] + trend_shift + noise.sample(&mut rng));
            }
        }

        let lower_q = (1.0 - self.params.interval_width) / 2.0;
        let upper_q = 1.0 - lower_q;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for column in draws.iter_mut() {
            column.sort_by(|a, b| a.total_cmp(b));
            lower.push(quantile(column, lower_q));
            upper.push(quantile(column, upper_q));
        }
        Ok((lower, upper))
    }

    pub fn fitted_values(&self) -> Result<Series> {
        let observations = self
            .dates
            .iter()
            .zip(&self.fitted)
            .map(|(&date, &v)| Observation::new(date, v))
            .collect();
        Series::new("Prophet fitted", observations)
    }

    pub fn summary(&self) -> ModelSummary {
        let mut names = vec!["k".to_string(), "m".to_string()];
        names.extend((1..=self.changepoints.len()).map(|i| format!("delta.{}", i)));
        for s in &self.seasonalities {
            for k in 1..=s.order {
                names.push(format!("{}.sin{}", s.name, k));
                names.push(format!("{}.cos{}", s.name, k));
            }
        }
        let coefficients = names
            .into_iter()
            .zip(self.coefficients.iter().copied())
            .collect::<Vec<_>>();

        let sse: f64 = self
            .history
            .iter()
            .zip(&self.fitted)
            .map(|(y, f)| (y - f).powi(2))
            .sum();
        let n_params = coefficients.len() + 1;

        ModelSummary::gaussian(
            self.name().to_string(),
            self.history.len(),
            coefficients,
            sse,
            n_params,
        )
    }
}

/// Quantile of sorted data by linear interpolation
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
