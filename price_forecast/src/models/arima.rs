//! ARIMA models for time series forecasting
//!
//! Shared Box-Jenkins estimator for ARIMA and seasonal ARIMA:
//!
//! 1. Difference with `(1 - B)^d (1 - B^s)^D`.
//! 2. Optionally subtract the mean of the differenced series (the constant,
//!    which acts as a drift on the original scale).
//! 3. Estimate the multiplicative AR/MA polynomials by conditional sum of
//!    squares. Nelder-Mead searches an unconstrained space that maps onto
//!    stationary AR and invertible MA polynomials through partial
//!    autocorrelations; Hannan-Rissanen regression supplies the start.
//! 4. Forecast recursively, integrate back, and size intervals from the
//!    psi weights of the integrated model.

use crate::data::{Observation, Series};
use crate::error::{ForecastError, Result};
use crate::models::sarima::SeasonalOrder;
use crate::models::{validate_confidence, ForecastPoint, ForecastResult, ModelSummary, Trend};
use crate::utils::business_days_after;
use chrono::NaiveDate;
use forecast_math::linalg::least_squares;
use forecast_math::optimize::{nelder_mead, NelderMeadConfig};
use forecast_math::polynomial::{
    self, ar_polynomial, constrain_stationary, differencing_polynomial, ma_polynomial,
    unconstrain_stationary,
};
use forecast_math::stats;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Bound on each unconstrained parameter; keeps partial autocorrelations
/// inside roughly (-0.995, 0.995)
const PARAM_BOUND: f64 = 10.0;

/// Non-seasonal order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

impl FromStr for ArimaOrder {
    type Err = ForecastError;

    /// Parse `p,d,q`
    fn from_str(s: &str) -> Result<Self> {
        let parts = parse_usize_list(s, 3)?;
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

pub(crate) fn parse_usize_list(s: &str, expected: usize) -> Result<Vec<usize>> {
    let parts: Vec<usize> = s
        .trim_matches(|c| c == '(' || c == ')')
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| ForecastError::InvalidParameter(format!("Bad order '{}': {}", s, e)))?;

    if parts.len() != expected {
        return Err(ForecastError::InvalidParameter(format!(
            "Expected {} comma-separated integers, got '{}'",
            expected, s
        )));
    }
    Ok(parts)
}

/// Minimum training length for an order
pub fn minimum_observations(order: ArimaOrder, seasonal: Option<SeasonalOrder>) -> usize {
    let s = seasonal.unwrap_or_default();
    let ar_span = order.p + s.p * s.period;
    let ma_span = order.q + s.q * s.period;
    let base = order.d + s.d * s.period + ar_span.max(ma_span) + 2;

    match seasonal {
        Some(s) => base.max(2 * s.period),
        None => base,
    }
}

/// Coefficients unpacked from the optimizer's parameter vector
#[derive(Debug, Clone)]
struct Coefficients {
    ar: Vec<f64>,
    seasonal_ar: Vec<f64>,
    ma: Vec<f64>,
    seasonal_ma: Vec<f64>,
}

impl Coefficients {
    /// Layout: `[ar (p), seasonal ar (P), ma (q), seasonal ma (Q)]`
    fn from_unconstrained(u: &[f64], order: ArimaOrder, seasonal: SeasonalOrder) -> Self {
        let clamped: Vec<f64> = u
            .iter()
            .map(|v| v.clamp(-PARAM_BOUND, PARAM_BOUND))
            .collect();
        let (ar_u, rest) = clamped.split_at(order.p);
        let (sar_u, rest) = rest.split_at(seasonal.p);
        let (ma_u, sma_u) = rest.split_at(order.q);

        let negate = |v: Vec<f64>| v.into_iter().map(|x| -x).collect::<Vec<f64>>();
        Self {
            ar: constrain_stationary(ar_u),
            seasonal_ar: constrain_stationary(sar_u),
            ma: negate(constrain_stationary(ma_u)),
            seasonal_ma: negate(constrain_stationary(sma_u)),
        }
    }

    fn polynomials(&self, period: usize) -> (Vec<f64>, Vec<f64>) {
        let ar = polynomial::multiply(
            &ar_polynomial(&self.ar, 1),
            &ar_polynomial(&self.seasonal_ar, period),
        );
        let ma = polynomial::multiply(
            &ma_polynomial(&self.ma, 1),
            &ma_polynomial(&self.seasonal_ma, period),
        );
        (ar, ma)
    }
}

/// Conditional sum of squares residuals
///
/// Residuals before the AR span are taken as zero and excluded from the sum.
fn css(z: &[f64], ar_poly: &[f64], ma_poly: &[f64]) -> (f64, Vec<f64>) {
    let start = ar_poly.len() - 1;
    let mut residuals = vec![0.0; z.len()];
    let mut sse = 0.0;

    for t in start..z.len() {
        let mut e = 0.0;
        for (k, c) in ar_poly.iter().enumerate() {
            e += c * z[t - k];
        }
        for (k, c) in ma_poly.iter().enumerate().skip(1).take(t) {
            e -= c * residuals[t - k];
        }
        residuals[t] = e;
        sse += e * e;
    }

    (sse, residuals)
}

/// Hannan-Rissanen start values in the unconstrained space
///
/// Any failure falls back to zeros (white noise).
fn initial_parameters(z: &[f64], order: ArimaOrder, seasonal: SeasonalOrder) -> Vec<f64> {
    let dim = order.p + order.q + seasonal.p + seasonal.q;
    match hannan_rissanen(z, order, seasonal) {
        Ok(u) => u,
        Err(e) => {
            debug!(error = %e, "Hannan-Rissanen start failed, starting from zero");
            vec![0.0; dim]
        }
    }
}

fn hannan_rissanen(z: &[f64], order: ArimaOrder, seasonal: SeasonalOrder) -> Result<Vec<f64>> {
    let s = seasonal.period.max(1);
    let ar_lags: Vec<usize> = (1..=order.p)
        .chain((1..=seasonal.p).map(|j| j * s))
        .collect();
    let ma_lags: Vec<usize> = (1..=order.q)
        .chain((1..=seasonal.q).map(|j| j * s))
        .collect();
    let max_lag = ar_lags.iter().chain(&ma_lags).copied().max().unwrap_or(0);
    let n = z.len();

    // Innovations from a long autoregression
    let (innovations, long_order) = if ma_lags.is_empty() {
        (vec![0.0; n], 0)
    } else {
        let m = (2 * max_lag).max(4).min(n / 3);
        if m == 0 {
            return Err(ForecastError::insufficient("Hannan-Rissanen", 3, n));
        }
        let (phi, _) = stats::yule_walker(z, m)?;
        let mut e = vec![0.0; n];
        for t in m..n {
            e[t] = z[t] - phi.iter().enumerate().map(|(i, a)| a * z[t - 1 - i]).sum::<f64>();
        }
        (e, m)
    };

    let start = long_order + max_lag;
    let cols = ar_lags.len() + ma_lags.len();
    if cols == 0 {
        return Ok(Vec::new());
    }
    if n <= start + cols + 1 {
        return Err(ForecastError::insufficient(
            "Hannan-Rissanen",
            start + cols + 2,
            n,
        ));
    }

    let rows = n - start;
    let mut x = Array2::<f64>::zeros((rows, cols));
    let mut y = Array1::<f64>::zeros(rows);
    for (row, t) in (start..n).enumerate() {
        y[row] = z[t];
        for (c, lag) in ar_lags.iter().enumerate() {
            x[[row, c]] = z[t - lag];
        }
        for (c, lag) in ma_lags.iter().enumerate() {
            x[[row, ar_lags.len() + c]] = innovations[t - lag];
        }
    }

    let fit = least_squares(x.view(), y.view())?;
    let b = fit.coefficients.to_vec();

    let (ar, rest) = b.split_at(order.p);
    let (sar, rest) = rest.split_at(seasonal.p);
    let (ma, sma) = rest.split_at(order.q);

    let to_unconstrained = |coefs: &[f64], negate: bool| -> Vec<f64> {
        let target: Vec<f64> = coefs
            .iter()
            .map(|c| if negate { -c } else { *c })
            .collect();
        unconstrain_stationary(&target)
            .map(|u| {
                u.into_iter()
                    .map(|v| v.clamp(-PARAM_BOUND, PARAM_BOUND))
                    .collect()
            })
            .unwrap_or_else(|_| vec![0.0; coefs.len()])
    };

    let mut u = to_unconstrained(ar, false);
    u.extend(to_unconstrained(sar, false));
    u.extend(to_unconstrained(ma, true));
    u.extend(to_unconstrained(sma, true));
    Ok(u)
}

/// A fitted ARIMA or seasonal ARIMA model
#[derive(Debug, Clone)]
pub struct BoxJenkinsModel {
    name: String,
    order: ArimaOrder,
    seasonal: Option<SeasonalOrder>,
    confidence: f64,
    constant: Option<f64>,
    coefficients: Coefficients,
    ar_poly: Vec<f64>,
    ma_poly: Vec<f64>,
    diff_poly: Vec<f64>,
    dates: Vec<NaiveDate>,
    history: Vec<f64>,
    centered: Vec<f64>,
    residuals: Vec<f64>,
    sse: f64,
    effective_nobs: usize,
    sigma2: f64,
    iterations: usize,
}

/// Fit a non-seasonal ARIMA model
pub fn fit_arima(
    series: &Series,
    order: ArimaOrder,
    trend: Trend,
    confidence: f64,
) -> Result<BoxJenkinsModel> {
    estimate(series, order, None, trend, confidence)
}

/// Shared estimator; `series` must be fully defined
pub(crate) fn estimate(
    series: &Series,
    order: ArimaOrder,
    seasonal: Option<SeasonalOrder>,
    trend: Trend,
    confidence: f64,
) -> Result<BoxJenkinsModel> {
    validate_confidence(confidence)?;

    let name = match seasonal {
        Some(s) => format!("SARIMA{}{}", order, s),
        None => format!("ARIMA{}", order),
    };

    let history = series.defined_values();
    let required = minimum_observations(order, seasonal);
    if history.len() < required {
        return Err(ForecastError::insufficient(name, required, history.len()));
    }

    let s = seasonal.unwrap_or_default();
    let diff_poly = differencing_polynomial(order.d, s.d, s.period);
    let differenced = polynomial::apply(&diff_poly, &history);

    let constant = if trend.includes_constant(order.d + s.d) {
        Some(stats::mean(&differenced)?)
    } else {
        None
    };
    let mu = constant.unwrap_or(0.0);
    let centered: Vec<f64> = differenced.iter().map(|w| w - mu).collect();

    let start = initial_parameters(&centered, order, s);
    let objective = |u: &[f64]| {
        let (ar, ma) = Coefficients::from_unconstrained(u, order, s).polynomials(s.period);
        css(&centered, &ar, &ma).0
    };

    let scale = objective(&start).abs().max(1.0);
    let config = NelderMeadConfig {
        f_tolerance: 1e-8 * scale,
        x_tolerance: 1e-4,
        ..Default::default()
    };
    let minimum = nelder_mead(objective, &start, config)
        .map_err(|e| ForecastError::NonConvergence(format!("{}: {}", name, e)))?;

    if !minimum.fx.is_finite() {
        return Err(ForecastError::NonConvergence(format!(
            "{}: conditional sum of squares is not finite",
            name
        )));
    }
    if !minimum.converged {
        return Err(ForecastError::NonConvergence(format!(
            "{}: no convergence after {} iterations",
            name, minimum.iterations
        )));
    }

    let coefficients = Coefficients::from_unconstrained(&minimum.x, order, s);
    let (ar_poly, ma_poly) = coefficients.polynomials(s.period);
    let (sse, residuals) = css(&centered, &ar_poly, &ma_poly);
    let effective_nobs = centered.len() - (ar_poly.len() - 1);
    let sigma2 = sse / effective_nobs.max(1) as f64;

    info!(
        model = %name,
        iterations = minimum.iterations,
        sigma2,
        "Estimated Box-Jenkins model"
    );
    debug!(model = %name, ?coefficients, constant = ?constant, "Coefficients");

    Ok(BoxJenkinsModel {
        name,
        order,
        seasonal,
        confidence,
        constant,
        coefficients,
        ar_poly,
        ma_poly,
        diff_poly,
        dates: series.dates(),
        history,
        centered,
        residuals,
        sse,
        effective_nobs,
        sigma2,
        iterations: minimum.iterations,
    })
}

impl BoxJenkinsModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn seasonal_order(&self) -> Option<SeasonalOrder> {
        self.seasonal
    }

    /// Constant of the differenced series, if the model has one
    pub fn constant(&self) -> Option<f64> {
        self.constant
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.coefficients.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.coefficients.ma
    }

    pub fn seasonal_ar_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ar
    }

    pub fn seasonal_ma_coefficients(&self) -> &[f64] {
        &self.coefficients.seasonal_ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn training_end(&self) -> NaiveDate {
        // Construction requires a non-empty history
        self.dates[self.dates.len() - 1]
    }

    pub fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let dates = business_days_after(self.training_end(), horizon)?;

        let n = self.centered.len();
        let mut z = self.centered.clone();
        let mut e = self.residuals.clone();
        for _ in 0..horizon {
            let t = z.len();
            let mut next = 0.0;
            for k in 1..self.ar_poly.len().min(t + 1) {
                next -= self.ar_poly[k] * z[t - k];
            }
            for k in 1..self.ma_poly.len().min(t + 1) {
                next += self.ma_poly[k] * e[t - k];
            }
            z.push(next);
            e.push(0.0);
        }

        let mu = self.constant.unwrap_or(0.0);
        let future_differenced: Vec<f64> = z[n..].iter().map(|v| v + mu).collect();
        let points = polynomial::integrate(&self.diff_poly, &self.history, &future_differenced)?;

        let integrated_ar = polynomial::multiply(&self.ar_poly, &self.diff_poly);
        let psi = polynomial::psi_weights(&integrated_ar, &self.ma_poly, horizon);
        let z_score = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?
            .inverse_cdf(0.5 + self.confidence / 2.0);

        let mut cumulative = 0.0;
        let forecast_points = dates
            .into_iter()
            .zip(points)
            .zip(psi)
            .map(|((date, point), w)| {
                cumulative += w * w;
                let half_width = z_score * (self.sigma2 * cumulative).sqrt();
                ForecastPoint {
                    date,
                    point,
                    lower: point - half_width,
                    upper: point + half_width,
                }
            })
            .collect();

        Ok(ForecastResult {
            model: self.name.clone(),
            interval_level: self.confidence,
            points: forecast_points,
        })
    }

    /// One-step-ahead in-sample predictions; undefined where the
    /// differencing and AR spans leave no prediction
    pub fn fitted_values(&self) -> Result<Series> {
        let offset = (self.diff_poly.len() - 1) + (self.ar_poly.len() - 1);
        let diff_degree = self.diff_poly.len() - 1;

        let observations = self
            .dates
            .iter()
            .zip(&self.history)
            .enumerate()
            .map(|(t, (&date, &y))| {
                let value = if t >= offset {
                    Some(y - self.residuals[t - diff_degree])
                } else {
                    None
                };
                Observation { date, value }
            })
            .collect();

        Series::new(format!("{} fitted", self.name), observations)
    }

    pub fn summary(&self) -> ModelSummary {
        let s = self.seasonal.unwrap_or_default();
        let mut coefficients = Vec::new();
        if let Some(c) = self.constant {
            coefficients.push(("const".to_string(), c));
        }
        for (i, c) in self.coefficients.ar.iter().enumerate() {
            coefficients.push((format!("ar.L{}", i + 1), *c));
        }
        for (i, c) in self.coefficients.ma.iter().enumerate() {
            coefficients.push((format!("ma.L{}", i + 1), *c));
        }
        for (i, c) in self.coefficients.seasonal_ar.iter().enumerate() {
            coefficients.push((format!("ar.S.L{}", (i + 1) * s.period), *c));
        }
        for (i, c) in self.coefficients.seasonal_ma.iter().enumerate() {
            coefficients.push((format!("ma.S.L{}", (i + 1) * s.period), *c));
        }

        // Estimated coefficients plus the innovation variance
        let n_params = coefficients.len() + 1;
        ModelSummary::gaussian(
            self.name.clone(),
            self.effective_nobs,
            coefficients,
            self.sse,
            n_params,
        )
    }
}
