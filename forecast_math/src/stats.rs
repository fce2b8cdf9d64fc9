//! Descriptive statistics and autocorrelation estimates
//!
//! Contains:
//! - Mean / variance / standard deviation over any float type
//! - Sample autocovariance and autocorrelation (ACF)
//! - Partial autocorrelation (PACF) and Yule-Walker AR fits via Levinson-Durbin

use crate::{MathError, Result};
use num_traits::Float;

/// Arithmetic mean of a slice
pub fn mean<T: Float>(values: &[T]) -> Result<T> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot compute the mean of an empty slice".to_string(),
        ));
    }

    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);
    let n = T::from(values.len()).ok_or_else(|| {
        MathError::CalculationError("Length is not representable".to_string())
    })?;
    Ok(sum / n)
}

/// Population variance (divides by `n`)
pub fn variance<T: Float>(values: &[T]) -> Result<T> {
    let m = mean(values)?;
    let n = T::from(values.len()).ok_or_else(|| {
        MathError::CalculationError("Length is not representable".to_string())
    })?;
    let ss = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - m) * (v - m));
    Ok(ss / n)
}

/// Population standard deviation
pub fn std_dev<T: Float>(values: &[T]) -> Result<T> {
    Ok(variance(values)?.sqrt())
}

/// Sample autocovariances for lags `0..=max_lag`
///
/// Uses the biased estimator (divides by `n`), which keeps the implied
/// Toeplitz matrix positive semi-definite.
pub fn autocovariance(values: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let n = values.len();
    if n <= max_lag {
        return Err(MathError::InsufficientData(format!(
            "Autocovariance up to lag {} needs more than {} values, have {}",
            max_lag, max_lag, n
        )));
    }

    let m = mean(values)?;
    let centered: Vec<f64> = values.iter().map(|v| v - m).collect();

    let acov = (0..=max_lag)
        .map(|lag| {
            centered
                .iter()
                .zip(centered.iter().skip(lag))
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect();

    Ok(acov)
}

/// Sample autocorrelation function for lags `0..=max_lag`
pub fn acf(values: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let acov = autocovariance(values, max_lag)?;
    let c0 = acov[0];
    if c0.abs() < f64::EPSILON {
        return Err(MathError::CalculationError(
            "Series has zero variance; autocorrelation is undefined".to_string(),
        ));
    }

    Ok(acov.iter().map(|c| c / c0).collect())
}

/// Output of the Levinson-Durbin recursion
#[derive(Debug, Clone)]
pub struct LevinsonDurbin {
    /// AR coefficients of the highest order fitted (`phi_1..phi_p`)
    pub coefficients: Vec<f64>,
    /// Partial autocorrelations for lags `1..=p`
    pub pacf: Vec<f64>,
    /// Innovation variance of the order-p fit
    pub sigma2: f64,
}

/// Solve the Yule-Walker equations for orders `1..=order`
///
/// `acov` must hold autocovariances for lags `0..=order`.
pub fn levinson_durbin(acov: &[f64], order: usize) -> Result<LevinsonDurbin> {
    if acov.len() <= order {
        return Err(MathError::InvalidInput(format!(
            "Need autocovariances up to lag {}, got {}",
            order,
            acov.len().saturating_sub(1)
        )));
    }
    if acov[0] <= 0.0 {
        return Err(MathError::CalculationError(
            "Lag-zero autocovariance must be positive".to_string(),
        ));
    }

    let mut phi: Vec<f64> = Vec::with_capacity(order);
    let mut pacf = Vec::with_capacity(order);
    let mut sigma2 = acov[0];

    for k in 1..=order {
        let mut num = acov[k];
        for (j, &p) in phi.iter().enumerate() {
            num -= p * acov[k - j - 1];
        }

        let reflection = if sigma2.abs() < 1e-300 { 0.0 } else { num / sigma2 };

        let previous = phi.clone();
        for j in 0..phi.len() {
            phi[j] = previous[j] - reflection * previous[k - 2 - j];
        }
        phi.push(reflection);

        pacf.push(reflection);
        sigma2 *= 1.0 - reflection * reflection;
    }

    Ok(LevinsonDurbin {
        coefficients: phi,
        pacf,
        sigma2,
    })
}

/// Sample partial autocorrelation function for lags `0..=max_lag`
///
/// Lag 0 is reported as 1.0 to line up with [`acf`].
pub fn pacf(values: &[f64], max_lag: usize) -> Result<Vec<f64>> {
    let acov = autocovariance(values, max_lag)?;
    let fit = levinson_durbin(&acov, max_lag)?;

    let mut out = Vec::with_capacity(max_lag + 1);
    out.push(1.0);
    out.extend(fit.pacf);
    Ok(out)
}

/// Yule-Walker AR(p) fit; returns `(coefficients, innovation variance)`
pub fn yule_walker(values: &[f64], order: usize) -> Result<(Vec<f64>, f64)> {
    let acov = autocovariance(values, order)?;
    let fit = levinson_durbin(&acov, order)?;
    Ok((fit.coefficients, fit.sigma2))
}

/// Approximate two-sided confidence bound for sample autocorrelations of white noise
pub fn white_noise_bound(n: usize, z: f64) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    z / (n as f64).sqrt()
}
