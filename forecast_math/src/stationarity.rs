//! Augmented Dickey-Fuller unit root test
//!
//! The test regression includes a constant:
//!
//! `dy_t = a + g * y_(t-1) + b_1 dy_(t-1) + ... + b_k dy_(t-k) + e_t`
//!
//! The number of augmenting lags `k` is chosen by AIC, all candidate lags
//! being fitted on the same sample. The statistic is the t-ratio of `g`.
//! P-values use MacKinnon's (1994) response surface, critical values the
//! MacKinnon (2010) finite-sample table.

use crate::linalg::least_squares;
use crate::{MathError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

/// Minimum number of observations accepted by [`adf_test`]
pub const MIN_OBSERVATIONS: usize = 10;

// MacKinnon (1994) coefficients for the constant-only regression, one series
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// Critical values of the ADF statistic at the usual levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

/// Result of an ADF test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-ratio of the lagged level coefficient
    pub statistic: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// Number of augmenting lags selected
    pub used_lag: usize,
    /// Observations used in the final regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

/// Run the ADF test
///
/// `max_lag` defaults to `ceil(12 * (n / 100)^(1/4))`, capped so that the
/// regression keeps enough degrees of freedom.
pub fn adf_test(values: &[f64], max_lag: Option<usize>) -> Result<AdfResult> {
    let n = values.len();
    if n < MIN_OBSERVATIONS {
        return Err(MathError::InsufficientData(format!(
            "ADF test needs at least {} observations, have {}",
            MIN_OBSERVATIONS, n
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "ADF test input contains non-finite values".to_string(),
        ));
    }

    let default_lag = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let cap = (n / 2).saturating_sub(2);
    let max_lag = max_lag.unwrap_or(default_lag).min(cap);

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    // Choose the lag on a common sample starting at `max_lag`
    let mut best_lag = 0;
    let mut best_aic = f64::INFINITY;
    for lag in 0..=max_lag {
        let (x, y) = design(values, &diffs, lag, max_lag);
        let fit = least_squares(x.view(), y.view())?;
        let nobs = y.len() as f64;
        let aic = nobs * (fit.sse / nobs).ln() + 2.0 * x.ncols() as f64;
        if aic < best_aic {
            best_aic = aic;
            best_lag = lag;
        }
    }

    // Refit with the chosen lag on the longest available sample
    let (x, y) = design(values, &diffs, best_lag, best_lag);
    let fit = least_squares(x.view(), y.view())?;
    let se = fit
        .standard_errors
        .as_ref()
        .map(|s| s[1])
        .ok_or_else(|| MathError::CalculationError("Missing standard errors".to_string()))?;
    if se <= 0.0 || !se.is_finite() {
        return Err(MathError::CalculationError(
            "Degenerate ADF regression (zero standard error)".to_string(),
        ));
    }

    let statistic = fit.coefficients[1] / se;
    let nobs = y.len();

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic)?,
        used_lag: best_lag,
        nobs,
        critical_values: mackinnon_critical_values(nobs),
    })
}

/// Design matrix `[1, y_(t-1), dy_(t-1) .. dy_(t-lag)]` and response `dy_t`
///
/// Rows start at difference index `start`, which must be at least `lag`.
fn design(levels: &[f64], diffs: &[f64], lag: usize, start: usize) -> (Array2<f64>, Array1<f64>) {
    let rows = diffs.len() - start;
    let cols = 2 + lag;

    let mut x = Array2::<f64>::zeros((rows, cols));
    let mut y = Array1::<f64>::zeros(rows);
    for (row, t) in (start..diffs.len()).enumerate() {
        y[row] = diffs[t];
        x[[row, 0]] = 1.0;
        x[[row, 1]] = levels[t];
        for i in 1..=lag {
            x[[row, 1 + i]] = diffs[t - i];
        }
    }
    (x, y)
}

/// MacKinnon (1994) approximate p-value for the constant-only ADF statistic
pub fn mackinnon_p_value(statistic: f64) -> Result<f64> {
    if statistic > TAU_MAX {
        return Ok(1.0);
    }
    if statistic < TAU_MIN {
        return Ok(0.0);
    }

    let coefs: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALLP
    } else {
        &TAU_LARGEP
    };
    let z = coefs
        .iter()
        .enumerate()
        .map(|(i, c)| c * statistic.powi(i as i32))
        .sum::<f64>();

    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MathError::CalculationError(format!("Normal distribution: {}", e)))?;
    Ok(normal.cdf(z))
}

/// MacKinnon (2010) critical values for a regression with a constant
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let n = nobs as f64;
    let surface = |b: [f64; 4]| b[0] + b[1] / n + b[2] / (n * n) + b[3] / (n * n * n);

    CriticalValues {
        one_percent: surface([-3.43035, -6.5393, -16.786, -79.433]),
        five_percent: surface([-2.86154, -2.8903, -4.234, -40.040]),
        ten_percent: surface([-2.56677, -1.5384, -2.809, 0.0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    fn white_noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = NormalDist::new(0.0, 1.0).unwrap();
        (0..n).map(|_| dist.sample(&mut rng)).collect()
    }

    #[test]
    fn test_white_noise_is_stationary() {
        let data = white_noise(500, 7);
        let result = adf_test(&data, None).unwrap();
        assert!(result.p_value < 0.01, "p = {}", result.p_value);
        assert!(result.statistic < result.critical_values.one_percent);
    }

    #[test]
    fn test_random_walk_with_drift_is_not_stationary() {
        let steps = white_noise(500, 11);
        let mut level = 100.0;
        let data: Vec<f64> = steps
            .iter()
            .map(|e| {
                level += 1.0 + e;
                level
            })
            .collect();

        let result = adf_test(&data, None).unwrap();
        assert!(result.p_value > 0.05, "p = {}", result.p_value);
    }

    #[test]
    fn test_too_short() {
        let data = [1.0, 2.0, 3.0];
        assert!(matches!(
            adf_test(&data, None),
            Err(MathError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_p_value_bounds() {
        assert_abs_diff_eq!(mackinnon_p_value(5.0).unwrap(), 1.0);
        assert_abs_diff_eq!(mackinnon_p_value(-25.0).unwrap(), 0.0);

        let low = mackinnon_p_value(-4.0).unwrap();
        let high = mackinnon_p_value(-1.0).unwrap();
        assert!(low < 0.01);
        assert!(high > 0.5);
    }

    #[test]
    fn test_p_value_matches_critical_values_asymptotically() {
        // The 5% asymptotic critical value should map to p close to 0.05
        let p = mackinnon_p_value(-2.86154).unwrap();
        assert_abs_diff_eq!(p, 0.05, epsilon = 0.01);
    }

    #[test]
    fn test_critical_values_ordering() {
        let cv = mackinnon_critical_values(250);
        assert!(cv.one_percent < cv.five_percent);
        assert!(cv.five_percent < cv.ten_percent);
        assert_abs_diff_eq!(cv.five_percent, -2.8731, epsilon = 1e-3);
    }

    #[test]
    fn test_explicit_max_lag_respected() {
        let data = white_noise(200, 3);
        let result = adf_test(&data, Some(2)).unwrap();
        assert!(result.used_lag <= 2);
    }
}
