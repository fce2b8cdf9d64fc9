//! Lag polynomials for Box-Jenkins models
//!
//! A lag polynomial is stored as its full coefficient vector in powers of
//! the backshift operator `B`, constant term first: `[1, c1, c2, ...]`
//! stands for `1 + c1 B + c2 B^2 + ...`.

use crate::{MathError, Result};

/// Product of two lag polynomials
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }

    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// AR polynomial `1 - phi_1 B^step - phi_2 B^(2 step) - ...`
pub fn ar_polynomial(phi: &[f64], step: usize) -> Vec<f64> {
    lag_polynomial(phi, step, -1.0)
}

/// MA polynomial `1 + theta_1 B^step + theta_2 B^(2 step) + ...`
pub fn ma_polynomial(theta: &[f64], step: usize) -> Vec<f64> {
    lag_polynomial(theta, step, 1.0)
}

fn lag_polynomial(coefs: &[f64], step: usize, sign: f64) -> Vec<f64> {
    let step = step.max(1);
    let mut out = vec![0.0; coefs.len() * step + 1];
    out[0] = 1.0;
    for (k, &c) in coefs.iter().enumerate() {
        out[(k + 1) * step] = sign * c;
    }
    out
}

/// Differencing operator `(1 - B)^d (1 - B^s)^D`
pub fn differencing_polynomial(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = multiply(&poly, &seasonal);
        }
    }
    poly
}

/// Apply a lag polynomial to a series: `w_t = sum_j c_j y_(t-j)`
///
/// The output starts at `t = degree`, so it is `degree` values shorter.
pub fn apply(poly: &[f64], values: &[f64]) -> Vec<f64> {
    let degree = poly.len().saturating_sub(1);
    if values.len() <= degree {
        return Vec::new();
    }

    (degree..values.len())
        .map(|t| {
            poly.iter()
                .enumerate()
                .map(|(j, c)| c * values[t - j])
                .sum()
        })
        .collect()
}

/// Undo [`apply`] for values beyond the end of `history`
///
/// Given the polynomial, the original series and future values of the
/// filtered series, returns the future values of the original series.
pub fn integrate(poly: &[f64], history: &[f64], filtered_future: &[f64]) -> Result<Vec<f64>> {
    let lead = poly.first().copied().unwrap_or(0.0);
    if lead.abs() < f64::EPSILON {
        return Err(MathError::InvalidInput(
            "Lag polynomial must have a non-zero constant term".to_string(),
        ));
    }
    let degree = poly.len() - 1;
    if history.len() < degree {
        return Err(MathError::InsufficientData(format!(
            "Integration needs {} values of history, have {}",
            degree,
            history.len()
        )));
    }

    let mut extended = history.to_vec();
    let mut out = Vec::with_capacity(filtered_future.len());
    for &w in filtered_future {
        let t = extended.len();
        let carried: f64 = (1..=degree).map(|j| poly[j] * extended[t - j]).sum();
        let y = (w - carried) / lead;
        extended.push(y);
        out.push(y);
    }
    Ok(out)
}

/// MA(infinity) weights `psi_0..psi_(n-1)` of `ma(B) / ar(B)`
///
/// Both arguments are full lag polynomials; `ar` may include differencing.
pub fn psi_weights(ar: &[f64], ma: &[f64], n: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(n);
    for j in 0..n {
        let mut value = ma.get(j).copied().unwrap_or(0.0);
        for k in 1..=j.min(ar.len().saturating_sub(1)) {
            value -= ar[k] * psi[j - k];
        }
        psi.push(value);
    }
    psi
}

/// Map unconstrained values onto coefficients of a stationary AR polynomial
///
/// Each value becomes a partial autocorrelation in (-1, 1) via
/// `u / sqrt(1 + u^2)`; the Durbin-Levinson recursion then turns the
/// partial autocorrelations into AR coefficients.
pub fn constrain_stationary(unconstrained: &[f64]) -> Vec<f64> {
    let partials: Vec<f64> = unconstrained
        .iter()
        .map(|u| u / (1.0 + u * u).sqrt())
        .collect();

    let mut phi: Vec<f64> = Vec::with_capacity(partials.len());
    for (k, &r) in partials.iter().enumerate() {
        let previous = phi.clone();
        for i in 0..k {
            phi[i] = previous[i] - r * previous[k - 1 - i];
        }
        phi.push(r);
    }
    phi
}

/// Inverse of [`constrain_stationary`]
///
/// Fails when the coefficients do not describe a stationary polynomial.
pub fn unconstrain_stationary(phi: &[f64]) -> Result<Vec<f64>> {
    let p = phi.len();
    let mut current = phi.to_vec();
    let mut partials = vec![0.0; p];

    for k in (0..p).rev() {
        let r = current[k];
        if !r.is_finite() || r.abs() >= 1.0 {
            return Err(MathError::InvalidInput(format!(
                "Coefficients are not stationary (partial autocorrelation {:.4} at lag {})",
                r,
                k + 1
            )));
        }
        partials[k] = r;

        let denom = 1.0 - r * r;
        let previous = current.clone();
        for i in 0..k {
            current[i] = (previous[i] + r * previous[k - 1 - i]) / denom;
        }
        current.truncate(k);
    }

    Ok(partials
        .iter()
        .map(|r| r / (1.0 - r * r).sqrt())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_multiply() {
        // (1 - B)(1 + B) = 1 - B^2
        assert_eq!(multiply(&[1.0, -1.0], &[1.0, 1.0]), vec![1.0, 0.0, -1.0]);
        assert!(multiply(&[], &[1.0]).is_empty());
    }

    #[test]
    fn test_seasonal_polynomials() {
        assert_eq!(ar_polynomial(&[0.5], 4), vec![1.0, 0.0, 0.0, 0.0, -0.5]);
        assert_eq!(ma_polynomial(&[0.3, 0.2], 1), vec![1.0, 0.3, 0.2]);
    }

    #[test]
    fn test_differencing_polynomial() {
        assert_eq!(differencing_polynomial(0, 0, 0), vec![1.0]);
        assert_eq!(differencing_polynomial(2, 0, 0), vec![1.0, -2.0, 1.0]);

        // (1 - B)(1 - B^3) = 1 - B - B^3 + B^4
        assert_eq!(
            differencing_polynomial(1, 1, 3),
            vec![1.0, -1.0, 0.0, -1.0, 1.0]
        );
    }

    #[test]
    fn test_apply_then_integrate() {
        let y = [1.0, 4.0, 9.0, 16.0, 25.0, 36.0];
        let poly = differencing_polynomial(2, 0, 0);
        let w = apply(&poly, &y);
        assert_eq!(w, vec![2.0, 2.0, 2.0, 2.0]);

        let future = integrate(&poly, &y, &[2.0, 2.0]).unwrap();
        assert_abs_diff_eq!(future[0], 49.0);
        assert_abs_diff_eq!(future[1], 64.0);
    }

    #[test]
    fn test_psi_weights_ar1() {
        let psi = psi_weights(&ar_polynomial(&[0.5], 1), &[1.0], 4);
        assert_abs_diff_eq!(psi[0], 1.0);
        assert_abs_diff_eq!(psi[1], 0.5);
        assert_abs_diff_eq!(psi[3], 0.125);
    }

    #[test]
    fn test_psi_weights_random_walk() {
        let psi = psi_weights(&differencing_polynomial(1, 0, 0), &[1.0], 5);
        for w in psi {
            assert_abs_diff_eq!(w, 1.0);
        }
    }

    #[test]
    fn test_constrain_round_trip() {
        let u = [0.8, -1.3, 0.2];
        let phi = constrain_stationary(&u);
        let back = unconstrain_stationary(&phi).unwrap();
        for (a, b) in u.iter().zip(back.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_constrained_ar1_inside_unit_interval() {
        for u in [-50.0, -1.0, 0.0, 1.0, 50.0] {
            let phi = constrain_stationary(&[u]);
            assert!(phi[0].abs() < 1.0);
        }
    }

    #[test]
    fn test_unconstrain_rejects_unit_root() {
        assert!(unconstrain_stationary(&[1.0]).is_err());
        assert!(unconstrain_stationary(&[1.2, -0.1]).is_err());
    }
}
