//! Dense least squares on `ndarray` matrices
//!
//! Fits are solved with `nalgebra`'s singular value decomposition of the
//! design itself, so the normal equations are never formed. Ridge
//! penalties are applied by augmenting the design with `sqrt(penalty_j)`
//! rows and zero responses.

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Result of a (possibly penalized) least squares fit
#[derive(Debug, Clone)]
pub struct LeastSquaresFit {
    /// Estimated coefficients, one per design column
    pub coefficients: Array1<f64>,
    /// Residuals `y - X b`
    pub residuals: Array1<f64>,
    /// Residual sum of squares
    pub sse: f64,
    /// Residual variance `sse / (n - k)` (falls back to `sse / n` when `n <= k`)
    pub sigma2: f64,
    /// Standard errors of the coefficients (unpenalized fits only)
    pub standard_errors: Option<Array1<f64>>,
}

/// Ordinary least squares `min ||y - X b||^2`
pub fn least_squares(x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<LeastSquaresFit> {
    solve(x, y, None)
}

/// Ridge regression `min ||y - X b||^2 + sum_j penalty_j b_j^2`
///
/// `penalties` holds one non-negative weight per column; zero leaves the
/// column unpenalized.
pub fn ridge(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    penalties: ArrayView1<f64>,
) -> Result<LeastSquaresFit> {
    if penalties.len() != x.ncols() {
        return Err(MathError::InvalidInput(format!(
            "Expected {} penalties, got {}",
            x.ncols(),
            penalties.len()
        )));
    }
    if penalties.iter().any(|p| *p < 0.0 || !p.is_finite()) {
        return Err(MathError::InvalidInput(
            "Ridge penalties must be finite and non-negative".to_string(),
        ));
    }

    solve(x, y, Some(penalties))
}

fn solve(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    penalties: Option<ArrayView1<f64>>,
) -> Result<LeastSquaresFit> {
    let (n, k) = x.dim();
    if y.len() != n {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but response has {} values",
            n,
            y.len()
        )));
    }
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }
    if n == 0 {
        return Err(MathError::InsufficientData(
            "Least squares needs at least one observation".to_string(),
        ));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Least squares inputs must be finite".to_string(),
        ));
    }

    let rows = if penalties.is_some() { n + k } else { n };
    let mut design = DMatrix::<f64>::zeros(rows, k);
    let mut response = DVector::<f64>::zeros(rows);
    for i in 0..n {
        for j in 0..k {
            design[(i, j)] = x[[i, j]];
        }
        response[i] = y[i];
    }
    if let Some(p) = penalties {
        for j in 0..k {
            design[(n + j, j)] = p[j].sqrt();
        }
    }

    let svd = design.svd(true, true);
    let singular = &svd.singular_values;
    if singular.len() < k {
        return Err(MathError::Singular(format!(
            "{} equations for {} unknowns",
            rows, k
        )));
    }
    let max_sv = singular.max();
    let min_sv = singular.min();
    let tolerance = f64::EPSILON * rows.max(k) as f64 * max_sv;
    if !(min_sv > tolerance) {
        return Err(MathError::Singular(format!(
            "rank deficient design (smallest singular value {:.3e}, largest {:.3e})",
            min_sv, max_sv
        )));
    }

    let beta = svd
        .solve(&response, tolerance)
        .map_err(|e| MathError::CalculationError(e.to_string()))?;
    let coefficients = Array1::from_iter(beta.iter().copied());

    let fitted = x.dot(&coefficients);
    let residuals = &y - &fitted;
    let sse = residuals.iter().map(|r| r * r).sum::<f64>();
    let dof = if n > k { n - k } else { n };
    let sigma2 = sse / dof as f64;

    // (X'X)^-1 = V diag(1 / s^2) V'
    let standard_errors = match penalties {
        Some(_) => None,
        None => {
            let v_t = svd.v_t.as_ref().ok_or_else(|| {
                MathError::CalculationError("SVD did not return V".to_string())
            })?;
            let se = (0..k)
                .map(|j| {
                    let var = (0..k)
                        .map(|i| (v_t[(i, j)] / singular[i]).powi(2))
                        .sum::<f64>();
                    (var * sigma2).sqrt()
                })
                .collect::<Array1<f64>>();
            Some(se)
        }
    };

    Ok(LeastSquaresFit {
        coefficients,
        residuals,
        sse,
        sigma2,
        standard_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_least_squares_exact_line() {
        // y = 1 + 2x
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];

        let fit = least_squares(x.view(), y.view()).unwrap();
        assert_abs_diff_eq!(fit.coefficients[0], 1.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.coefficients[1], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(fit.sse, 0.0, epsilon = 1e-12);
        assert!(fit.standard_errors.is_some());
    }

    #[test]
    fn test_standard_errors_match_closed_form() {
        // Simple regression: se(slope) = sqrt(sigma2 / sum (x - mean)^2)
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0], [1.0, 4.0]];
        let y = array![1.1, 2.9, 5.2, 6.8, 9.1];

        let fit = least_squares(x.view(), y.view()).unwrap();
        let se = fit.standard_errors.unwrap();
        let sxx = 10.0;
        assert_abs_diff_eq!(se[1], (fit.sigma2 / sxx).sqrt(), epsilon = 1e-10);
        // se(intercept) = sqrt(sigma2 * (1/n + mean^2 / sxx))
        assert_abs_diff_eq!(
            se[0],
            (fit.sigma2 * (1.0 / 5.0 + 4.0 / sxx)).sqrt(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_ill_conditioned_polynomial_design() {
        // Columns 1, t, t^2, t^3 on t up to 200
        let n = 200;
        let mut x = ndarray::Array2::<f64>::zeros((n, 4));
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let t = i as f64;
            for p in 0..4 {
                x[[i, p]] = t.powi(p as i32);
            }
            y[i] = 2.0 - 0.5 * t + 0.01 * t * t + 1e-5 * t * t * t;
        }

        let fit = least_squares(x.view(), y.view()).unwrap();
        assert!(fit.residuals.iter().all(|r| r.abs() < 1e-6));
        assert_abs_diff_eq!(fit.coefficients[0], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(fit.coefficients[1], -0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_collinear_design_is_singular() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let y = array![1.0, 2.0, 3.0];
        assert!(matches!(
            least_squares(x.view(), y.view()),
            Err(MathError::Singular(_))
        ));
    }

    #[test]
    fn test_underdetermined_is_singular() {
        let x = array![[1.0, 0.0, 2.0]];
        let y = array![1.0];
        assert!(matches!(
            least_squares(x.view(), y.view()),
            Err(MathError::Singular(_))
        ));
    }

    #[test]
    fn test_ridge_shrinks_penalized_column() {
        let x = array![[1.0, 0.0], [1.0, 1.0], [1.0, 2.0], [1.0, 3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];

        let free = least_squares(x.view(), y.view()).unwrap();
        let shrunk = ridge(x.view(), y.view(), array![0.0, 100.0].view()).unwrap();

        assert!(shrunk.coefficients[1].abs() < free.coefficients[1].abs());
        assert!(shrunk.standard_errors.is_none());
    }

    #[test]
    fn test_ridge_matches_closed_form() {
        // One column, no intercept: b = x'y / (x'x + lambda)
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![2.0, 4.0, 7.0];
        let fit = ridge(x.view(), y.view(), array![4.0].view()).unwrap();
        assert_abs_diff_eq!(fit.coefficients[0], 31.0 / 18.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ridge_makes_collinear_design_solvable() {
        let x = array![[1.0, 2.0], [2.0, 4.0], [3.0, 6.0]];
        let y = array![1.0, 2.0, 3.0];
        assert!(ridge(x.view(), y.view(), array![1.0, 1.0].view()).is_ok());
    }

    #[test]
    fn test_dimension_mismatch() {
        let x = array![[1.0], [1.0]];
        let y = array![1.0, 2.0, 3.0];
        assert!(matches!(
            least_squares(x.view(), y.view()),
            Err(MathError::InvalidInput(_))
        ));
    }
}
