//! Derivative-free minimization
//!
//! A plain Nelder-Mead simplex search. Used for conditional sum of squares
//! estimation, where the objective is cheap but has no convenient gradient.

use crate::{MathError, Result};

/// Tuning knobs for [`nelder_mead`]
#[derive(Debug, Clone, Copy)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations; `None` means `500 * (dim + 1)`
    pub max_iter: Option<usize>,
    /// Convergence tolerance on the spread of objective values in the simplex
    pub f_tolerance: f64,
    /// Convergence tolerance on the simplex diameter
    pub x_tolerance: f64,
    /// Initial step along each axis when building the starting simplex
    pub initial_step: f64,
    /// Reflection coefficient
    pub alpha: f64,
    /// Expansion coefficient
    pub gamma: f64,
    /// Contraction coefficient
    pub rho: f64,
    /// Shrink coefficient
    pub sigma: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: None,
            f_tolerance: 1e-10,
            x_tolerance: 1e-8,
            initial_step: 0.1,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
        }
    }
}

/// Outcome of a minimization
#[derive(Debug, Clone)]
pub struct Minimum {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub fx: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the tolerances were met before the iteration budget ran out
    pub converged: bool,
}

/// Minimize `f` starting from `start`
///
/// Non-finite objective values are treated as `+inf` so the simplex moves
/// away from them. An error is returned only when the objective is not
/// finite at every vertex of the starting simplex.
pub fn nelder_mead<F>(f: F, start: &[f64], config: NelderMeadConfig) -> Result<Minimum>
where
    F: Fn(&[f64]) -> f64,
{
    let dim = start.len();
    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    if dim == 0 {
        let fx = eval(start);
        return Ok(Minimum {
            x: Vec::new(),
            fx,
            iterations: 0,
            converged: fx.is_finite(),
        });
    }

    let max_iter = config.max_iter.unwrap_or(500 * (dim + 1));

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(start.to_vec());
    for i in 0..dim {
        let mut vertex = start.to_vec();
        let step = if vertex[i].abs() > 1e-8 {
            config.initial_step * vertex[i].abs().max(1.0)
        } else {
            config.initial_step
        };
        vertex[i] += step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    if values.iter().all(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Objective is not finite anywhere on the starting simplex".to_string(),
        ));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iter {
        // Order vertices best to worst
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let f_spread = (values[dim] - values[0]).abs();
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        if values[0].is_finite() && f_spread <= config.f_tolerance && x_spread <= config.x_tolerance
        {
            converged = true;
            break;
        }

        iterations += 1;

        let centroid: Vec<f64> = (0..dim)
            .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
            .collect();
        let worst = simplex[dim].clone();
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = along(config.alpha);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = along(config.alpha * config.gamma);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[dim] = expanded;
                values[dim] = f_expanded;
            } else {
                simplex[dim] = reflected;
                values[dim] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < values[dim] {
            let c = along(config.alpha * config.rho);
            let fc = eval(&c);
            (c, fc)
        } else {
            let c = along(-config.rho);
            let fc = eval(&c);
            (c, fc)
        };

        if f_contracted < values[dim].min(f_reflected) {
            simplex[dim] = contracted;
            values[dim] = f_contracted;
            continue;
        }

        // Shrink towards the best vertex
        let best = simplex[0].clone();
        for i in 1..=dim {
            for j in 0..dim {
                simplex[i][j] = best[j] + config.sigma * (simplex[i][j] - best[j]);
            }
            values[i] = eval(&simplex[i]);
        }
    }

    let (best_idx, _) = values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| MathError::CalculationError("Empty simplex".to_string()))?;

    Ok(Minimum {
        x: simplex[best_idx].clone(),
        fx: values[best_idx],
        iterations,
        converged,
    })
}
