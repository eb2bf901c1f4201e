//! Exponential growth strategy: Levenberg–Marquardt fit of `a·exp(k·t) + c`.
//!
//! Given elapsed hours `t_i` and densities `y_i` we minimize
//! `Σ (y_i - a·exp(k·t_i) - c)²` with `c` either fixed at zero or free.
//!
//! - the initial guess comes from a log-linear regression of the positive
//!   readings (`ln y = ln a + k·t`), which is exact for noise-free growth
//! - each iteration solves the damped normal equations
//!   `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀr` through the SVD solver
//! - the run converges when an accepted step stops improving the SSE, the
//!   step itself becomes negligible, or the gradient vanishes
//!
//! Running out of iterations is reported as an error; the caller decides
//! whether that aborts the run.

use nalgebra::{DMatrix, DVector};

use crate::domain::{ExpOffset, ExponentialFit};
use crate::math::{fit_line, r_squared, solve_least_squares};
use crate::models::{fill_jacobian_row, param_len, predict};

/// Relative SSE improvement below which an accepted step counts as converged.
const F_TOL: f64 = 1e-10;
/// Relative step size below which the solver counts as converged.
const X_TOL: f64 = 1e-10;
/// Gradient infinity-norm below which the solver counts as converged.
const G_TOL: f64 = 1e-14;

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e20;

#[derive(Debug, Clone, Copy)]
pub struct ExponentialOptions {
    pub offset: ExpOffset,
    pub max_iterations: usize,
}

/// Fit output: summary statistics plus the fitted density at each input time.
#[derive(Debug, Clone)]
pub struct ExponentialSolution {
    pub fit: ExponentialFit,
    pub fitted: Vec<f64>,
}

/// Fit one cycle.
///
/// The error string describes why the cycle cannot be fitted.
pub fn fit_exponential(t: &[f64], y: &[f64], opts: &ExponentialOptions) -> Result<ExponentialSolution, String> {
    let p = param_len(opts.offset);
    let n = t.len().min(y.len());
    if n < p {
        return Err(format!("exponential fit needs at least {p} points, got {n}"));
    }
    let t = &t[..n];
    let y = &y[..n];

    let mut params = initial_guess(t, y, opts.offset);
    let mut sse = sum_squared_residuals(&params, t, y);
    if !sse.is_finite() {
        return Err("initial guess produced a non-finite residual".to_string());
    }

    let mut lambda = LAMBDA_INIT;
    let mut iterations = 0usize;
    let mut converged = sse == 0.0;

    let mut jac = DMatrix::<f64>::zeros(n, p);
    let mut resid = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];

    while !converged && iterations < opts.max_iterations {
        iterations += 1;

        for i in 0..n {
            fill_jacobian_row(&params, t[i], &mut row);
            for j in 0..p {
                jac[(i, j)] = row[j];
            }
            resid[i] = y[i] - predict(&params, t[i]);
        }

        let jtj = jac.transpose() * &jac;
        let grad = jac.transpose() * &resid;
        if grad.amax() <= G_TOL {
            converged = true;
            break;
        }

        let mut damped = jtj.clone();
        for j in 0..p {
            damped[(j, j)] += lambda * jtj[(j, j)].max(1e-12);
        }

        let Some(delta) = solve_least_squares(&damped, &grad) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
            continue;
        };

        let candidate: Vec<f64> = params.iter().zip(delta.iter()).map(|(a, d)| a + d).collect();
        let candidate_sse = sum_squared_residuals(&candidate, t, y);

        if candidate_sse.is_finite() && candidate_sse <= sse {
            let improvement = (sse - candidate_sse) / sse.max(f64::MIN_POSITIVE);
            let step = delta.norm() / (norm(&params) + X_TOL);
            params = candidate;
            sse = candidate_sse;
            lambda = (lambda / 10.0).max(1e-12);
            converged = sse == 0.0 || improvement < F_TOL || step < X_TOL;
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                // No step in any direction improves the SSE: we are at the
                // minimum to machine precision.
                converged = true;
            }
        }
    }

    if !converged {
        return Err(format!(
            "exponential fit did not converge within {} iterations",
            opts.max_iterations
        ));
    }
    if params.iter().any(|v| !v.is_finite()) {
        return Err("exponential fit produced non-finite parameters".to_string());
    }

    let fitted: Vec<f64> = t.iter().map(|&ti| predict(&params, ti)).collect();
    let rate = params[1];

    Ok(ExponentialSolution {
        fit: ExponentialFit {
            amplitude: params[0],
            rate_per_hour: rate,
            offset: params.get(2).copied().unwrap_or(0.0),
            r_squared: r_squared(y, &fitted),
            doubling_time_minutes: doubling_time_minutes(rate),
            iterations,
        },
        fitted,
    })
}

/// `ln 2 / k` converted to minutes and rounded to the nearest integer.
pub fn doubling_time_minutes(rate_per_hour: f64) -> Option<i64> {
    if rate_per_hour == 0.0 || !rate_per_hour.is_finite() {
        return None;
    }
    Some((std::f64::consts::LN_2 / rate_per_hour * 60.0).round() as i64)
}

fn initial_guess(t: &[f64], y: &[f64], offset: ExpOffset) -> Vec<f64> {
    let (pt, ln_y): (Vec<f64>, Vec<f64>) = t
        .iter()
        .zip(y.iter())
        .filter(|(_, v)| **v > 0.0)
        .map(|(&ti, &v)| (ti, v.ln()))
        .unzip();

    let (a, k) = match fit_line(&pt, &ln_y) {
        Some((ln_a, k)) if ln_a.is_finite() && k.is_finite() => (ln_a.exp(), k),
        _ => {
            let mean = y.iter().sum::<f64>() / y.len() as f64;
            (if mean != 0.0 { mean } else { 1.0 }, 0.0)
        }
    };

    match offset {
        ExpOffset::Zero => vec![a, k],
        ExpOffset::Free => vec![a, k, 0.0],
    }
}

fn sum_squared_residuals(params: &[f64], t: &[f64], y: &[f64]) -> f64 {
    t.iter()
        .zip(y.iter())
        .map(|(&ti, &yi)| (yi - predict(params, ti)).powi(2))
        .sum()
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(offset: ExpOffset) -> ExponentialOptions {
        ExponentialOptions {
            offset,
            max_iterations: 10_000,
        }
    }

    #[test]
    fn recovers_noise_free_growth() {
        let t: Vec<f64> = (0..50).map(|i| i as f64 * 0.5).collect();
        let y: Vec<f64> = t.iter().map(|&t| 3.0 * (0.1 * t).exp()).collect();

        let sol = fit_exponential(&t, &y, &opts(ExpOffset::Zero)).unwrap();
        assert!((sol.fit.rate_per_hour - 0.1).abs() < 1e-8);
        assert!((sol.fit.amplitude - 3.0).abs() < 1e-7);
        assert!((sol.fit.r_squared - 1.0).abs() < 1e-10);
        assert_eq!(sol.fit.doubling_time_minutes, Some(416));
        assert_eq!(sol.fitted.len(), t.len());
    }

    #[test]
    fn free_offset_recovers_baseline() {
        let t: Vec<f64> = (0..60).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = t.iter().map(|&t| 0.5 * (0.2 * t).exp() + 0.3).collect();

        let sol = fit_exponential(&t, &y, &opts(ExpOffset::Free)).unwrap();
        assert!((sol.fit.rate_per_hour - 0.2).abs() < 1e-5, "k = {}", sol.fit.rate_per_hour);
        assert!((sol.fit.offset - 0.3).abs() < 1e-4, "c = {}", sol.fit.offset);
        assert!(sol.fit.r_squared > 0.999_999);
    }

    #[test]
    fn noisy_growth_converges() {
        // Deterministic wobble instead of random noise.
        let t: Vec<f64> = (0..40).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &t)| 0.05 * (0.6 * t).exp() * (1.0 + 0.02 * ((i * 7 % 5) as f64 - 2.0)))
            .collect();

        let sol = fit_exponential(&t, &y, &opts(ExpOffset::Zero)).unwrap();
        assert!((sol.fit.rate_per_hour - 0.6).abs() < 0.02);
        assert!(sol.fit.r_squared > 0.99);
    }

    #[test]
    fn iteration_budget_exhaustion_is_an_error() {
        let t: Vec<f64> = (0..40).map(|i| i as f64 * 0.25).collect();
        let y: Vec<f64> = t
            .iter()
            .enumerate()
            .map(|(i, &t)| 0.05 * (0.6 * t).exp() + 0.01 * ((i % 3) as f64))
            .collect();

        let tight = ExponentialOptions {
            offset: ExpOffset::Free,
            max_iterations: 1,
        };
        let err = fit_exponential(&t, &y, &tight).unwrap_err();
        assert!(err.contains("did not converge within 1 iterations"));
    }

    #[test]
    fn too_few_points_is_an_error() {
        let err = fit_exponential(&[0.0, 1.0], &[1.0, 2.0], &opts(ExpOffset::Free)).unwrap_err();
        assert!(err.contains("at least 3 points"));
    }

    #[test]
    fn doubling_time_edge_cases() {
        assert_eq!(doubling_time_minutes(0.1), Some(416));
        assert_eq!(doubling_time_minutes(0.0), None);
        assert_eq!(doubling_time_minutes(f64::NAN), None);
        assert_eq!(doubling_time_minutes(-0.1), Some(-416));
    }
}
