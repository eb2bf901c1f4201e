//! Least squares solver.
//!
//! Both growth strategies reduce to small linear least-squares problems:
//!
//! ```text
//! minimize ‖y - X β‖²
//! ```
//!
//! - the linear strategy solves it once with `X = [1, t]`
//! - the exponential strategy solves one damped normal-equation step per
//!   Levenberg–Marquardt iteration
//!
//! Implementation choices:
//! - We use SVD to solve the least-squares problem robustly even when the
//!   design matrix is tall (more rows than columns).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Because the parameter dimension is tiny (2–3 columns), SVD cost is
//!   negligible next to reading the export.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Fit `y = intercept + slope·t`; returns `(intercept, slope)`.
///
/// Returns `None` for fewer than two points or when `t` has no spread.
pub fn fit_line(t: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = t.len().min(y.len());
    if n < 2 {
        return None;
    }
    let t0 = t[0];
    if t[..n].iter().all(|&v| v == t0) {
        return None;
    }

    let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { t[i] });
    let y = DVector::from_row_slice(&y[..n]);
    let beta = solve_least_squares(&x, &y)?;
    Some((beta[0], beta[1]))
}
