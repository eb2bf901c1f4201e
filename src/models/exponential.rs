//! Exponential growth model `density(t) = a·exp(k·t) + c`.
//!
//! Parameters are packed as `[a, k]` when the offset is fixed at zero and as
//! `[a, k, c]` when it is free. The fitter relies on two primitive operations:
//! - predict `density(t)` for a parameter vector
//! - fill a Jacobian row `∂density/∂θ` at `t` (for Levenberg–Marquardt)

use crate::domain::ExpOffset;

/// Number of free parameters for an offset mode.
pub fn param_len(offset: ExpOffset) -> usize {
    match offset {
        ExpOffset::Zero => 2,
        ExpOffset::Free => 3,
    }
}

/// Predict `density(t)`.
pub fn predict(params: &[f64], t: f64) -> f64 {
    let offset = params.get(2).copied().unwrap_or(0.0);
    params[0] * (params[1] * t).exp() + offset
}

/// Fill `out` with the partial derivatives of `predict` at `t`.
///
/// # Panics
/// Panics if `out` is shorter than `params`.
pub fn fill_jacobian_row(params: &[f64], t: f64, out: &mut [f64]) {
    let e = (params[1] * t).exp();
    out[0] = e;
    out[1] = params[0] * t * e;
    if params.len() > 2 {
        out[2] = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jacobian_matches_finite_differences() {
        let params = [1.5, 0.3, 0.2];
        let t = 2.0;
        let mut row = [0.0; 3];
        fill_jacobian_row(&params, t, &mut row);

        let h = 1e-6;
        for j in 0..3 {
            let mut up = params;
            let mut down = params;
            up[j] += h;
            down[j] -= h;
            let numeric = (predict(&up, t) - predict(&down, t)) / (2.0 * h);
            assert!((numeric - row[j]).abs() < 1e-6, "param {j}: {numeric} vs {}", row[j]);
        }
    }

    #[test]
    fn zero_offset_model_has_two_params() {
        assert_eq!(param_len(ExpOffset::Zero), 2);
        assert!((predict(&[3.0, 0.0], 10.0) - 3.0).abs() < 1e-12);
    }
}
