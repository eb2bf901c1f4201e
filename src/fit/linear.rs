//! Linear growth-rate strategy: OLS slope of density vs elapsed hours.

use crate::domain::LinearFit;
use crate::math::{fit_line, pearson};

/// Fit `density = intercept + slope·t` over one cycle.
///
/// The error string describes why the cycle cannot be fitted.
pub fn fit_linear(t: &[f64], density: &[f64]) -> Result<LinearFit, String> {
    if t.len() < 2 {
        return Err(format!("linear fit needs at least 2 points, got {}", t.len()));
    }
    let (intercept, slope) =
        fit_line(t, density).ok_or_else(|| "linear fit is degenerate (no spread in elapsed time)".to_string())?;

    Ok(LinearFit {
        slope_per_hour: slope,
        intercept,
        correlation: pearson(t, density),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_noise_free_line() {
        let t: Vec<f64> = (0..=100).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = t.iter().map(|&t| 2.0 * t + 1.0).collect();

        let fit = fit_linear(&t, &y).unwrap();
        assert!((fit.slope_per_hour - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
        assert!((fit.correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_point_is_an_error() {
        let err = fit_linear(&[0.0], &[1.0]).unwrap_err();
        assert!(err.contains("at least 2 points"));
    }
}
