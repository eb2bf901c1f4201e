//! Goodness-of-fit statistics.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Pearson correlation of `x` and `y`.
///
/// Returns `NaN` when either series has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    let (Some(mx), Some(my)) = (mean(&x[..n]), mean(&y[..n])) else {
        return f64::NAN;
    };

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// A constant observed series scores 1.0 when reproduced exactly and 0.0
/// otherwise.
pub fn r_squared(observed: &[f64], fitted: &[f64]) -> f64 {
    let n = observed.len().min(fitted.len());
    let Some(m) = mean(&observed[..n]) else {
        return f64::NAN;
    };

    let ss_res: f64 = (0..n).map(|i| (observed[i] - fitted[i]).powi(2)).sum();
    let ss_tot: f64 = observed[..n].iter().map(|v| (v - m).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pearson_sign_follows_trend() {
        let t = [0.0, 1.0, 2.0, 3.0];
        assert!((pearson(&t, &[1.0, 3.0, 5.0, 7.0]) - 1.0).abs() < 1e-12);
        assert!((pearson(&t, &[7.0, 5.0, 3.0, 1.0]) + 1.0).abs() < 1e-12);
        assert!(pearson(&t, &[2.0, 2.0, 2.0, 2.0]).is_nan());
    }

    #[test]
    fn r_squared_of_mean_prediction_is_zero() {
        let y = [1.0, 2.0, 3.0];
        assert!((r_squared(&y, &[2.0, 2.0, 2.0])).abs() < 1e-12);
        assert_eq!(r_squared(&y, &y), 1.0);
        assert_eq!(r_squared(&[4.0, 4.0], &[4.0, 4.0]), 1.0);
    }
}
