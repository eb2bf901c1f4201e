//! Positional downsampling for plotting.
//!
//! Instruments record roughly one sample per second, far more than a scatter
//! plot can show. The stride is positional (every `S`-th row), not a time
//! bucket, so an instrument running off 1 Hz shifts the effective spacing
//! proportionally.

use crate::domain::Measurement;
use crate::error::AppError;

/// Stride for a minutes-per-sample interval at one sample per second.
pub fn stride_for_minutes(minutes: u32) -> Result<usize, AppError> {
    if minutes == 0 {
        return Err(AppError::config("Downsample interval must be a positive number of minutes."));
    }
    Ok(minutes as usize * 60)
}

/// Keep rows at positions `0, stride, 2·stride, …`.
///
/// The result has `ceil(len / stride)` rows.
pub fn downsample(rows: &[Measurement], stride: usize) -> Vec<Measurement> {
    rows.iter().step_by(stride.max(1)).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<Measurement> {
        (0..n)
            .map(|i| Measurement {
                line: i,
                timestamp: i as f64,
                density: 0.1,
                cycle: Some(1),
                phase: 0.0,
                dilution_events: 0.0,
                elapsed_hours: i as f64 / 3600.0,
            })
            .collect()
    }

    #[test]
    fn keeps_every_stride_th_position() {
        let input = rows(1000);
        let kept = downsample(&input, 300);
        let positions: Vec<usize> = kept.iter().map(|r| r.line).collect();
        assert_eq!(positions, [0, 300, 600, 900]);
    }

    #[test]
    fn row_count_is_ceiling_of_len_over_stride() {
        for (n, stride) in [(0, 60), (1, 60), (60, 60), (61, 60), (599, 300), (600, 300), (7, 1)] {
            let kept = downsample(&rows(n), stride);
            assert_eq!(kept.len(), n.div_ceil(stride), "n={n} stride={stride}");
        }
    }

    #[test]
    fn stride_is_minutes_times_sixty() {
        assert_eq!(stride_for_minutes(5).unwrap(), 300);
        assert!(stride_for_minutes(0).is_err());
    }
}
