//! Per-cycle growth estimation.
//!
//! Both strategies share one input (the prepared rows of each cycle) and one
//! output (an ordered list of `CycleOutcome`s). The `FitPolicy` decides whether
//! a cycle that cannot be fitted fails the run or is recorded and skipped.

use log::{debug, warn};

use crate::domain::{Cycle, CycleFit, FitPolicy, FittedPoint, GrowthEstimate, GrowthMode, RunConfig, SkippedCycle};
use crate::error::AppError;
use crate::fit::exponential::{ExponentialOptions, fit_exponential};
use crate::fit::linear::fit_linear;

/// What became of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Fitted(CycleFit),
    /// The estimator failed and `FitPolicy::Skip` was in effect.
    Skipped(SkippedCycle),
    /// No rows were left after the density threshold.
    Empty(i64),
}

/// Growth estimation output for a run.
#[derive(Debug, Clone, Default)]
pub struct EstimationOutput {
    /// One outcome per cycle, in cycle order.
    pub outcomes: Vec<CycleOutcome>,
    /// Fitted exponential curves (empty in linear mode).
    pub fitted_curve: Vec<FittedPoint>,
}

impl EstimationOutput {
    pub fn fits(&self) -> impl Iterator<Item = &CycleFit> {
        self.outcomes.iter().filter_map(|o| match o {
            CycleOutcome::Fitted(fit) => Some(fit),
            _ => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedCycle> {
        self.outcomes.iter().filter_map(|o| match o {
            CycleOutcome::Skipped(skip) => Some(skip),
            _ => None,
        })
    }

    pub fn empty_cycles(&self) -> impl Iterator<Item = i64> + '_ {
        self.outcomes.iter().filter_map(|o| match o {
            CycleOutcome::Empty(id) => Some(*id),
            _ => None,
        })
    }
}

/// Estimation settings lifted from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct EstimatorOptions {
    pub mode: GrowthMode,
    pub density_threshold: f64,
    pub policy: FitPolicy,
    pub exponential: ExponentialOptions,
}

impl From<&RunConfig> for EstimatorOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            mode: config.mode,
            density_threshold: config.density_threshold,
            policy: config.fit_policy,
            exponential: ExponentialOptions {
                offset: config.exp_offset,
                max_iterations: config.max_iterations,
            },
        }
    }
}

/// Estimate growth for every cycle, in order.
pub fn estimate_cycles(cycles: &[Cycle], opts: &EstimatorOptions) -> Result<EstimationOutput, AppError> {
    let mut out = EstimationOutput::default();

    for cycle in cycles {
        let (t, density): (Vec<f64>, Vec<f64>) = cycle
            .rows
            .iter()
            .filter(|r| r.density.is_finite() && r.density >= opts.density_threshold)
            .map(|r| (r.elapsed_hours, r.density))
            .unzip();

        if t.is_empty() {
            debug!("cycle {}: no rows at or above density {}", cycle.id, opts.density_threshold);
            out.outcomes.push(CycleOutcome::Empty(cycle.id));
            continue;
        }

        let result = match opts.mode {
            GrowthMode::Linear => fit_linear(&t, &density).map(|fit| (GrowthEstimate::Linear(fit), None)),
            GrowthMode::Exponential => fit_exponential(&t, &density, &opts.exponential)
                .map(|sol| (GrowthEstimate::Exponential(sol.fit), Some(sol.fitted))),
        };

        match result {
            Ok((estimate, fitted)) => {
                if let Some(fitted) = fitted {
                    out.fitted_curve.extend(t.iter().zip(fitted).map(|(&elapsed_hours, density)| FittedPoint {
                        cycle: cycle.id,
                        elapsed_hours,
                        density,
                    }));
                }
                let fit = CycleFit {
                    cycle: cycle.id,
                    points: t.len(),
                    estimate,
                };
                debug!("cycle {}: {:?}", cycle.id, fit.estimate);
                out.outcomes.push(CycleOutcome::Fitted(fit));
            }
            Err(reason) => match opts.policy {
                FitPolicy::Abort => {
                    return Err(AppError::fit(format!(
                        "Fit failed for cycle {}: {reason}. Use `--on-fit-error skip` to continue past failing cycles.",
                        cycle.id
                    )));
                }
                FitPolicy::Skip => {
                    warn!("skipping cycle {}: {reason}", cycle.id);
                    out.outcomes.push(CycleOutcome::Skipped(SkippedCycle {
                        cycle: cycle.id,
                        reason,
                    }));
                }
            },
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExpOffset, Measurement};

    fn cycle(id: i64, points: &[(f64, f64)]) -> Cycle {
        Cycle {
            id,
            rows: points
                .iter()
                .enumerate()
                .map(|(i, &(t, density))| Measurement {
                    line: i + 2,
                    timestamp: t * 3600.0,
                    density,
                    cycle: Some(id),
                    phase: 1.0,
                    dilution_events: 0.0,
                    elapsed_hours: t,
                })
                .collect(),
        }
    }

    fn opts(mode: GrowthMode, policy: FitPolicy, threshold: f64) -> EstimatorOptions {
        EstimatorOptions {
            mode,
            density_threshold: threshold,
            policy,
            exponential: ExponentialOptions {
                offset: ExpOffset::Zero,
                max_iterations: 10_000,
            },
        }
    }

    #[test]
    fn linear_mode_produces_one_fit_per_cycle() {
        let line: Vec<(f64, f64)> = (0..=10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let cycles = vec![cycle(1, &line), cycle(2, &line)];

        let out = estimate_cycles(&cycles, &opts(GrowthMode::Linear, FitPolicy::Abort, 0.0)).unwrap();
        let fits: Vec<&CycleFit> = out.fits().collect();

        assert_eq!(fits.len(), 2);
        assert_eq!(fits[1].cycle, 2);
        assert!((fits[0].value().unwrap() - 2.0).abs() < 1e-9);
        assert!((fits[0].quality() - 1.0).abs() < 1e-12);
        assert!(out.fitted_curve.is_empty());
    }

    #[test]
    fn threshold_can_empty_a_cycle_without_error() {
        let cycles = vec![cycle(1, &[(0.0, 0.001), (1.0, 0.002)]), cycle(2, &[(0.0, 0.1), (1.0, 0.2)])];

        let out = estimate_cycles(&cycles, &opts(GrowthMode::Linear, FitPolicy::Abort, 0.05)).unwrap();
        assert_eq!(out.outcomes[0], CycleOutcome::Empty(1));
        assert_eq!(out.fits().count(), 1);
    }

    #[test]
    fn abort_policy_names_the_cycle() {
        let cycles = vec![cycle(8, &[(0.0, 0.1)])];
        let err = estimate_cycles(&cycles, &opts(GrowthMode::Linear, FitPolicy::Abort, 0.0)).unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Fit);
        assert!(err.message().contains("cycle 8"));
    }

    #[test]
    fn skip_policy_records_and_continues() {
        let growth: Vec<(f64, f64)> = (0..20).map(|i| (i as f64 * 0.5, 3.0 * (0.05 * i as f64).exp())).collect();
        let cycles = vec![cycle(1, &[(0.0, 0.1)]), cycle(2, &growth)];

        let out = estimate_cycles(&cycles, &opts(GrowthMode::Exponential, FitPolicy::Skip, 0.0)).unwrap();

        let skipped: Vec<&SkippedCycle> = out.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].cycle, 1);
        assert_eq!(out.fits().count(), 1);
        assert_eq!(out.fitted_curve.len(), growth.len());
        assert!(out.fitted_curve.iter().all(|p| p.cycle == 2));
    }
}
