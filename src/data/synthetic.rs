//! Synthetic instrument exports.
//!
//! Produces a table shaped like a real chemobot or turbidostat export: one row
//! per second, cycles made of an exponential growth phase followed by a
//! dilution phase, and an interleaved header line where the instrument was
//! "restarted". Used for demos and end-to-end tests; output is fully
//! determined by the seed.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::Instrument;
use crate::error::AppError;
use crate::io::ingest::{RawRecord, RawTable};

/// Density the culture is diluted back down to at the end of every cycle.
const DILUTED_DENSITY: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct SimulationSpec {
    pub instrument: Instrument,
    pub cycles: usize,
    /// Length of each growth phase.
    pub growth_minutes: u32,
    /// Length of each dilution phase.
    pub dilution_minutes: u32,
    /// Mean specific growth rate `k` (hr⁻¹).
    pub rate_per_hour: f64,
    /// Relative cycle-to-cycle spread of `k`.
    pub rate_jitter: f64,
    /// Relative measurement noise on each reading.
    pub noise: f64,
    /// Wall-clock start of the run (chemobot timestamps only).
    pub start: DateTime<Utc>,
    /// Insert an instrument header line after the first cycle.
    pub restart_line: bool,
    pub seed: u64,
}

impl Default for SimulationSpec {
    fn default() -> Self {
        Self {
            instrument: Instrument::Chemobot,
            cycles: 6,
            growth_minutes: 240,
            dilution_minutes: 10,
            rate_per_hour: 0.6,
            rate_jitter: 0.05,
            noise: 0.01,
            start: DateTime::from_timestamp(1_733_155_200, 0).unwrap_or_default(),
            restart_line: true,
            seed: 42,
        }
    }
}

/// Generate a synthetic export.
pub fn generate_export(spec: &SimulationSpec) -> Result<RawTable, AppError> {
    if spec.cycles == 0 {
        return Err(AppError::config("Cycle count must be > 0."));
    }
    if spec.growth_minutes == 0 || spec.dilution_minutes == 0 {
        return Err(AppError::config("Growth and dilution phases must last at least one minute."));
    }
    if !(spec.rate_per_hour.is_finite() && spec.rate_per_hour > 0.0) {
        return Err(AppError::config("Growth rate must be finite and > 0."));
    }
    if !(spec.noise >= 0.0 && spec.rate_jitter >= 0.0) {
        return Err(AppError::config("Noise and rate jitter must be >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| AppError::config(format!("Noise distribution error: {e}")))?;

    let columns = spec.instrument.default_columns();
    let mut headers = vec![columns.timestamp.clone(), columns.density.clone(), columns.cycle.clone()];
    headers.extend(columns.phase.clone());
    headers.extend(columns.dilution_counter.clone());

    let growth_secs = spec.growth_minutes as u64 * 60;
    let dilution_secs = spec.dilution_minutes as u64 * 60;
    let t0 = match spec.instrument {
        Instrument::Chemobot => spec.start.timestamp(),
        Instrument::Turbidostat => 0,
    };

    let mut records = Vec::new();
    let mut line = 2usize;
    let mut clock = 0u64;

    for cycle in 1..=spec.cycles {
        let rate = (spec.rate_per_hour * (1.0 + spec.rate_jitter * normal.sample(&mut rng))).max(1e-3);
        // Phase indicator: the chemobot logs the programmed growth duration, then a
        // different value while it dilutes.
        let growth_phase = (growth_secs + cycle as u64) as f64;
        let dilution_phase = 0.0;
        let peak = DILUTED_DENSITY * (rate * growth_secs as f64 / 3600.0).exp();

        for s in 0..growth_secs + dilution_secs {
            let (density, phase, dispensing) = if s < growth_secs {
                (DILUTED_DENSITY * (rate * s as f64 / 3600.0).exp(), growth_phase, false)
            } else {
                let u = (s - growth_secs + 1) as f64 / dilution_secs as f64;
                (peak + (DILUTED_DENSITY - peak) * u, dilution_phase, true)
            };
            let reading = density * (1.0 + spec.noise * normal.sample(&mut rng));

            let mut fields = vec![
                (t0 + clock as i64).to_string(),
                format!("{reading:.5}"),
                cycle.to_string(),
            ];
            if columns.phase.is_some() {
                fields.push(format!("{phase}"));
            }
            if columns.dilution_counter.is_some() {
                fields.push(if dispensing { "1" } else { "0" }.to_string());
            }
            records.push(RawRecord { line, fields });
            line += 1;
            clock += 1;
        }

        if cycle == 1 && spec.restart_line {
            records.push(RawRecord {
                line,
                fields: headers.clone(),
            });
            line += 1;
        }
    }

    Ok(RawTable { headers, records })
}
