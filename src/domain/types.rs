//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during segmentation and fitting
//! - exported to JSON/CSV
//! - reloaded later as run configuration

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which instrument produced the export.
///
/// The instrument only selects default column names and how timestamps are
/// interpreted; the pipeline itself is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    /// Chemobot `.txt` export: absolute unix timestamps plus a growth-phase indicator.
    Chemobot,
    /// Turbidostat `.csv` export: program-relative seconds plus a media dispense counter.
    Turbidostat,
}

impl Instrument {
    pub fn display_name(self) -> &'static str {
        match self {
            Instrument::Chemobot => "chemobot",
            Instrument::Turbidostat => "turbidostat",
        }
    }

    /// Column names written by the instrument's firmware.
    pub fn default_columns(self) -> ColumnMap {
        match self {
            Instrument::Chemobot => ColumnMap {
                timestamp: "unixTime".to_string(),
                density: "OD940".to_string(),
                cycle: "totalCycleCount".to_string(),
                phase: Some("growthDurationChange".to_string()),
                dilution_counter: None,
            },
            Instrument::Turbidostat => ColumnMap {
                timestamp: "currentProgramTime".to_string(),
                density: "OD940".to_string(),
                cycle: "totalCycleCount".to_string(),
                phase: None,
                dilution_counter: Some("neutralMediaDispenseCount".to_string()),
            },
        }
    }

    /// Whether the timestamp column holds seconds since the unix epoch.
    pub fn timestamps_are_epoch(self) -> bool {
        matches!(self, Instrument::Chemobot)
    }
}

/// Names of the columns the loader coerces to numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub timestamp: String,
    pub density: String,
    pub cycle: String,
    /// Growth/dilution phase indicator. `None` treats every row of a cycle as growth.
    pub phase: Option<String>,
    /// Dilution-event counter; rows where it is nonzero are dropped before segmentation.
    pub dilution_counter: Option<String>,
}

impl ColumnMap {
    /// All configured columns paired with their role, in a stable order.
    pub fn required(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("timestamp", self.timestamp.as_str()),
            ("density", self.density.as_str()),
            ("cycle", self.cycle.as_str()),
        ];
        if let Some(phase) = &self.phase {
            out.push(("phase", phase.as_str()));
        }
        if let Some(counter) = &self.dilution_counter {
            out.push(("dilution counter", counter.as_str()));
        }
        out
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Instrument::Chemobot.default_columns()
    }
}

/// Growth estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GrowthMode {
    /// OLS slope of density vs elapsed hours.
    Linear,
    /// Nonlinear least squares fit of `a·exp(k·t) + c`.
    Exponential,
}

/// How the offset term `c` of the exponential model is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExpOffset {
    /// `c = 0`; the model is `a·exp(k·t)`.
    Zero,
    /// `c` is a free parameter fitted alongside `a` and `k`.
    Free,
}

/// What happens when a single cycle cannot be fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Fail the whole run before any output is written.
    Abort,
    /// Record the cycle as skipped and keep going.
    Skip,
}

/// Which row set feeds the growth estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FitInput {
    /// The downsampled rows (the same points that are plotted).
    Downsampled,
    /// Every segmented row, before downsampling.
    Full,
}

/// One instrument sample after numeric coercion.
///
/// Absent values are `NaN` (or `None` for the cycle id), so comparisons behave
/// like coerced spreadsheet values: `NaN` never equals anything.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// 1-based line number in the source file (header is line 1).
    pub line: usize,
    /// Seconds (since the epoch for chemobot, since program start for turbidostat).
    pub timestamp: f64,
    pub density: f64,
    pub cycle: Option<i64>,
    pub phase: f64,
    pub dilution_events: f64,
    /// Hours since the first retained row; `NaN` until the time normalizer runs.
    pub elapsed_hours: f64,
}

/// All retained rows of one cycle, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub id: i64,
    pub rows: Vec<Measurement>,
}

/// OLS result for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope_per_hour: f64,
    pub intercept: f64,
    /// Pearson correlation of density vs elapsed hours.
    pub correlation: f64,
}

/// Exponential fit result for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialFit {
    pub amplitude: f64,
    pub rate_per_hour: f64,
    pub offset: f64,
    pub r_squared: f64,
    /// `ln 2 / k` in minutes, rounded; `None` when `k` is zero or non-finite.
    pub doubling_time_minutes: Option<i64>,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GrowthEstimate {
    Linear(LinearFit),
    Exponential(ExponentialFit),
}

/// One immutable fit record per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleFit {
    pub cycle: i64,
    /// Number of rows the estimator used.
    pub points: usize,
    pub estimate: GrowthEstimate,
}

impl CycleFit {
    /// The headline statistic: growth rate (hr⁻¹) or doubling time (min).
    pub fn value(&self) -> Option<f64> {
        match &self.estimate {
            GrowthEstimate::Linear(fit) => Some(fit.slope_per_hour),
            GrowthEstimate::Exponential(fit) => fit.doubling_time_minutes.map(|v| v as f64),
        }
    }

    /// Correlation (linear) or R² (exponential).
    pub fn quality(&self) -> f64 {
        match &self.estimate {
            GrowthEstimate::Linear(fit) => fit.correlation,
            GrowthEstimate::Exponential(fit) => fit.r_squared,
        }
    }
}

/// A point on a fitted exponential curve, used for overlay plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedPoint {
    pub cycle: i64,
    pub elapsed_hours: f64,
    pub density: f64,
}

/// A cycle dropped under `FitPolicy::Skip`, with the estimator's reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCycle {
    pub cycle: i64,
    pub reason: String,
}

/// Where run artifacts are written. `None` disables that artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    /// Comma-delimited mirror of the raw input table.
    pub mirror_csv: Option<PathBuf>,
    pub density_svg: Option<PathBuf>,
    pub growth_svg: Option<PathBuf>,
    pub summary_csv: Option<PathBuf>,
    pub fits_json: Option<PathBuf>,
}

impl OutputPaths {
    /// Default artifact set for an input file: mirror beside the input (unless it
    /// already is a `.csv`) and both figures in the working directory.
    pub fn for_input(input: &Path) -> Self {
        let is_csv = input
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        Self {
            mirror_csv: (!is_csv).then(|| input.with_extension("csv")),
            density_svg: Some(PathBuf::from("density.svg")),
            growth_svg: Some(PathBuf::from("growth.svg")),
            summary_csv: None,
            fits_json: None,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from an optional JSON file plus CLI flags (plus defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub delimiter: char,
    pub instrument: Instrument,
    pub columns: ColumnMap,
    /// Minutes between plotted samples; the positional stride is `minutes × 60`.
    pub downsample_minutes: u32,
    /// Readings below this density are excluded before fitting.
    pub density_threshold: f64,
    pub mode: GrowthMode,
    pub exp_offset: ExpOffset,
    /// Iteration budget of the nonlinear solver.
    pub max_iterations: usize,
    pub fit_policy: FitPolicy,
    pub fit_input: FitInput,
    pub outputs: OutputPaths,
    pub plot_width: u32,
    pub plot_height: u32,
}

impl RunConfig {
    pub fn stride(&self) -> usize {
        self.downsample_minutes as usize * 60
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            delimiter: ',',
            instrument: Instrument::Chemobot,
            columns: ColumnMap::default(),
            downsample_minutes: 5,
            density_threshold: 0.0,
            mode: GrowthMode::Linear,
            exp_offset: ExpOffset::Zero,
            max_iterations: 10_000,
            fit_policy: FitPolicy::Abort,
            fit_input: FitInput::Downsampled,
            outputs: OutputPaths::default(),
            plot_width: 1200,
            plot_height: 800,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_skip_mirror_for_csv_inputs() {
        let txt = OutputPaths::for_input(Path::new("data/run1.txt"));
        assert_eq!(txt.mirror_csv, Some(PathBuf::from("data/run1.csv")));

        let csv = OutputPaths::for_input(Path::new("data/run1.CSV"));
        assert_eq!(csv.mirror_csv, None);
    }

    #[test]
    fn turbidostat_columns_use_dispense_counter() {
        let cols = Instrument::Turbidostat.default_columns();
        assert!(cols.phase.is_none());
        let roles: Vec<_> = cols.required().into_iter().map(|(role, _)| role).collect();
        assert_eq!(roles, ["timestamp", "density", "cycle", "dilution counter"]);
    }

    #[test]
    fn exponential_value_is_doubling_time() {
        let fit = CycleFit {
            cycle: 3,
            points: 10,
            estimate: GrowthEstimate::Exponential(ExponentialFit {
                amplitude: 1.0,
                rate_per_hour: 0.1,
                offset: 0.0,
                r_squared: 0.99,
                doubling_time_minutes: Some(416),
                iterations: 4,
            }),
        };
        assert_eq!(fit.value(), Some(416.0));
        assert_eq!(fit.quality(), 0.99);
    }
}
