//! Command-line parsing for the growth-curve analyzer.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Analysis flags are all optional so that, when given, they override
//! a `--config` file; defaults live in `RunConfig`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{ArgAction, Parser, Subcommand};

use crate::domain::{ExpOffset, FitInput, FitPolicy, GrowthMode, Instrument};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "growth", version, about = "Growth-curve analysis for chemobot and turbidostat exports")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Segment an instrument export into cycles, estimate growth, and render plots.
    Analyze(AnalyzeArgs),
    /// Write a synthetic instrument export.
    Simulate(SimulateArgs),
}

/// Options for `growth analyze`.
#[derive(Debug, Parser, Clone, Default)]
pub struct AnalyzeArgs {
    /// Instrument export to analyze (may instead come from `--config`).
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Run configuration JSON; flags given here override it.
    #[arg(long, value_name = "JSON")]
    pub config: Option<PathBuf>,

    /// Write the resolved configuration to this JSON file.
    #[arg(long, value_name = "JSON")]
    pub write_config: Option<PathBuf>,

    /// Instrument preset (selects default column names).
    #[arg(short = 'i', long, value_enum)]
    pub instrument: Option<Instrument>,

    /// Field delimiter of the input (single ASCII character).
    #[arg(short = 'd', long)]
    pub delimiter: Option<char>,

    /// Timestamp column name.
    #[arg(long)]
    pub timestamp_column: Option<String>,

    /// Density column name.
    #[arg(long)]
    pub density_column: Option<String>,

    /// Cycle id column name.
    #[arg(long)]
    pub cycle_column: Option<String>,

    /// Phase indicator column name.
    #[arg(long)]
    pub phase_column: Option<String>,

    /// Dilution-event counter column name.
    #[arg(long)]
    pub dilution_column: Option<String>,

    /// Minutes between plotted samples (stride = minutes x 60 rows).
    #[arg(long)]
    pub downsample_minutes: Option<u32>,

    /// Readings below this density are excluded before fitting.
    #[arg(long)]
    pub density_threshold: Option<f64>,

    /// Growth estimation strategy.
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<GrowthMode>,

    /// Offset term of the exponential model.
    #[arg(long, value_enum)]
    pub exp_offset: Option<ExpOffset>,

    /// Iteration budget of the exponential solver.
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// What to do when a cycle cannot be fitted.
    #[arg(long = "on-fit-error", value_enum)]
    pub fit_policy: Option<FitPolicy>,

    /// Rows fed to the estimator.
    #[arg(long, value_enum)]
    pub fit_input: Option<FitInput>,

    /// Path of the normalized CSV mirror.
    #[arg(long, value_name = "CSV")]
    pub mirror: Option<PathBuf>,

    /// Do not write the CSV mirror.
    #[arg(long, conflicts_with = "mirror")]
    pub no_mirror: bool,

    /// Density-vs-time figure.
    #[arg(long, value_name = "SVG")]
    pub density_svg: Option<PathBuf>,

    /// Growth statistic figure.
    #[arg(long, value_name = "SVG")]
    pub growth_svg: Option<PathBuf>,

    /// Per-cycle summary CSV.
    #[arg(long, value_name = "CSV")]
    pub summary_csv: Option<PathBuf>,

    /// Full run summary JSON.
    #[arg(long, value_name = "JSON")]
    pub fits_json: Option<PathBuf>,

    /// Figure width (pixels).
    #[arg(long)]
    pub width: Option<u32>,

    /// Figure height (pixels).
    #[arg(long)]
    pub height: Option<u32>,
}

/// Options for `growth simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// File to write.
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Instrument format to imitate.
    #[arg(short = 'i', long, value_enum, default_value_t = Instrument::Chemobot)]
    pub instrument: Instrument,

    /// Field delimiter.
    #[arg(short = 'd', long, default_value_t = ',')]
    pub delimiter: char,

    /// Number of dilution cycles.
    #[arg(short = 'n', long, default_value_t = 6)]
    pub cycles: usize,

    /// Growth phase length (minutes).
    #[arg(long, default_value_t = 240)]
    pub growth_minutes: u32,

    /// Dilution phase length (minutes).
    #[arg(long, default_value_t = 10)]
    pub dilution_minutes: u32,

    /// Mean specific growth rate (1/hr).
    #[arg(long, default_value_t = 0.6)]
    pub rate: f64,

    /// Relative cycle-to-cycle spread of the growth rate.
    #[arg(long, default_value_t = 0.05)]
    pub rate_jitter: f64,

    /// Relative measurement noise.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,

    /// Run start (RFC 3339), used for chemobot timestamps.
    #[arg(long, value_parser = parse_start)]
    pub start: Option<DateTime<Utc>>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Leave out the interleaved header line after the first cycle.
    #[arg(long)]
    pub no_restart_line: bool,
}

fn parse_start(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp like 2024-12-02T16:00:00Z: {e}"))
}
