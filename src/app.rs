//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - resolves the run configuration (file + flags)
//! - runs the analysis pipeline or the simulator
//! - prints the report

use clap::Parser;
use log::info;

use crate::cli::{AnalyzeArgs, Command, SimulateArgs};
use crate::data::{SimulationSpec, generate_export};
use crate::domain::{OutputPaths, RunConfig};
use crate::error::AppError;
use crate::io::config::{read_run_config, write_run_config};

pub mod pipeline;

/// Entry point for the `growth` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let base = match &args.config {
        Some(path) => {
            let config = read_run_config(path)?;
            info!("loaded config from {}", path.display());
            Some(config)
        }
        None => None,
    };
    let config = run_config_from_args(&args, base)?;

    if let Some(path) = &args.write_config {
        write_run_config(path, &config)?;
        info!("wrote resolved config to {}", path.display());
    }

    let run = pipeline::run_analysis(&config)?;
    println!("{}", crate::report::format_run_summary(&run, &config));
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let delimiter = u8::try_from(args.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| AppError::config(format!("Delimiter {:?} is not a single ASCII character.", args.delimiter)))?;

    let defaults = SimulationSpec::default();
    let spec = SimulationSpec {
        instrument: args.instrument,
        cycles: args.cycles,
        growth_minutes: args.growth_minutes,
        dilution_minutes: args.dilution_minutes,
        rate_per_hour: args.rate,
        rate_jitter: args.rate_jitter,
        noise: args.noise,
        start: args.start.unwrap_or(defaults.start),
        restart_line: !args.no_restart_line,
        seed: args.seed,
    };

    let table = generate_export(&spec)?;
    crate::io::export::write_table(&args.output, &table, delimiter)?;
    println!(
        "Wrote {} rows ({} {} cycles) to {}",
        table.records.len(),
        spec.cycles,
        spec.instrument.display_name(),
        args.output.display()
    );
    Ok(())
}

/// Resolve the run configuration: defaults, then the config file, then flags.
///
/// `--instrument` resets the column names to that instrument's preset before
/// individual column flags apply. Output paths come from the config file when
/// it names any, otherwise from the default set for the input.
pub fn run_config_from_args(args: &AnalyzeArgs, base: Option<RunConfig>) -> Result<RunConfig, AppError> {
    let from_file = base.is_some();
    let mut config = base.unwrap_or_default();

    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if config.input_path.as_os_str().is_empty() {
        return Err(AppError::config("No input file given (pass INPUT or set `input_path` in --config)."));
    }

    if let Some(instrument) = args.instrument {
        config.instrument = instrument;
        config.columns = instrument.default_columns();
    }
    if let Some(c) = &args.timestamp_column {
        config.columns.timestamp = c.clone();
    }
    if let Some(c) = &args.density_column {
        config.columns.density = c.clone();
    }
    if let Some(c) = &args.cycle_column {
        config.columns.cycle = c.clone();
    }
    if let Some(c) = &args.phase_column {
        config.columns.phase = Some(c.clone());
    }
    if let Some(c) = &args.dilution_column {
        config.columns.dilution_counter = Some(c.clone());
    }

    if let Some(d) = args.delimiter {
        config.delimiter = d;
    }
    if let Some(m) = args.downsample_minutes {
        config.downsample_minutes = m;
    }
    if let Some(t) = args.density_threshold {
        config.density_threshold = t;
    }
    if let Some(m) = args.mode {
        config.mode = m;
    }
    if let Some(o) = args.exp_offset {
        config.exp_offset = o;
    }
    if let Some(n) = args.max_iterations {
        config.max_iterations = n;
    }
    if let Some(p) = args.fit_policy {
        config.fit_policy = p;
    }
    if let Some(f) = args.fit_input {
        config.fit_input = f;
    }

    if !from_file || config.outputs == OutputPaths::default() {
        config.outputs = OutputPaths::for_input(&config.input_path);
    }
    let outputs = &mut config.outputs;
    if args.no_mirror {
        outputs.mirror_csv = None;
    }
    if args.mirror.is_some() {
        outputs.mirror_csv = args.mirror.clone();
    }
    if args.density_svg.is_some() {
        outputs.density_svg = args.density_svg.clone();
    }
    if args.growth_svg.is_some() {
        outputs.growth_svg = args.growth_svg.clone();
    }
    if args.summary_csv.is_some() {
        outputs.summary_csv = args.summary_csv.clone();
    }
    if args.fits_json.is_some() {
        outputs.fits_json = args.fits_json.clone();
    }

    if let Some(w) = args.width {
        config.plot_width = w;
    }
    if let Some(h) = args.height {
        config.plot_height = h;
    }
    if config.plot_width == 0 || config.plot_height == 0 {
        return Err(AppError::config("Figure width and height must be > 0."));
    }

    Ok(config)
}
