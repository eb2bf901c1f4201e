//! The analysis pipeline behind `growth analyze`.
//!
//! load -> (mirror) -> coerce -> drop dilution events -> segment -> normalize
//! time -> downsample -> estimate -> render
//!
//! Every fit completes before any figure or summary is written, so a failing
//! cycle under the abort policy leaves no partial outputs behind (the mirror is
//! a faithful copy of the input and is written as soon as the table is read).

use std::path::PathBuf;

use chrono::Local;
use log::info;

use crate::cycles::{downsample, drop_dilution_events, group_by_cycle, normalize_time, segment, stride_for_minutes};
use crate::domain::{FitInput, RunConfig};
use crate::error::AppError;
use crate::fit::{EstimationOutput, EstimatorOptions, estimate_cycles};
use crate::io::config::{RunSummaryFile, write_summary_json};
use crate::io::export::{write_mirror_csv, write_summary_csv};
use crate::io::ingest::{LoadReport, LoadedData, parse_measurements, read_table};
use crate::plot::{PlotSize, render_density_svg, render_growth_svg};

/// All computed outputs of a single `growth analyze` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub load: LoadReport,
    /// Rows dropped because their dilution-event counter was nonzero.
    pub dilution_rows: usize,
    /// Growth-phase rows kept by segmentation.
    pub retained_rows: usize,
    /// Rows left after downsampling.
    pub plotted_rows: usize,
    /// Raw timestamp of the first retained row (time zero).
    pub run_start: f64,
    pub estimation: EstimationOutput,
    /// Artifacts written, in order.
    pub written: Vec<PathBuf>,
}

/// Execute the full analysis pipeline.
pub fn run_analysis(config: &RunConfig) -> Result<RunOutput, AppError> {
    let stride = stride_for_minutes(config.downsample_minutes)?;
    let outputs = &config.outputs;
    let mut written = Vec::new();

    // 1) Load.
    let table = read_table(&config.input_path, config.delimiter)?;
    if let Some(path) = &outputs.mirror_csv {
        write_mirror_csv(path, &table)?;
        written.push(path.clone());
    }
    let LoadedData { rows, report } = parse_measurements(&table, &config.columns, &config.input_path)?;
    info!(
        "loaded {} rows from {} ({} without timestamp)",
        report.rows_kept(),
        config.input_path.display(),
        report.rows_without_timestamp
    );
    if rows.is_empty() {
        return Err(AppError::no_data(format!(
            "No rows with a timestamp in '{}'.",
            config.input_path.display()
        )));
    }

    // 2) Segment.
    let before = rows.len();
    let rows = drop_dilution_events(rows);
    let dilution_rows = before - rows.len();
    let mut retained = segment(&rows);
    info!("segmentation kept {} growth-phase rows", retained.len());
    if retained.is_empty() {
        return Err(AppError::no_data(format!(
            "No growth-phase rows left in '{}' after segmentation.",
            config.input_path.display()
        )));
    }

    // 3) Timebase + downsample.
    normalize_time(&mut retained);
    let run_start = retained[0].timestamp;
    let plotted = downsample(&retained, stride);
    info!("downsampled to {} rows (stride {stride})", plotted.len());

    // 4) Estimate.
    let fit_rows = match config.fit_input {
        FitInput::Downsampled => &plotted,
        FitInput::Full => &retained,
    };
    let cycles = group_by_cycle(fit_rows);
    let estimation = estimate_cycles(&cycles, &EstimatorOptions::from(config))?;
    info!(
        "fitted {} cycles ({} skipped, {} empty)",
        estimation.fits().count(),
        estimation.skipped().count(),
        estimation.empty_cycles().count()
    );

    // 5) Render.
    let size = PlotSize {
        width: config.plot_width,
        height: config.plot_height,
    };
    if let Some(path) = &outputs.density_svg {
        render_density_svg(path, &plotted, &estimation.fitted_curve, size)?;
        written.push(path.clone());
    }
    if let Some(path) = &outputs.growth_svg {
        let fits: Vec<_> = estimation.fits().collect();
        render_growth_svg(path, config.mode, &fits, size)?;
        written.push(path.clone());
    }
    if let Some(path) = &outputs.summary_csv {
        write_summary_csv(path, config.mode, &estimation.outcomes)?;
        written.push(path.clone());
    }
    if let Some(path) = &outputs.fits_json {
        let summary = RunSummaryFile {
            tool: env!("CARGO_PKG_NAME"),
            generated: Local::now(),
            config,
            load: &report,
            fits: estimation.fits().collect(),
            skipped: estimation.skipped().collect(),
            empty_cycles: estimation.empty_cycles().collect(),
        };
        write_summary_json(path, &summary)?;
        written.push(path.clone());
    }

    Ok(RunOutput {
        load: report,
        dilution_rows,
        retained_rows: retained.len(),
        plotted_rows: plotted.len(),
        run_start,
        estimation,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SimulationSpec, generate_export};
    use crate::domain::{GrowthEstimate, GrowthMode, Instrument, OutputPaths};
    use crate::error::ErrorKind;
    use crate::io::export::write_table;
    use std::path::Path;

    fn quiet_outputs() -> OutputPaths {
        OutputPaths::default()
    }

    /// Three cycles an hour apart per row; cycle 2 ends with two dilution rows.
    const THREE_CYCLES: &str = "\
unixTime,OD940,totalCycleCount,growthDurationChange
0,0.10,1,10
3600,0.20,1,10
7200,0.30,1,10
10800,0.30,2,20
14400,0.40,2,20
18000,0.50,2,20
21600,0.20,2,0
25200,0.10,2,0
28800,0.10,3,30
32400,0.20,3,30
36000,0.30,3,30
";

    fn write_input(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn three_cycle_run_drops_dilution_rows_of_cycle_two() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "run.csv", THREE_CYCLES);
        let config = RunConfig {
            input_path: input,
            fit_input: FitInput::Full,
            outputs: quiet_outputs(),
            ..RunConfig::default()
        };

        let out = run_analysis(&config).unwrap();

        assert_eq!(out.load.rows_read, 11);
        assert_eq!(out.retained_rows, 9);
        assert_eq!(out.run_start, 0.0);

        let fits: Vec<_> = out.estimation.fits().collect();
        assert_eq!(fits.iter().map(|f| f.cycle).collect::<Vec<_>>(), [1, 2, 3]);
        assert_eq!(fits[1].points, 3);
        for fit in &fits {
            let GrowthEstimate::Linear(lin) = fit.estimate else {
                panic!("expected linear estimate");
            };
            assert!((lin.slope_per_hour - 0.1).abs() < 1e-9);
            assert!((lin.correlation - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn outputs_are_written_after_fitting() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), "run.txt", THREE_CYCLES);
        let outputs = OutputPaths {
            summary_csv: Some(dir.path().join("summary.csv")),
            fits_json: Some(dir.path().join("fits.json")),
            density_svg: Some(dir.path().join("density.svg")),
            growth_svg: Some(dir.path().join("growth.svg")),
            ..OutputPaths::for_input(&input)
        };
        let config = RunConfig {
            input_path: input.clone(),
            fit_input: FitInput::Full,
            outputs,
            ..RunConfig::default()
        };

        let out = run_analysis(&config).unwrap();

        assert_eq!(out.written.len(), 5);
        assert_eq!(out.written[0], input.with_extension("csv"));
        for path in &out.written {
            assert!(path.exists(), "{} missing", path.display());
        }
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("fits.json")).unwrap()).unwrap();
        assert_eq!(json["fits"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn abort_policy_writes_no_figures() {
        let dir = tempfile::tempdir().unwrap();
        // Cycle 2 has a single growth row: too few points for a line.
        let input = write_input(
            dir.path(),
            "run.csv",
            "unixTime,OD940,totalCycleCount,growthDurationChange\n\
             0,0.1,1,5\n60,0.2,1,5\n120,0.3,2,5\n180,0.1,2,0\n",
        );
        let density = dir.path().join("density.svg");
        let config = RunConfig {
            input_path: input,
            fit_input: FitInput::Full,
            outputs: OutputPaths {
                density_svg: Some(density.clone()),
                ..OutputPaths::default()
            },
            ..RunConfig::default()
        };

        let err = run_analysis(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
        assert!(err.message().contains("cycle 2"));
        assert!(!density.exists());
    }

    #[test]
    fn file_without_timestamps_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            "run.csv",
            "unixTime,OD940,totalCycleCount,growthDurationChange\n,0.1,1,5\nn/a,0.2,1,5\n",
        );
        let config = RunConfig {
            input_path: input,
            outputs: quiet_outputs(),
            ..RunConfig::default()
        };

        let err = run_analysis(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn zero_downsample_interval_is_rejected_before_loading() {
        let config = RunConfig {
            input_path: PathBuf::from("does-not-exist.txt"),
            downsample_minutes: 0,
            ..RunConfig::default()
        };
        assert_eq!(run_analysis(&config).unwrap_err().kind(), ErrorKind::Config);
    }

    #[test]
    fn simulated_export_recovers_growth_rate() {
        let dir = tempfile::tempdir().unwrap();
        let spec = SimulationSpec {
            cycles: 2,
            growth_minutes: 120,
            dilution_minutes: 5,
            rate_jitter: 0.0,
            noise: 0.0,
            ..SimulationSpec::default()
        };
        let input = dir.path().join("sim.txt");
        write_table(&input, &generate_export(&spec).unwrap(), b';').unwrap();

        let config = RunConfig {
            input_path: input,
            delimiter: ';',
            downsample_minutes: 1,
            mode: GrowthMode::Exponential,
            outputs: quiet_outputs(),
            ..RunConfig::default()
        };
        let out = run_analysis(&config).unwrap();

        assert_eq!(out.load.rows_without_timestamp, 1);
        let fits: Vec<_> = out.estimation.fits().collect();
        assert_eq!(fits.len(), 2);
        for fit in fits {
            let GrowthEstimate::Exponential(exp) = fit.estimate else {
                panic!("expected exponential estimate");
            };
            assert!((exp.rate_per_hour - 0.6).abs() < 0.01, "k = {}", exp.rate_per_hour);
            assert_eq!(fit.points, 120);
        }
        assert_eq!(out.estimation.fitted_curve.len(), 240);
    }

    #[test]
    fn turbidostat_dispense_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let spec = SimulationSpec {
            instrument: Instrument::Turbidostat,
            cycles: 2,
            growth_minutes: 10,
            dilution_minutes: 2,
            restart_line: false,
            ..SimulationSpec::default()
        };
        let input = dir.path().join("turbido.csv");
        write_table(&input, &generate_export(&spec).unwrap(), b',').unwrap();

        let config = RunConfig {
            input_path: input,
            instrument: Instrument::Turbidostat,
            columns: Instrument::Turbidostat.default_columns(),
            fit_input: FitInput::Full,
            outputs: quiet_outputs(),
            ..RunConfig::default()
        };
        let out = run_analysis(&config).unwrap();

        assert_eq!(out.dilution_rows, 2 * 120);
        assert_eq!(out.retained_rows, 2 * 600);
        assert_eq!(out.estimation.fits().count(), 2);
    }
}
