//! CSV exports: the normalized mirror of the input and the per-cycle summary.
//!
//! The summary is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use log::info;

use crate::domain::{GrowthMode, SkippedCycle};
use crate::error::AppError;
use crate::fit::CycleOutcome;
use crate::io::ingest::RawTable;

/// Write the raw table back out as a comma-delimited CSV.
///
/// Every column and every record is kept, including instrument status lines,
/// so reloading the mirror with `,` reproduces the loader's output exactly.
pub fn write_mirror_csv(path: &Path, table: &RawTable) -> Result<(), AppError> {
    write_table(path, table, b',')?;
    info!("wrote mirror CSV {}", path.display());
    Ok(())
}

/// Write a raw table with an arbitrary single-byte delimiter.
pub fn write_table(path: &Path, table: &RawTable, delimiter: u8) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(file);

    let write_err = |e: csv::Error| AppError::output(format!("Failed to write '{}': {e}", path.display()));
    writer.write_record(&table.headers).map_err(write_err)?;
    for record in &table.records {
        writer.write_record(&record.fields).map_err(write_err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::output(format!("Failed to flush '{}': {e}", path.display())))
}

/// Column headers of the summary CSV for a mode.
pub fn summary_headers(mode: GrowthMode) -> [&'static str; 3] {
    match mode {
        GrowthMode::Linear => ["cycle", "growth_rate_per_hr", "correlation"],
        GrowthMode::Exponential => ["cycle", "doubling_time_min", "r_squared"],
    }
}

/// Write one row per fitted or skipped cycle, in cycle order.
///
/// Skipped cycles keep their row with empty value columns. Cycles that had no
/// rows left after thresholding are not written.
pub fn write_summary_csv(path: &Path, mode: GrowthMode, outcomes: &[CycleOutcome]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create summary CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let write_err = |e: csv::Error| AppError::output(format!("Failed to write summary CSV '{}': {e}", path.display()));
    writer.write_record(summary_headers(mode)).map_err(write_err)?;

    let mut rows = 0usize;
    for outcome in outcomes {
        let record = match outcome {
            CycleOutcome::Fitted(fit) => {
                let value = match (mode, fit.value()) {
                    (GrowthMode::Linear, Some(v)) => format!("{v:.6}"),
                    (GrowthMode::Exponential, Some(v)) => format!("{v:.0}"),
                    (_, None) => String::new(),
                };
                [fit.cycle.to_string(), value, format!("{:.4}", fit.quality())]
            }
            CycleOutcome::Skipped(SkippedCycle { cycle, .. }) => [cycle.to_string(), String::new(), String::new()],
            CycleOutcome::Empty(_) => continue,
        };
        writer.write_record(&record).map_err(write_err)?;
        rows += 1;
    }
    writer
        .flush()
        .map_err(|e| AppError::output(format!("Failed to flush summary CSV '{}': {e}", path.display())))?;

    info!("wrote {rows} summary rows to {}", path.display());
    Ok(())
}
