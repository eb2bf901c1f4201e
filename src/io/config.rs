//! Read/write run configuration and run summary JSON files.
//!
//! A config file is a (possibly partial) `RunConfig`; missing fields take their
//! defaults. The run summary is the machine-readable counterpart of the
//! terminal report.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::domain::{CycleFit, RunConfig, SkippedCycle};
use crate::error::AppError;
use crate::io::ingest::LoadReport;

/// Read a run configuration JSON file.
pub fn read_run_config(path: &Path) -> Result<RunConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open config '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::config(format!("Invalid config JSON '{}': {e}", path.display())))
}

/// Write a run configuration JSON file.
pub fn write_run_config(path: &Path, config: &RunConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create config '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, config)
        .map_err(|e| AppError::output(format!("Failed to write config JSON: {e}")))
}

/// JSON document describing a completed run.
#[derive(Debug, Serialize)]
pub struct RunSummaryFile<'a> {
    pub tool: &'static str,
    pub generated: DateTime<Local>,
    pub config: &'a RunConfig,
    pub load: &'a LoadReport,
    pub fits: Vec<&'a CycleFit>,
    pub skipped: Vec<&'a SkippedCycle>,
    /// Cycles with no rows left after thresholding.
    pub empty_cycles: Vec<i64>,
}

/// Write the run summary JSON file.
pub fn write_summary_json(path: &Path, summary: &RunSummaryFile<'_>) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, summary)
        .map_err(|e| AppError::output(format!("Failed to write summary JSON: {e}")))
}
