//! Delimited-text ingest and numeric coercion.
//!
//! This module is responsible for turning an instrument export into a clean
//! list of `Measurement`s that are safe to segment and fit.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Value-level coercion** (unparseable values become absent, never fatal)
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no segmentation or fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use log::{debug, info};
use serde::Serialize;

use crate::domain::{ColumnMap, Measurement};
use crate::error::AppError;

/// The export as read from disk: header plus raw string fields.
///
/// Records may be ragged; instruments interleave status/header lines whenever
/// they are stopped and restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number in the source file.
    pub line: usize,
    pub fields: Vec<String>,
}

/// Absent-value count for one coerced column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReport {
    pub role: &'static str,
    pub column: String,
    /// Values that were empty or failed numeric coercion.
    pub absent: usize,
}

/// What happened while coercing the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub source: PathBuf,
    pub rows_read: usize,
    /// Rows dropped because the timestamp was absent.
    pub rows_without_timestamp: usize,
    pub columns: Vec<ColumnReport>,
}

impl LoadReport {
    pub fn rows_kept(&self) -> usize {
        self.rows_read - self.rows_without_timestamp
    }
}

/// Loader output: coerced rows (timestamp always present) plus a report.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub rows: Vec<Measurement>,
    pub report: LoadReport,
}

/// Read a delimited text file into a `RawTable`.
pub fn read_table(path: &Path, delimiter: char) -> Result<RawTable, AppError> {
    let delimiter = delimiter_byte(delimiter)?;
    let file = File::open(path)
        .map_err(|e| AppError::load(format!("Failed to open input '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::load(format!("Failed to read header of '{}': {e}", path.display())))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result
            .map_err(|e| AppError::load(format!("Failed to read '{}': {e}", path.display())))?;
        records.push(RawRecord {
            line: record_line(&record),
            fields: record.iter().map(str::to_string).collect(),
        });
    }

    info!(
        "read {} records ({} columns) from {}",
        records.len(),
        headers_len(&records, &headers),
        path.display()
    );

    Ok(RawTable { headers, records })
}

/// Coerce the configured columns of `table` into `Measurement`s.
///
/// `source` is only used for messages and the report.
pub fn parse_measurements(
    table: &RawTable,
    columns: &ColumnMap,
    source: &Path,
) -> Result<LoadedData, AppError> {
    let header_map = build_header_map(&table.headers);

    let mut resolved = Vec::new();
    for (role, name) in columns.required() {
        let idx = *header_map.get(&normalize_header_name(name)).ok_or_else(|| {
            AppError::load(format!(
                "'{}' has no {role} column `{name}` (found: {}).",
                source.display(),
                table.headers.join(", ")
            ))
        })?;
        resolved.push((role, name, idx));
    }
    let index_of = |role: &str| {
        resolved
            .iter()
            .find(|(r, _, _)| *r == role)
            .map(|(_, _, idx)| *idx)
    };
    let ts_idx = index_of("timestamp");
    let od_idx = index_of("density");
    let cycle_idx = index_of("cycle");
    let phase_idx = index_of("phase");
    let counter_idx = index_of("dilution counter");

    let mut absent = vec![0usize; resolved.len()];
    let mut rows = Vec::with_capacity(table.records.len());
    let mut rows_without_timestamp = 0usize;

    for record in &table.records {
        let field = |idx: Option<usize>| idx.and_then(|i| record.fields.get(i)).map(String::as_str);

        for (slot, (_, _, idx)) in resolved.iter().enumerate() {
            if coerce_f64(field(Some(*idx))).is_none() {
                absent[slot] += 1;
            }
        }

        let Some(timestamp) = coerce_f64(field(ts_idx)) else {
            debug!("line {}: no numeric timestamp, dropping row", record.line);
            rows_without_timestamp += 1;
            continue;
        };

        rows.push(Measurement {
            line: record.line,
            timestamp,
            density: coerce_f64(field(od_idx)).unwrap_or(f64::NAN),
            cycle: coerce_f64(field(cycle_idx)).and_then(integral),
            // Without a phase column every row is growth phase.
            phase: match phase_idx {
                Some(_) => coerce_f64(field(phase_idx)).unwrap_or(f64::NAN),
                None => 0.0,
            },
            dilution_events: match counter_idx {
                Some(_) => coerce_f64(field(counter_idx)).unwrap_or(f64::NAN),
                None => 0.0,
            },
            elapsed_hours: f64::NAN,
        });
    }

    let report = LoadReport {
        source: source.to_path_buf(),
        rows_read: table.records.len(),
        rows_without_timestamp,
        columns: resolved
            .iter()
            .zip(absent)
            .map(|((role, name, _), absent)| ColumnReport {
                role: *role,
                column: name.to_string(),
                absent,
            })
            .collect(),
    };

    info!(
        "kept {} of {} rows ({} without a numeric timestamp)",
        report.rows_kept(),
        report.rows_read,
        report.rows_without_timestamp
    );

    Ok(LoadedData { rows, report })
}

/// Read and coerce in one step.
pub fn load_measurements(path: &Path, delimiter: char, columns: &ColumnMap) -> Result<LoadedData, AppError> {
    let table = read_table(path, delimiter)?;
    parse_measurements(&table, columns, path)
}

fn delimiter_byte(delimiter: char) -> Result<u8, AppError> {
    if !delimiter.is_ascii() {
        return Err(AppError::config(format!(
            "Delimiter must be a single ASCII character, got {delimiter:?}."
        )));
    }
    Ok(delimiter as u8)
}

fn record_line(record: &StringRecord) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or_default()
}

fn headers_len(records: &[RawRecord], headers: &[String]) -> usize {
    records
        .iter()
        .map(|r| r.fields.len())
        .max()
        .unwrap_or(0)
        .max(headers.len())
}

fn build_header_map(headers: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Exports saved through Excel often carry a BOM on the first header; if we
    // don't strip it, schema validation reports the first column as missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

/// Numeric coercion: empty, unparseable, and `NaN` values are absent.
fn coerce_f64(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}
