//! Elapsed-time normalization.

use crate::domain::Measurement;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Set `elapsed_hours` relative to the first row of `rows`.
///
/// Runs after segmentation, so time zero is the first *retained* sample. An
/// empty slice is left untouched.
pub fn normalize_time(rows: &mut [Measurement]) {
    let Some(t0) = rows.first().map(|r| r.timestamp) else {
        return;
    };
    for row in rows.iter_mut() {
        row.elapsed_hours = (row.timestamp - t0) / SECONDS_PER_HOUR;
    }
}
