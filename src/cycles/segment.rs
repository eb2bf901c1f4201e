//! Cycle segmentation: drop dilution-phase rows from every cycle.
//!
//! Each instrument cycle has a growth sub-segment (density rising) and a
//! dilution sub-segment (density falling while media is pumped in). The two
//! carry different phase-indicator values, and a cycle always starts in its
//! growth phase, so the first row's indicator identifies the rows to keep.

use std::collections::HashMap;

use log::debug;

use crate::domain::{Cycle, Measurement};

/// Drop rows whose dilution-event counter is nonzero (or absent).
pub fn drop_dilution_events(rows: Vec<Measurement>) -> Vec<Measurement> {
    let before = rows.len();
    let kept: Vec<Measurement> = rows.into_iter().filter(|r| r.dilution_events == 0.0).collect();
    if kept.len() != before {
        debug!("dropped {} rows with dilution events", before - kept.len());
    }
    kept
}

/// Group rows by cycle id, in first-encountered order of ids.
///
/// Rows keep their relative order inside a group. Rows without a cycle id
/// belong to no group.
pub fn group_by_cycle(rows: &[Measurement]) -> Vec<Cycle> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut cycles: Vec<Cycle> = Vec::new();

    for row in rows {
        let Some(id) = row.cycle else { continue };
        let slot = *index.entry(id).or_insert_with(|| {
            cycles.push(Cycle { id, rows: Vec::new() });
            cycles.len() - 1
        });
        cycles[slot].rows.push(*row);
    }

    cycles
}

/// Keep only the rows of `cycle` whose phase equals its first row's phase.
///
/// Equality is exact. A `NaN` reference phase matches nothing, so such a cycle
/// comes back empty.
pub fn growth_rows(cycle: &Cycle) -> Vec<Measurement> {
    let Some(first) = cycle.rows.first() else {
        return Vec::new();
    };
    let reference = first.phase;
    cycle
        .rows
        .iter()
        .filter(|r| r.phase == reference)
        .copied()
        .collect()
}

/// Segment all rows: group by cycle, keep each cycle's growth rows, concatenate.
pub fn segment(rows: &[Measurement]) -> Vec<Measurement> {
    let mut out = Vec::with_capacity(rows.len());
    for cycle in group_by_cycle(rows) {
        let kept = growth_rows(&cycle);
        debug!(
            "cycle {}: reference phase {}, kept {} of {} rows",
            cycle.id,
            cycle.rows[0].phase,
            kept.len(),
            cycle.rows.len()
        );
        out.extend(kept);
    }
    out
}
