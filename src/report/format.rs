//! Formatted terminal output for a completed run.
//!
//! Formatting lives here so the pipeline and fitting code stay free of
//! presentation concerns.

use chrono::DateTime;

use crate::app::pipeline::RunOutput;
use crate::domain::{CycleFit, GrowthEstimate, GrowthMode, RunConfig};
use crate::fit::CycleOutcome;

/// Format the full run summary: inputs, row accounting, per-cycle table.
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== growth - {} growth curves ===\n", config.instrument.display_name()));
    out.push_str(&format!("Input: {}\n", run.load.source.display()));
    if config.instrument.timestamps_are_epoch() {
        if let Some(start) = DateTime::from_timestamp(run.run_start as i64, 0) {
            out.push_str(&format!("Start: {}\n", start.format("%Y-%m-%d %H:%M:%S UTC")));
        }
    }
    out.push_str(&format!(
        "Mode: {:?} | downsample {} min | density >= {}\n",
        config.mode, config.downsample_minutes, config.density_threshold
    ));

    out.push_str(&format!(
        "Rows: read={} | no timestamp={} | dilution={} | growth={} | plotted={}\n",
        run.load.rows_read,
        run.load.rows_without_timestamp,
        run.dilution_rows,
        run.retained_rows,
        run.plotted_rows
    ));
    for col in run.load.columns.iter().filter(|c| c.absent > 0) {
        out.push_str(&format!("  {} ({}): {} absent values\n", col.column, col.role, col.absent));
    }

    out.push('\n');
    out.push_str(&format_cycle_table(&run.estimation.outcomes, config.mode));

    let empty: Vec<String> = run.estimation.empty_cycles().map(|c| c.to_string()).collect();
    if !empty.is_empty() {
        out.push_str(&format!("\nBelow threshold (no rows): {}\n", empty.join(", ")));
    }

    if !run.written.is_empty() {
        out.push_str("\nWrote:\n");
        for path in &run.written {
            out.push_str(&format!("- {}\n", path.display()));
        }
    }

    out
}

/// One row per fitted or skipped cycle.
pub fn format_cycle_table(outcomes: &[CycleOutcome], mode: GrowthMode) -> String {
    let mut out = String::new();
    let (value_header, quality_header) = match mode {
        GrowthMode::Linear => ("rate (1/hr)", "r"),
        GrowthMode::Exponential => ("doubling (min)", "R^2"),
    };

    out.push_str(
        format!(
            "{:>8} {:>8} {:>14} {:>10} {:<30}\n",
            "cycle", "points", value_header, quality_header, "note"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<8} {:-<8} {:-<14} {:-<10} {:-<30}", "", "", "", "", "").trim_end());
    out.push('\n');

    for outcome in outcomes {
        let line = match outcome {
            CycleOutcome::Fitted(fit) => format!(
                "{:>8} {:>8} {:>14} {:>10.4} {:<30}",
                fit.cycle,
                fit.points,
                fmt_value(fit),
                fit.quality(),
                fit_note(fit)
            ),
            CycleOutcome::Skipped(skip) => format!(
                "{:>8} {:>8} {:>14} {:>10} {:<30}",
                skip.cycle,
                "",
                "-",
                "-",
                truncate(&format!("skipped: {}", skip.reason), 30)
            ),
            CycleOutcome::Empty(_) => continue,
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_value(fit: &CycleFit) -> String {
    match &fit.estimate {
        GrowthEstimate::Linear(lin) => format!("{:.6}", lin.slope_per_hour),
        GrowthEstimate::Exponential(exp) => match exp.doubling_time_minutes {
            Some(minutes) => minutes.to_string(),
            None => "n/a".to_string(),
        },
    }
}

fn fit_note(fit: &CycleFit) -> String {
    match &fit.estimate {
        GrowthEstimate::Linear(_) => String::new(),
        GrowthEstimate::Exponential(exp) => format!("k={:.4}/hr", exp.rate_per_hour),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExponentialFit, LinearFit, SkippedCycle};
    use crate::fit::EstimationOutput;
    use crate::io::ingest::{ColumnReport, LoadReport};
    use std::path::PathBuf;

    fn linear(cycle: i64, slope: f64) -> CycleOutcome {
        CycleOutcome::Fitted(CycleFit {
            cycle,
            points: 12,
            estimate: GrowthEstimate::Linear(LinearFit {
                slope_per_hour: slope,
                intercept: 0.0,
                correlation: 0.98,
            }),
        })
    }

    fn run(outcomes: Vec<CycleOutcome>) -> RunOutput {
        RunOutput {
            load: LoadReport {
                source: PathBuf::from("vial.txt"),
                rows_read: 100,
                rows_without_timestamp: 2,
                columns: vec![ColumnReport {
                    role: "density",
                    column: "OD940".to_string(),
                    absent: 3,
                }],
            },
            dilution_rows: 0,
            retained_rows: 80,
            plotted_rows: 8,
            run_start: 1_733_155_200.0,
            estimation: EstimationOutput {
                outcomes,
                fitted_curve: Vec::new(),
            },
            written: vec![PathBuf::from("density.svg")],
        }
    }

    #[test]
    fn summary_accounts_for_every_row() {
        let text = format_run_summary(&run(vec![linear(1, 0.2)]), &RunConfig::default());

        assert!(text.contains("Start: 2024-12-02 16:00:00 UTC"));
        assert!(text.contains("read=100 | no timestamp=2 | dilution=0 | growth=80 | plotted=8"));
        assert!(text.contains("OD940 (density): 3 absent values"));
        assert!(text.contains("- density.svg"));
    }

    #[test]
    fn cycle_table_lists_skipped_but_not_empty_cycles() {
        let outcomes = vec![
            linear(1, 0.25),
            CycleOutcome::Skipped(SkippedCycle {
                cycle: 2,
                reason: "too few points".to_string(),
            }),
            CycleOutcome::Empty(3),
        ];
        let table = format_cycle_table(&outcomes, GrowthMode::Linear);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("0.250000"));
        assert!(lines[3].contains("skipped: too few points"));
    }

    #[test]
    fn exponential_rows_show_doubling_time() {
        let outcome = CycleOutcome::Fitted(CycleFit {
            cycle: 4,
            points: 30,
            estimate: GrowthEstimate::Exponential(ExponentialFit {
                amplitude: 3.0,
                rate_per_hour: 0.1,
                offset: 0.0,
                r_squared: 1.0,
                doubling_time_minutes: Some(416),
                iterations: 9,
            }),
        });
        let table = format_cycle_table(&[outcome], GrowthMode::Exponential);
        assert!(table.contains("416"));
        assert!(table.contains("k=0.1000/hr"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
