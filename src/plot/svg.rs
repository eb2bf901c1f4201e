//! Plotters-powered SVG figures.
//!
//! Two figures per run:
//! - density vs elapsed hours, one color per cycle, fitted curves overlaid in black
//! - growth statistic (rate or doubling time) vs cycle ordinal
//!
//! The drawing functions are generic over the Plotters backend; the public
//! entry points bind them to `SVGBackend` and map drawing failures to
//! `AppError`s.

use std::collections::HashMap;
use std::error::Error;
use std::path::Path;

use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::domain::{CycleFit, FittedPoint, GrowthMode, Measurement};
use crate::error::AppError;

/// Figure size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotSize {
    pub width: u32,
    pub height: u32,
}

const POINT_RADIUS: i32 = 3;
const POINT_ALPHA: f64 = 0.75;

/// Write the density-vs-time scatter.
///
/// No legend is drawn: runs routinely have dozens of cycles.
pub fn render_density_svg(
    path: &Path,
    rows: &[Measurement],
    fitted: &[FittedPoint],
    size: PlotSize,
) -> Result<(), AppError> {
    let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
    draw_density(&root, rows, fitted)
        .and_then(|()| root.present().map_err(Into::into))
        .map_err(|e| AppError::output(format!("Failed to draw '{}': {e}", path.display())))?;
    info!("wrote density plot {}", path.display());
    Ok(())
}

/// Write the per-cycle growth statistic scatter.
///
/// Cycles without a value (no doubling time) are left out of this figure.
pub fn render_growth_svg(path: &Path, mode: GrowthMode, fits: &[&CycleFit], size: PlotSize) -> Result<(), AppError> {
    let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
    draw_growth(&root, mode, fits)
        .and_then(|()| root.present().map_err(Into::into))
        .map_err(|e| AppError::output(format!("Failed to draw '{}': {e}", path.display())))?;
    info!("wrote growth plot {}", path.display());
    Ok(())
}

fn draw_density<DB>(
    root: &DrawingArea<DB, Shift>,
    rows: &[Measurement],
    fitted: &[FittedPoint],
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let xs = rows.iter().map(|r| r.elapsed_hours).chain(fitted.iter().map(|p| p.elapsed_hours));
    let ys = rows.iter().map(|r| r.density).chain(fitted.iter().map(|p| p.density));
    let (x0, x1) = padded_range(xs, 0.02).unwrap_or((0.0, 1.0));
    let (y0, y1) = padded_range(ys, 0.05).unwrap_or((0.0, 1.0));

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(x0..x1, y0..y1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Time (hr)")
        .y_desc("OD940")
        .draw()?;

    let ordinals = cycle_ordinals(rows.iter().filter_map(|r| r.cycle));
    let plotted = rows
        .iter()
        .filter(|r| r.elapsed_hours.is_finite() && r.density.is_finite());

    chart.draw_series(plotted.clone().map(|r| {
        let idx = r.cycle.and_then(|c| ordinals.get(&c).copied()).unwrap_or(0);
        Circle::new(
            (r.elapsed_hours, r.density),
            POINT_RADIUS,
            Palette99::pick(idx).mix(POINT_ALPHA).filled(),
        )
    }))?;
    // Thin black edge around every marker.
    chart.draw_series(
        plotted.map(|r| Circle::new((r.elapsed_hours, r.density), POINT_RADIUS, BLACK.stroke_width(1))),
    )?;

    for curve in split_by_cycle(fitted) {
        chart.draw_series(LineSeries::new(
            curve.iter().map(|p| (p.elapsed_hours, p.density)),
            BLACK.stroke_width(1),
        ))?;
    }

    Ok(())
}

fn draw_growth<DB>(root: &DrawingArea<DB, Shift>, mode: GrowthMode, fits: &[&CycleFit]) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let points: Vec<(f64, f64)> = fits
        .iter()
        .enumerate()
        .filter_map(|(idx, fit)| fit.value().map(|v| (idx as f64, v)))
        .filter(|(_, v)| v.is_finite())
        .collect();

    let x1 = (fits.len().max(2) - 1) as f64;
    let (y0, y1) = padded_range(points.iter().map(|p| p.1), 0.1).unwrap_or((0.0, 1.0));
    let y_desc = match mode {
        GrowthMode::Linear => "Growth rate (1/hr)",
        GrowthMode::Exponential => "Doubling time (min)",
    };

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..x1 + 0.5, y0..y1)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Cycle")
        .y_desc(y_desc)
        .x_label_formatter(&|v| format!("{v:.0}"))
        .draw()?;

    let color = Palette99::pick(0);
    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), POINT_RADIUS + 1, color.mix(POINT_ALPHA).filled())),
    )?;

    Ok(())
}

/// Color index per cycle id, in first-seen order.
fn cycle_ordinals(ids: impl Iterator<Item = i64>) -> HashMap<i64, usize> {
    let mut map = HashMap::new();
    for id in ids {
        let next = map.len();
        map.entry(id).or_insert(next);
    }
    map
}

/// Split the concatenated fitted curve into one contiguous run per cycle.
fn split_by_cycle(points: &[FittedPoint]) -> Vec<&[FittedPoint]> {
    let mut out = Vec::new();
    let mut start = 0;
    for i in 1..=points.len() {
        if i == points.len() || points[i].cycle != points[start].cycle {
            if i > start {
                out.push(&points[start..i]);
            }
            start = i;
        }
    }
    out
}

/// Finite min/max of `values`, widened by `pad` of the span on each side.
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !(lo.is_finite() && hi.is_finite()) {
        return None;
    }
    let span = hi - lo;
    if span <= 0.0 {
        let half = if lo == 0.0 { 0.5 } else { lo.abs() * 0.1 };
        return Some((lo - half, hi + half));
    }
    Some((lo - span * pad, hi + span * pad))
}
