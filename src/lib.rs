//! `growth-curves` library crate.
//!
//! The binary (`growth`) is a thin wrapper around this library so the
//! pipeline stages can be tested without spawning processes:
//!
//! - `io`: instrument export loading, CSV/JSON outputs
//! - `cycles`: segmentation, timebase, downsampling
//! - `fit`: per-cycle linear and exponential growth estimation
//! - `plot`, `report`: SVG figures and terminal summaries

pub mod app;
pub mod cli;
pub mod cycles;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
