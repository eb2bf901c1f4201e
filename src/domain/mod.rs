//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`RunConfig`, `ColumnMap`, mode/policy enums)
//! - coerced instrument samples (`Measurement`) and cycles (`Cycle`)
//! - fit outputs (`CycleFit`, `GrowthEstimate`, `FittedPoint`, `SkippedCycle`)

pub mod types;

pub use types::*;
