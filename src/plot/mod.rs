//! SVG rendering of run results.

pub mod svg;

pub use svg::*;
