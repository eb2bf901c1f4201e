//! Terminal reporting for completed runs.

pub mod format;

pub use format::*;
