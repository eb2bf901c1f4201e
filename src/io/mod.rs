//! Input/output helpers.
//!
//! - delimited-text ingest + numeric coercion (`ingest`)
//! - CSV exports: input mirror and per-cycle summary (`export`)
//! - run config / run summary JSON (`config`)

pub mod config;
pub mod export;
pub mod ingest;

pub use config::*;
pub use export::*;
pub use ingest::*;
