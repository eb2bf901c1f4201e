//! Growth estimation.
//!
//! Responsibilities:
//!
//! - linear strategy: OLS growth rate + correlation
//! - exponential strategy: nonlinear fit, R², doubling time
//! - per-cycle dispatch and fit-failure policy

pub mod estimator;
pub mod exponential;
pub mod linear;

pub use estimator::*;
pub use exponential::*;
pub use linear::*;
