//! Row preparation between loading and fitting.
//!
//! dilution pre-filter -> cycle segmentation -> time normalization -> downsampling

pub mod downsample;
pub mod segment;
pub mod timebase;

pub use downsample::*;
pub use segment::*;
pub use timebase::*;
