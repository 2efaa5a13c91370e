//! Sample buffers and the utilities every codec shares
//!
//! - [`buffer`]: the `SignalBuffer` data model and buffer roles
//! - [`normalization`]: peak normalization, padding, variance/correlation
//! - [`resample`]: linear sample-rate conversion

pub mod buffer;
pub mod normalization;
pub mod resample;

pub use buffer::{Role, SignalBuffer};
pub use normalization::NormalizationOutcome;
