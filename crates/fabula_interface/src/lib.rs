//! Trait definitions for the Fabula narrative pipeline.
//!
//! This crate defines the seams the pipeline consumes from its collaborators:
//! the generation back end and the fact-level contradiction checker.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod traits;
mod types;

#[cfg(feature = "testing")]
pub mod testing;

pub use traits::{ContradictionChecker, GenerationBackend};
pub use types::HealthStatus;
