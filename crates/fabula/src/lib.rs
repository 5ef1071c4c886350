//! Fabula: a narrative generation pipeline.
//!
//! Fabula turns a narrative intent and a snapshot of the story world into new
//! prose. Generation agents write the text, a consistency validator checks it
//! against what is known about the world, and a retry engine asks the agents
//! to rewrite it until it passes or the retry policy gives up.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fabula::{FabulaConfig, PipelineOrchestrator, PipelineRequest, init_observability};
//! use tokio_util::sync::CancellationToken;
//!
//! init_observability()?;
//! let config = FabulaConfig::load()?;
//! let orchestrator = PipelineOrchestrator::new(my_backend, config.pipeline())?;
//! let result = orchestrator.run(&request, &CancellationToken::new()).await?;
//! ```
//!
//! # Architecture
//!
//! - `fabula_error` - Error types
//! - `fabula_core` - Data model shared by every stage
//! - `fabula_interface` - Generation back end and contradiction checker traits
//! - `fabula_retry` - Retry engine and policies
//! - `fabula_agents` - Agent executor and execution orders
//! - `fabula_consistency` - Narrative consistency validator
//! - `fabula_pipeline` - Pipeline orchestrator
//!
//! This crate re-exports everything for convenience and adds configuration
//! loading and logging setup.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod observability;

pub use config::FabulaConfig;
pub use observability::{ObservabilityConfig, init_observability, init_observability_with_config};

pub use fabula_agents::*;
pub use fabula_consistency::*;
pub use fabula_core::*;
pub use fabula_error::*;
pub use fabula_interface::*;
pub use fabula_pipeline::*;
pub use fabula_retry::*;
