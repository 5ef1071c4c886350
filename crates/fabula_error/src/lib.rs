//! Error types for the Fabula narrative pipeline.
//!
//! This crate provides the foundation error types used throughout the Fabula workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use fabula_error::{AgentError, AgentErrorKind, FabulaResult};
//!
//! fn call_agent() -> FabulaResult<String> {
//!     Err(AgentError::new(AgentErrorKind::EmptyContent))?
//! }
//!
//! match call_agent() {
//!     Ok(text) => println!("Got: {}", text),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod agent;
mod builder;
mod config;
mod consistency;
mod error;
mod pipeline;
mod retry;

pub use agent::{AgentError, AgentErrorKind};
pub use builder::{BuilderError, BuilderErrorKind};
pub use config::{ConfigError, ConfigErrorKind};
pub use consistency::{ConsistencyError, ConsistencyErrorKind};
pub use error::{FabulaError, FabulaErrorKind, FabulaResult};
pub use pipeline::{PipelineError, PipelineErrorKind};
pub use retry::{RetryError, RetryErrorKind};
