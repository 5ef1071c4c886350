//! Retry engine for the Fabula narrative pipeline.
//!
//! The engine runs a generic operate, validate, rewrite loop. Whether another
//! attempt is made and how long to wait before it is decided by a
//! [`RetryPolicy`]. The engine knows nothing about narratives: callers supply
//! the operation, the validation check and the rewrite step.
//!
//! # Example
//!
//! ```
//! use fabula_core::{ValidationError, ValidationResult, ValidationSeverity};
//! use fabula_retry::{RetryEngine, SimpleRetryPolicy};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fabula_error::FabulaResult<()> {
//! let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(2, Duration::ZERO)));
//! let result = engine
//!     .execute_with_retry(
//!         || async { Ok(String::from("draft")) },
//!         |text: &String| {
//!             if text.ends_with('!') {
//!                 ValidationResult::valid()
//!             } else {
//!                 ValidationResult::valid()
//!                     .with_error(ValidationError::new("needs emphasis", ValidationSeverity::Minor))
//!             }
//!         },
//!         |text: String, _, _| async move { Ok(format!("{text}!")) },
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//!
//! assert!(result.is_success());
//! assert_eq!(result.value(), "draft!");
//! assert_eq!(result.attempt_count(), 2);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod engine;
mod policy;

pub use config::RetryPolicyConfig;
pub use context::{RetryAttempt, RetryContext, RetryResult};
pub use engine::RetryEngine;
pub use policy::{
    ConditionalRetryPolicy, ExponentialBackoffPolicy, NoRetryPolicy, RetryPolicy,
    SimpleRetryPolicy,
};
