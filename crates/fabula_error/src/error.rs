//! Top-level error wrapper types.

use crate::{
    AgentError, BuilderError, ConfigError, ConsistencyError, PipelineError, PipelineErrorKind,
    RetryError, RetryErrorKind,
};

/// Every error family produced by the Fabula crates.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaError, ConfigError};
///
/// let config_err = ConfigError::malformed("missing field `retry`");
/// let err: FabulaError = config_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FabulaErrorKind {
    /// Generation back end or agent error
    #[from(AgentError)]
    Agent(AgentError),
    /// Retry engine error
    #[from(RetryError)]
    Retry(RetryError),
    /// Pipeline orchestration error
    #[from(PipelineError)]
    Pipeline(PipelineError),
    /// Fact, canonical state or coherence error
    #[from(ConsistencyError)]
    Consistency(ConsistencyError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
}

/// Fabula error with kind discrimination.
///
/// # Examples
///
/// ```
/// use fabula_error::{FabulaResult, RetryError, RetryErrorKind};
///
/// fn wait_for_backoff() -> FabulaResult<()> {
///     Err(RetryError::new(RetryErrorKind::Cancelled))?
/// }
///
/// let err = wait_for_backoff().unwrap_err();
/// assert!(err.is_cancelled());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Fabula Error: {}", _0)]
pub struct FabulaError(Box<FabulaErrorKind>);

impl FabulaError {
    /// Create a new error from a kind.
    pub fn new(kind: FabulaErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FabulaErrorKind {
        &self.0
    }

    /// Human-readable message without location information.
    pub fn message(&self) -> String {
        match self.kind() {
            FabulaErrorKind::Agent(e) => e.kind().to_string(),
            FabulaErrorKind::Retry(e) => e.kind().to_string(),
            FabulaErrorKind::Pipeline(e) => e.kind().to_string(),
            FabulaErrorKind::Consistency(e) => e.kind().to_string(),
            FabulaErrorKind::Config(e) => e.message(),
            FabulaErrorKind::Builder(e) => e.kind().to_string(),
        }
    }

    /// Whether this error is the cancellation outcome rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        match self.kind() {
            FabulaErrorKind::Retry(e) => matches!(e.kind(), RetryErrorKind::Cancelled),
            FabulaErrorKind::Pipeline(e) => matches!(e.kind(), PipelineErrorKind::Cancelled),
            _ => false,
        }
    }
}

// Generic From implementation for any type that converts to FabulaErrorKind
impl<T> From<T> for FabulaError
where
    T: Into<FabulaErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Fabula operations.
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;
