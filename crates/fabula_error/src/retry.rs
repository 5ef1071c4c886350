//! Retry engine error types.

/// Specific error conditions for the retry engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RetryErrorKind {
    /// The retry loop was cancelled while waiting or working
    #[display("Retry cancelled")]
    Cancelled,
    /// The initial operation could not produce a value
    #[display("Initial operation failed: {}", _0)]
    OperationFailed(String),
    /// Every permitted attempt was used without producing a valid value
    #[display("Retries exhausted after {} attempts", _0)]
    Exhausted(u32),
    /// Policy configuration is not usable
    #[display("Invalid retry policy: {}", _0)]
    InvalidPolicy(String),
}

/// Retry error with source location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{RetryError, RetryErrorKind};
///
/// let err = RetryError::new(RetryErrorKind::Cancelled);
/// assert!(format!("{}", err).contains("cancelled"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Retry Error: {} at line {} in {}", kind, line, file)]
pub struct RetryError {
    kind: RetryErrorKind,
    line: u32,
    file: &'static str,
}

impl RetryError {
    /// Create a new RetryError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RetryErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &RetryErrorKind {
        &self.kind
    }
}
