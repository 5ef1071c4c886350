//! Fact, canonical state and coherence error types.

/// Specific error conditions for narrative consistency data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ConsistencyErrorKind {
    /// A fact failed its own invariants
    #[display("Invalid fact {}: {}", id, reason)]
    InvalidFact {
        /// Fact identity
        id: String,
        /// Why the fact was rejected
        reason: String,
    },
    /// A coherence violation failed its own invariants
    #[display("Invalid coherence violation {}: {}", id, reason)]
    InvalidViolation {
        /// Violation identity
        id: String,
        /// Why the violation was rejected
        reason: String,
    },
    /// The fact is not part of the canonical state
    #[display("Fact not found: {}", _0)]
    FactNotFound(String),
    /// An action pattern could not be compiled
    #[display("Invalid action pattern '{}': {}", pattern, message)]
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// Compiler message
        message: String,
    },
}

/// Consistency error with source location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{ConsistencyError, ConsistencyErrorKind};
///
/// let err = ConsistencyError::new(ConsistencyErrorKind::FactNotFound("f-1".to_string()));
/// assert!(matches!(err.kind(), ConsistencyErrorKind::FactNotFound(_)));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Consistency Error: {} at line {} in {}", kind, line, file)]
pub struct ConsistencyError {
    kind: ConsistencyErrorKind,
    line: u32,
    file: &'static str,
}

impl ConsistencyError {
    /// Create a new ConsistencyError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ConsistencyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConsistencyErrorKind {
        &self.kind
    }
}
