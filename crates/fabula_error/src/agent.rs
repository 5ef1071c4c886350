//! Agent and generation back end error types.

/// Specific error conditions raised while talking to a generation back end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum AgentErrorKind {
    /// The back end reported a failure
    #[display("Generation failed: {}", _0)]
    Backend(String),
    /// The back end returned no text
    #[display("empty content")]
    EmptyContent,
    /// The back end is not reachable
    #[display("Back end unavailable: {}", _0)]
    Unavailable(String),
    /// A prompt targeted an agent the executor cannot serve
    #[display("Unknown agent: {}", _0)]
    UnknownAgent(String),
}

impl AgentErrorKind {
    /// Check if this error is likely to clear on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, AgentErrorKind::Unavailable(_))
    }
}

/// Agent error with source location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{AgentError, AgentErrorKind};
///
/// let err = AgentError::new(AgentErrorKind::Backend("model overloaded".to_string()));
/// assert_eq!(err.message(), "Generation failed: model overloaded");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Agent Error: {} at line {} in {}", kind, line, file)]
pub struct AgentError {
    kind: AgentErrorKind,
    line: u32,
    file: &'static str,
}

impl AgentError {
    /// Create a new AgentError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: AgentErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &AgentErrorKind {
        &self.kind
    }

    /// Human-readable message without location information.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
