//! Pipeline orchestration error types.

/// Specific error conditions for pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// A required argument was not supplied
    #[display("Missing required argument: {}", _0)]
    MissingArgument(String),
    /// A stage failed and its output is required downstream
    #[display("Stage '{}' failed: {}", stage, message)]
    StageFailed {
        /// Stage name
        stage: String,
        /// Error message
        message: String,
    },
    /// The run was cancelled
    #[display("Pipeline cancelled")]
    Cancelled,
    /// No template is registered for the agent
    #[display("No prompt template for agent '{}' and intent '{}'", agent, intent)]
    TemplateNotFound {
        /// Agent name
        agent: String,
        /// Intent type
        intent: String,
    },
    /// The prompt set has no prompts
    #[display("Prompt set is empty")]
    EmptyPromptSet,
}

/// Pipeline error with source location tracking.
///
/// # Examples
///
/// ```
/// use fabula_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::MissingArgument("intent".to_string()));
/// assert!(format!("{}", err).contains("intent"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    kind: PipelineErrorKind,
    line: u32,
    file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &PipelineErrorKind {
        &self.kind
    }

    /// Human-readable message without location information.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
