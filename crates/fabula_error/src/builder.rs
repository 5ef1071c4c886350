//! Errors raised while assembling data-model values.

/// Why a value could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum BuilderErrorKind {
    /// A required input was never supplied
    #[display("{} requires '{}'", target, field)]
    MissingField {
        /// Type being built
        target: &'static str,
        /// Name of the unset field
        field: String,
    },
    /// Every field was set but the combination is unusable
    #[display("{} rejected: {}", target, reason)]
    Rejected {
        /// Type being built
        target: &'static str,
        /// What the builder objected to
        reason: String,
    },
}

/// A data-model value that failed to build, with the call site that asked
/// for it.
///
/// # Examples
///
/// ```
/// use fabula_error::BuilderError;
///
/// let err = BuilderError::missing("PipelineRequest", "snapshot");
/// assert_eq!(err.target(), "PipelineRequest");
/// assert_eq!(err.field(), Some("snapshot"));
/// assert_eq!(err.kind().to_string(), "PipelineRequest requires 'snapshot'");
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Builder Error: {} at line {} in {}", kind, line, file)]
pub struct BuilderError {
    kind: BuilderErrorKind,
    line: u32,
    file: &'static str,
}

impl BuilderError {
    /// Wraps a kind, recording the caller's location.
    #[track_caller]
    pub fn new(kind: BuilderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A required field of `target` was left unset.
    #[track_caller]
    pub fn missing(target: &'static str, field: impl Into<String>) -> Self {
        Self::new(BuilderErrorKind::MissingField {
            target,
            field: field.into(),
        })
    }

    /// `target`'s own validation refused the supplied fields.
    #[track_caller]
    pub fn rejected(target: &'static str, reason: impl Into<String>) -> Self {
        Self::new(BuilderErrorKind::Rejected {
            target,
            reason: reason.into(),
        })
    }

    /// The error kind.
    pub fn kind(&self) -> &BuilderErrorKind {
        &self.kind
    }

    /// Name of the type that failed to build.
    pub fn target(&self) -> &'static str {
        match &self.kind {
            BuilderErrorKind::MissingField { target, .. }
            | BuilderErrorKind::Rejected { target, .. } => *target,
        }
    }

    /// The unset field, for missing-field errors.
    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            BuilderErrorKind::MissingField { field, .. } => Some(field),
            BuilderErrorKind::Rejected { .. } => None,
        }
    }
}
