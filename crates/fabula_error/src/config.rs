//! Errors from loading layered configuration.

/// Which step of loading failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A source could not be read or merged with the layers below it
    #[display("Could not read {}: {}", origin, reason)]
    Unreadable {
        /// File path or layer name
        origin: String,
        /// Underlying failure
        reason: String,
    },
    /// The merged layers do not describe a valid configuration
    #[display("Malformed configuration: {}", _0)]
    Malformed(String),
}

/// Configuration error with source location.
///
/// # Examples
///
/// ```
/// use fabula_error::{ConfigError, ConfigErrorKind};
///
/// let err = ConfigError::malformed("retry.kind: unknown variant `sometimes`");
/// assert!(matches!(err.kind(), ConfigErrorKind::Malformed(_)));
/// assert!(err.message().starts_with("Malformed configuration"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    kind: ConfigErrorKind,
    line: u32,
    file: &'static str,
}

impl ConfigError {
    /// Wraps a kind, recording the caller's location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A layer named `origin` failed to load.
    #[track_caller]
    pub fn unreadable(origin: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::new(ConfigErrorKind::Unreadable {
            origin: origin.into(),
            reason: reason.to_string(),
        })
    }

    /// The merged layers failed to deserialize.
    #[track_caller]
    pub fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::new(ConfigErrorKind::Malformed(reason.to_string()))
    }

    /// The error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }

    /// The failure without its source location.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}
