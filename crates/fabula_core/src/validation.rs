//! Structural pass/fail results with severity-graded problems.

use crate::Metadata;
use serde::{Deserialize, Serialize};

/// How serious a validation error is.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidationSeverity {
    /// Cosmetic
    Minor,
    /// Clearly wrong
    Major,
    /// Unusable output
    Critical,
}

/// A problem that makes a result invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ValidationError {
    /// Description of the problem
    message: String,
    /// How serious it is
    severity: ValidationSeverity,
}

impl ValidationError {
    /// Creates an error.
    pub fn new(message: impl Into<String>, severity: ValidationSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// A notice that does not affect validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ValidationWarning {
    /// Description of the notice
    message: String,
}

impl ValidationWarning {
    /// Creates a warning.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of validating a candidate value. Valid iff there are no errors.
///
/// # Examples
///
/// ```
/// use fabula_core::{ValidationError, ValidationResult, ValidationSeverity};
///
/// let ok = ValidationResult::valid();
/// assert!(ok.is_valid());
///
/// let bad = ok.with_error(ValidationError::new("empty narrative", ValidationSeverity::Critical));
/// assert!(!bad.is_valid());
/// assert!(bad.has_critical());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ValidationResult {
    /// Problems that make the value invalid
    errors: Vec<ValidationError>,
    /// Notices that do not affect validity
    warnings: Vec<ValidationWarning>,
    /// Extra information about the validation
    metadata: Metadata,
}

impl ValidationResult {
    /// A result with no errors or warnings.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A result with the given problems.
    pub fn from_parts(errors: Vec<ValidationError>, warnings: Vec<ValidationWarning>) -> Self {
        Self {
            errors,
            warnings,
            metadata: Metadata::new(),
        }
    }

    /// Builder method to add an error.
    pub fn with_error(mut self, error: ValidationError) -> Self {
        self.errors.push(error);
        self
    }

    /// Builder method to add a warning.
    pub fn with_warning(mut self, warning: ValidationWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Builder method to replace the metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// True iff the error list is empty.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any error is critical.
    pub fn has_critical(&self) -> bool {
        self.errors
            .iter()
            .any(|e| *e.severity() == ValidationSeverity::Critical)
    }

    /// Error messages in order.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message().clone()).collect()
    }

    /// Warning messages in order.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings.iter().map(|w| w.message().clone()).collect()
    }

    /// Combines two results: errors, warnings and metadata are concatenated.
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.metadata.extend(&other.metadata);
        self
    }
}
