//! Structural checks on the text the integration stage would emit.

use crate::Integrator;
use fabula_core::{
    Metadata, MetadataKey, RawOutput, ValidationError, ValidationResult, ValidationSeverity,
    ValidationWarning,
};
use serde::{Deserialize, Serialize};

/// Thresholds for structural validation.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct StructuralRules {
    /// Minimum length of the integrated text, in characters
    min_length: usize,
}

impl Default for StructuralRules {
    fn default() -> Self {
        Self { min_length: 10 }
    }
}

/// Checks that a raw output integrates into usable prose.
///
/// # Examples
///
/// ```
/// use fabula_core::{AgentKind, AgentResponse, RawOutput};
/// use fabula_pipeline::StructuralValidator;
/// use std::time::Duration;
///
/// let output = RawOutput::new(
///     vec![AgentResponse::completed(AgentKind::Narrator, "Short.", Duration::ZERO)],
///     Duration::ZERO,
/// );
/// assert!(!StructuralValidator::default().validate(&output).is_valid());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StructuralValidator {
    rules: StructuralRules,
    integrator: Integrator,
}

impl StructuralValidator {
    /// Creates a validator with the given rules.
    pub fn new(rules: StructuralRules) -> Self {
        Self {
            rules,
            integrator: Integrator::new(),
        }
    }

    /// The rules in force.
    pub fn rules(&self) -> &StructuralRules {
        &self.rules
    }

    /// Validate the output.
    ///
    /// Missing text is critical, short text is a major error, and every
    /// failed agent is reported as a warning.
    pub fn validate(&self, output: &RawOutput) -> ValidationResult {
        let composed = self.integrator.compose(output);
        let length = composed.text().chars().count();
        let mut result = ValidationResult::valid();

        if length == 0 {
            result = result.with_error(ValidationError::new(
                "Generated narrative is empty",
                ValidationSeverity::Critical,
            ));
        } else if length < self.rules.min_length {
            result = result.with_error(ValidationError::new(
                format!(
                    "Generated narrative is too short: {} characters, minimum {}",
                    length, self.rules.min_length
                ),
                ValidationSeverity::Major,
            ));
        }

        let mut failed = 0usize;
        for response in output.failed() {
            failed += 1;
            result = result.with_warning(ValidationWarning::new(format!(
                "Agent {} failed: {}",
                response.agent(),
                response.error().as_deref().unwrap_or("unknown error")
            )));
        }

        result.with_metadata(
            Metadata::new()
                .with(MetadataKey::ContentLength, length)
                .with(MetadataKey::FailedCount, failed),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::{AgentKind, AgentResponse};
    use std::time::Duration;

    fn output(responses: Vec<AgentResponse>) -> RawOutput {
        RawOutput::new(responses, Duration::ZERO)
    }

    #[test]
    fn test_empty_output_is_critical() {
        let result = StructuralValidator::default().validate(&output(vec![]));
        assert!(result.has_critical());
    }

    #[test]
    fn test_long_enough_text_is_valid() {
        let result = StructuralValidator::default().validate(&output(vec![
            AgentResponse::completed(AgentKind::Narrator, "Alice walked into the hall.", Duration::ZERO),
            AgentResponse::failed(AgentKind::Character, "timeout", Duration::ZERO),
        ]));
        assert!(result.is_valid());
        assert_eq!(result.warning_messages(), vec!["Agent character failed: timeout"]);
        assert_eq!(result.metadata().get_int(MetadataKey::FailedCount), Some(1));
    }

    #[test]
    fn test_min_length_is_configurable() {
        let validator = StructuralValidator::new(StructuralRules::default().with_min_length(100));
        let result = validator.validate(&output(vec![AgentResponse::completed(
            AgentKind::Narrator,
            "Alice walked into the hall.",
            Duration::ZERO,
        )]));
        assert!(!result.is_valid());
        assert!(!result.has_critical());
    }

    #[test]
    fn test_consistency_output_does_not_count() {
        let result = StructuralValidator::default().validate(&output(vec![AgentResponse::completed(
            AgentKind::Consistency,
            "No contradictions were found in this text.",
            Duration::ZERO,
        )]));
        assert!(result.has_critical());
    }
}
