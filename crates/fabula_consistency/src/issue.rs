//! Coherence issues and the result of a consistency pass.

use fabula_core::{
    AgentKind, CoherenceViolation, Metadata, MetadataKey, ValidationError, ValidationResult,
    ValidationSeverity, ValidationWarning, ViolationSeverity,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Kind of coherence issue.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// A character who is not alive acts or speaks
    #[strum(serialize = "dead character action")]
    DeadCharacterAction,
    /// The canonical fact set contradicts itself
    #[strum(serialize = "fact contradiction")]
    FactContradiction,
}

/// A conflict between generated text or facts and established narrative truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CoherenceIssue {
    /// Kind of issue
    issue_type: IssueType,
    /// How serious it is
    severity: ViolationSeverity,
    /// Human-readable description
    description: String,
    /// Character the issue is about
    character: Option<String>,
    /// Offending text fragment
    fragment: Option<String>,
    /// Agent whose output contains the fragment
    agent: Option<AgentKind>,
    /// Facts involved
    fact_ids: BTreeSet<Uuid>,
    /// Resolution note
    resolution: Option<String>,
    #[getter(skip)]
    resolved: bool,
}

impl CoherenceIssue {
    /// Issue for a non-living character caught acting in an agent's output.
    pub fn dead_character_action(
        character: impl Into<String>,
        status: impl std::fmt::Display,
        agent: AgentKind,
        fragment: impl Into<String>,
    ) -> Self {
        let character = character.into();
        let fragment = fragment.into();
        Self {
            issue_type: IssueType::DeadCharacterAction,
            severity: ViolationSeverity::Error,
            description: format!(
                "{character} is {status} but acts in the {agent} output: \"{fragment}\""
            ),
            character: Some(character),
            fragment: Some(fragment),
            agent: Some(agent),
            fact_ids: BTreeSet::new(),
            resolution: None,
            resolved: false,
        }
    }

    /// Issue mirroring a contradiction in the canonical fact set.
    pub fn from_violation(violation: &CoherenceViolation) -> Self {
        Self {
            issue_type: IssueType::FactContradiction,
            severity: *violation.severity(),
            description: violation.description().clone(),
            character: None,
            fragment: None,
            agent: None,
            fact_ids: violation.fact_ids().clone(),
            resolution: violation.resolution().clone(),
            resolved: violation.is_resolved(),
        }
    }

    /// Whether the underlying conflict has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Unresolved errors block the pipeline; warnings and notes never do.
    pub fn is_blocking(&self) -> bool {
        self.severity == ViolationSeverity::Error && !self.resolved
    }
}

/// Outcome of one consistency pass.
///
/// # Examples
///
/// ```
/// use fabula_consistency::CoherenceValidationResult;
///
/// let clean = CoherenceValidationResult::coherent();
/// let merged = clean.clone().merge(CoherenceValidationResult::coherent());
/// assert!(merged.is_coherent());
/// assert!(!merged.has_errors());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CoherenceValidationResult {
    #[getter(skip)]
    coherent: bool,
    /// Issues in detection order
    issues: Vec<CoherenceIssue>,
}

impl Default for CoherenceValidationResult {
    fn default() -> Self {
        Self::coherent()
    }
}

impl CoherenceValidationResult {
    /// A result without issues.
    pub fn coherent() -> Self {
        Self {
            coherent: true,
            issues: Vec::new(),
        }
    }

    /// A result judged from its issues: coherent unless one is blocking.
    pub fn from_issues(issues: Vec<CoherenceIssue>) -> Self {
        Self {
            coherent: !issues.iter().any(CoherenceIssue::is_blocking),
            issues,
        }
    }

    /// Whether the checked output is coherent.
    pub fn is_coherent(&self) -> bool {
        self.coherent
    }

    /// Union of both issue lists, coherent only if both were.
    pub fn merge(mut self, other: CoherenceValidationResult) -> Self {
        self.coherent = self.coherent && other.coherent;
        self.issues.extend(other.issues);
        self
    }

    /// Whether any issue has error severity.
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| *i.severity() == ViolationSeverity::Error)
    }

    /// Whether any issue has warning severity.
    pub fn has_warnings(&self) -> bool {
        self.issues
            .iter()
            .any(|i| *i.severity() == ViolationSeverity::Warning)
    }

    /// Issues that make the output unacceptable.
    pub fn blocking_issues(&self) -> impl Iterator<Item = &CoherenceIssue> {
        self.issues.iter().filter(|i| i.is_blocking())
    }

    /// Converts into a validation result: blocking issues become critical
    /// errors, everything else becomes a warning.
    pub fn to_validation_result(&self) -> ValidationResult {
        let (errors, warnings) = self.issues.iter().fold(
            (Vec::new(), Vec::new()),
            |(mut errors, mut warnings), issue| {
                if issue.is_blocking() {
                    errors.push(ValidationError::new(
                        issue.description().clone(),
                        ValidationSeverity::Critical,
                    ));
                } else {
                    warnings.push(ValidationWarning::new(issue.description().clone()));
                }
                (errors, warnings)
            },
        );
        ValidationResult::from_parts(errors, warnings).with_metadata(
            Metadata::new().with(MetadataKey::CoherenceIssueCount, self.issues.len()),
        )
    }
}
