//! The narrative consistency validator.

use crate::{ActionPatterns, CoherenceIssue, CoherenceValidationResult};
use fabula_core::{
    CanonicalState, NarrativeSnapshot, PipelineContext, RawOutput, ViolationType,
};
use fabula_interface::ContradictionChecker;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Checks generated text against the known state of the world.
///
/// # Examples
///
/// ```
/// use fabula_consistency::NarrativeConsistencyValidator;
/// use fabula_core::{
///     AgentKind, AgentResponse, CharacterState, IntentType, NarrativeIntent,
///     NarrativeSnapshot, PipelineContext, RawOutput, VitalStatus,
/// };
/// use std::time::Duration;
///
/// let snapshot = NarrativeSnapshot::builder()
///     .world_id("eldoria")
///     .characters(vec![CharacterState::new("bob", "Bob", VitalStatus::Dead)])
///     .build()
///     .unwrap();
/// let context = PipelineContext::builder()
///     .snapshot(snapshot)
///     .intent(NarrativeIntent::new(IntentType::Continue))
///     .build()
///     .unwrap();
/// let output = RawOutput::new(
///     vec![AgentResponse::completed(AgentKind::Narrator, "Bob waved from the tower.", Duration::ZERO)],
///     Duration::ZERO,
/// );
///
/// let result = NarrativeConsistencyValidator::new().validate(&output, &context);
/// assert!(!result.is_coherent());
/// ```
#[derive(Clone, Default)]
pub struct NarrativeConsistencyValidator {
    patterns: ActionPatterns,
    checker: Option<Arc<dyn ContradictionChecker>>,
}

impl fmt::Debug for NarrativeConsistencyValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NarrativeConsistencyValidator")
            .field("patterns", &self.patterns)
            .field("checker", &self.checker.is_some())
            .finish()
    }
}

impl NarrativeConsistencyValidator {
    /// Creates a validator with the default action patterns and no fact checker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to replace the action patterns.
    pub fn with_patterns(mut self, patterns: ActionPatterns) -> Self {
        self.patterns = patterns;
        self
    }

    /// Builder method to inject a fact-level contradiction checker.
    pub fn with_checker(mut self, checker: Arc<dyn ContradictionChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// The action patterns in use.
    pub fn patterns(&self) -> &ActionPatterns {
        &self.patterns
    }

    /// Runs every consistency check that the context supports.
    #[instrument(skip_all, fields(responses = output.len()))]
    pub fn validate(&self, output: &RawOutput, context: &PipelineContext) -> CoherenceValidationResult {
        let mut result = self.check_vital_status(output, context.snapshot());
        if let Some(state) = context.canonical_state() {
            result = result.merge(self.check_facts(state));
        }
        debug!(
            coherent = result.is_coherent(),
            issues = result.issues().len(),
            "Consistency check finished"
        );
        result
    }

    /// Flags characters who are not alive but act or speak in the output.
    ///
    /// Passive mentions are not issues.
    pub fn check_vital_status(
        &self,
        output: &RawOutput,
        snapshot: &NarrativeSnapshot,
    ) -> CoherenceValidationResult {
        let mut issues = Vec::new();
        for character in snapshot.non_living_characters() {
            let mut names = vec![character.name().as_str()];
            if !character.id().as_str().eq_ignore_ascii_case(character.name()) {
                names.push(character.id().as_str());
            }
            let compiled: Vec<_> = names
                .iter()
                .filter(|n| !n.trim().is_empty())
                .flat_map(|n| self.patterns.compile(n))
                .collect();

            for response in output.responses().iter().filter(|r| r.has_content()) {
                let fragment = compiled
                    .iter()
                    .find_map(|regex| regex.find(response.content()));
                if let Some(fragment) = fragment {
                    debug!(
                        character = %character.name(),
                        agent = %response.agent(),
                        fragment = fragment.as_str(),
                        "Non-living character acts"
                    );
                    issues.push(CoherenceIssue::dead_character_action(
                        character.name().clone(),
                        character.vital_status(),
                        *response.agent(),
                        fragment.as_str(),
                    ));
                }
            }
        }
        CoherenceValidationResult::from_issues(issues)
    }

    /// Turns statement contradictions in the canonical fact set into issues.
    ///
    /// Other violation types reported by the checker are ignored. Returns a
    /// coherent result when no checker is configured.
    pub fn check_facts(&self, state: &CanonicalState) -> CoherenceValidationResult {
        match &self.checker {
            Some(checker) => CoherenceValidationResult::from_issues(
                checker
                    .contradictions(state)
                    .iter()
                    .filter(|v| *v.violation_type() == ViolationType::StatementContradiction)
                    .map(CoherenceIssue::from_violation)
                    .collect(),
            ),
            None => CoherenceValidationResult::coherent(),
        }
    }
}
