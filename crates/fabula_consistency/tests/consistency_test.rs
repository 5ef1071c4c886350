use fabula_consistency::{
    ActionPatterns, CoherenceValidationResult, IssueType, NarrativeConsistencyValidator,
    VitalStatusContradictionChecker,
};
use fabula_core::{
    AgentKind, AgentResponse, CanonicalState, CharacterState, CoherenceViolation, Fact, FactType,
    IntentType, MemoryLevel, NarrativeIntent, NarrativeSnapshot, PipelineContext, RawOutput,
    ValidationSeverity, ViolationSeverity, ViolationType, VitalStatus,
};
use fabula_interface::ContradictionChecker;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn context_with(characters: Vec<CharacterState>, state: Option<CanonicalState>) -> PipelineContext {
    let snapshot = NarrativeSnapshot::builder()
        .world_id("eldoria")
        .characters(characters)
        .build()
        .expect("valid snapshot");
    let mut builder = PipelineContext::builder();
    builder
        .snapshot(snapshot)
        .intent(NarrativeIntent::new(IntentType::Continue));
    if let Some(state) = state {
        builder.canonical_state(state);
    }
    builder.build().expect("valid context")
}

fn narrated(text: &str) -> RawOutput {
    RawOutput::new(
        vec![AgentResponse::completed(AgentKind::Narrator, text, Duration::from_millis(5))],
        Duration::from_millis(5),
    )
}

fn dead_bob() -> Vec<CharacterState> {
    vec![
        CharacterState::new("bob", "Bob", VitalStatus::Dead),
        CharacterState::new("alice", "Alice", VitalStatus::Alive),
    ]
}

#[test]
fn dead_character_acting_is_incoherent() {
    let validator = NarrativeConsistencyValidator::new();
    let context = context_with(dead_bob(), None);

    let result = validator.validate(&narrated("Bob walked into the room and smiled."), &context);

    assert!(!result.is_coherent());
    assert!(result.has_errors());
    let issue = &result.issues()[0];
    assert_eq!(*issue.issue_type(), IssueType::DeadCharacterAction);
    assert_eq!(issue.issue_type().to_string(), "dead character action");
    assert_eq!(issue.character().as_deref(), Some("Bob"));
    assert!(issue.description().contains("Bob"));
}

#[test]
fn passive_mention_is_coherent() {
    let validator = NarrativeConsistencyValidator::new();
    let context = context_with(dead_bob(), None);

    let result = validator.validate(&narrated("Everyone remembered Bob."), &context);

    assert!(result.is_coherent());
    assert!(result.issues().is_empty());
}

#[test]
fn living_characters_may_act() {
    let validator = NarrativeConsistencyValidator::new();
    let context = context_with(dead_bob(), None);

    let result = validator.validate(&narrated("Alice walked to Bob's grave."), &context);

    assert!(result.is_coherent());
}

#[test]
fn failed_and_skipped_responses_are_ignored() {
    let validator = NarrativeConsistencyValidator::new();
    let context = context_with(dead_bob(), None);
    let output = RawOutput::new(
        vec![
            AgentResponse::failed(AgentKind::Narrator, "Bob walked", Duration::ZERO),
            AgentResponse::skipped(AgentKind::Summary),
        ],
        Duration::ZERO,
    );

    assert!(validator.validate(&output, &context).is_coherent());
}

#[test]
fn custom_patterns_replace_defaults() -> anyhow::Result<()> {
    let validator = NarrativeConsistencyValidator::new()
        .with_patterns(ActionPatterns::new([r"\b{name}\s+sang\b"])?);
    let context = context_with(dead_bob(), None);

    assert!(!validator.validate(&narrated("Bob sang softly."), &context).is_coherent());
    assert!(validator.validate(&narrated("Bob walked."), &context).is_coherent());
    Ok(())
}

#[test]
fn fact_contradictions_become_issues() -> anyhow::Result<()> {
    let mut state = CanonicalState::new("eldoria", MemoryLevel::World);
    state.add_facts(vec![
        Fact::new("Bob was slain by the wyrm", FactType::CharacterState, MemoryLevel::World)
            .with_entity("Bob"),
        Fact::new("Bob is alive", FactType::CharacterState, MemoryLevel::World).with_entity("Bob"),
        Fact::new("Alice lives in the tower", FactType::CharacterState, MemoryLevel::World)
            .with_entity("Alice"),
    ])?;
    let validator =
        NarrativeConsistencyValidator::new().with_checker(Arc::new(VitalStatusContradictionChecker));
    let context = context_with(dead_bob(), Some(state));

    let result = validator.validate(&narrated("The wind howled over the moor."), &context);

    assert!(!result.is_coherent());
    assert_eq!(result.issues().len(), 1);
    let issue = &result.issues()[0];
    assert_eq!(*issue.issue_type(), IssueType::FactContradiction);
    assert_eq!(issue.fact_ids().len(), 2);
    Ok(())
}

struct ResolvedContradiction;

impl ContradictionChecker for ResolvedContradiction {
    fn contradictions(&self, _state: &CanonicalState) -> Vec<CoherenceViolation> {
        vec![
            CoherenceViolation::new(
                ViolationType::StatementContradiction,
                ViolationSeverity::Error,
                "The siege ended before it began",
                [Uuid::new_v4()],
            )
            .resolve("The first siege was a feint"),
            CoherenceViolation::new(
                ViolationType::StatementContradiction,
                ViolationSeverity::Warning,
                "Alice is in two towns",
                [Uuid::new_v4()],
            ),
        ]
    }
}

#[test]
fn resolved_and_warning_issues_do_not_block() {
    let validator =
        NarrativeConsistencyValidator::new().with_checker(Arc::new(ResolvedContradiction));
    let state = CanonicalState::new("eldoria", MemoryLevel::World);
    let context = context_with(dead_bob(), Some(state));

    let result = validator.validate(&narrated("Rain fell."), &context);

    assert!(result.is_coherent());
    assert!(result.has_errors());
    assert!(result.has_warnings());
    assert_eq!(result.blocking_issues().count(), 0);
    assert_eq!(
        result.issues()[0].resolution().as_deref(),
        Some("The first siege was a feint")
    );

    let validation = result.to_validation_result();
    assert!(validation.is_valid());
    assert_eq!(validation.warnings().len(), 2);
}

struct OutOfOrderEvents;

impl ContradictionChecker for OutOfOrderEvents {
    fn contradictions(&self, _state: &CanonicalState) -> Vec<CoherenceViolation> {
        [
            ViolationType::SequenceViolation,
            ViolationType::EntityInconsistency,
            ViolationType::LocationInconsistency,
        ]
        .into_iter()
        .map(|kind| {
            CoherenceViolation::new(
                kind,
                ViolationSeverity::Error,
                "event order is off",
                [Uuid::new_v4()],
            )
        })
        .collect()
    }
}

#[test]
fn only_statement_contradictions_become_issues() {
    let validator = NarrativeConsistencyValidator::new().with_checker(Arc::new(OutOfOrderEvents));
    let state = CanonicalState::new("eldoria", MemoryLevel::World);
    let context = context_with(dead_bob(), Some(state));

    let result = validator.validate(&narrated("Alice walked home."), &context);

    assert!(result.is_coherent());
    assert!(result.issues().is_empty());
}

#[test]
fn checker_is_skipped_without_canonical_state() {
    let validator =
        NarrativeConsistencyValidator::new().with_checker(Arc::new(ResolvedContradiction));
    let context = context_with(dead_bob(), None);

    let result = validator.validate(&narrated("Rain fell."), &context);
    assert!(result.issues().is_empty());
}

#[test]
fn merge_requires_both_coherent() {
    let validator = NarrativeConsistencyValidator::new();
    let context = context_with(dead_bob(), None);
    let bad = validator.validate(&narrated("Bob smiled."), &context);

    let merged = CoherenceValidationResult::coherent().merge(bad);
    assert!(!merged.is_coherent());
    assert_eq!(merged.issues().len(), 1);

    let validation = merged.to_validation_result();
    assert!(!validation.is_valid());
    assert_eq!(*validation.errors()[0].severity(), ValidationSeverity::Critical);
}
