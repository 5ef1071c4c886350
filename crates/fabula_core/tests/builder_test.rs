use fabula_core::{
    CharacterId, CharacterState, IntentType, MetadataKey, NarrativeIntent, NarrativeSnapshot, PipelineContext,
    VitalStatus,
};
use fabula_error::{BuilderErrorKind, FabulaErrorKind};

#[test]
fn snapshot_requires_world_id() {
    let err = NarrativeSnapshot::builder().build().unwrap_err();
    match err.kind() {
        FabulaErrorKind::Builder(e) => {
            assert_eq!(
                e.kind(),
                &BuilderErrorKind::MissingField {
                    target: "NarrativeSnapshot",
                    field: "world_id".to_string()
                }
            )
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn snapshot_rejects_blank_world_id() {
    let err = NarrativeSnapshot::builder().world_id("  ").build().unwrap_err();
    match err.kind() {
        FabulaErrorKind::Builder(e) => {
            assert_eq!(e.target(), "NarrativeSnapshot");
            assert_eq!(e.field(), None);
            assert!(matches!(e.kind(), BuilderErrorKind::Rejected { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn context_requires_snapshot_and_intent() {
    let err = PipelineContext::builder()
        .intent(NarrativeIntent::new(IntentType::Continue))
        .build()
        .unwrap_err();
    assert!(matches!(err.kind(), FabulaErrorKind::Builder(_)));
}

#[test]
fn context_metadata_produces_new_value() -> anyhow::Result<()> {
    let snapshot = NarrativeSnapshot::builder()
        .world_id("eldoria")
        .characters(vec![CharacterState::new("bob", "Bob", VitalStatus::Alive)])
        .build()?;
    let context = PipelineContext::builder()
        .snapshot(snapshot)
        .intent(NarrativeIntent::new(IntentType::DescribeScene))
        .active_characters(vec![CharacterId::from("bob")])
        .build()?;

    let stamped = context.with_metadata(MetadataKey::Skipped, true);

    assert!(!context.metadata().contains(MetadataKey::Skipped));
    assert_eq!(stamped.metadata().get_bool(MetadataKey::Skipped), Some(true));
    assert_eq!(context.active_character_names(), vec!["Bob".to_string()]);
    Ok(())
}
