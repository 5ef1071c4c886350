//! Test utilities for fabula_pipeline tests.

#[allow(unused_imports)]
pub use fabula_interface::testing::{MockBackend, MockResponse};

use fabula_core::{
    CharacterState, IntentType, NarrativeIntent, NarrativeSnapshot, VitalStatus,
};
use fabula_pipeline::PipelineRequest;

/// Prose long enough to pass structural checks, with nobody dead acting.
#[allow(dead_code)]
pub const CLEAN_PROSE: &str = "Alice crossed the rope bridge as the storm rolled in.";

/// Prose in which dead Bob acts.
#[allow(dead_code)]
pub const DEAD_BOB_PROSE: &str = "Bob waved at the crowd from the tower.";

/// Snapshot with living Alice and dead Bob, both on stage.
#[allow(dead_code)]
pub fn snapshot() -> NarrativeSnapshot {
    NarrativeSnapshot::builder()
        .world_id("eldoria")
        .characters(vec![
            CharacterState::new("alice", "Alice", VitalStatus::Alive),
            CharacterState::new("bob", "Bob", VitalStatus::Dead),
        ])
        .active_characters(vec!["alice".into()])
        .recent_events(vec!["The king fell ill.".to_string()])
        .build()
        .unwrap()
}

/// Request to continue the story from [`snapshot`].
#[allow(dead_code)]
pub fn request() -> PipelineRequest {
    PipelineRequest::builder()
        .snapshot(snapshot())
        .intent(NarrativeIntent::new(IntentType::Continue))
        .build()
        .unwrap()
}
