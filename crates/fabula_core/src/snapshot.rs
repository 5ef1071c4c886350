//! Read-only snapshot of the long-lived narrative state.

use crate::{CharacterId, LocationId, builder_error};
use chrono::{DateTime, Utc};
use fabula_error::FabulaResult;
use serde::{Deserialize, Serialize};

/// Vital status of a character.
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
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VitalStatus {
    /// Alive and able to act
    Alive,
    /// Dead
    Dead,
    /// Alive but unable to act
    Unconscious,
    /// Whereabouts and condition unknown
    Missing,
}

impl VitalStatus {
    /// Whether the character can act or speak.
    pub fn is_alive(&self) -> bool {
        matches!(self, VitalStatus::Alive)
    }
}

/// One character as seen by the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct CharacterState {
    /// Character reference
    id: CharacterId,
    /// Display name used in prose
    name: String,
    /// Vital status
    vital_status: VitalStatus,
    /// Where the character currently is
    location: Option<LocationId>,
}

impl CharacterState {
    /// Creates a character state.
    pub fn new(id: impl Into<CharacterId>, name: impl Into<String>, vital_status: VitalStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vital_status,
            location: None,
        }
    }

    /// Builder method to place the character somewhere.
    pub fn with_location(mut self, location: impl Into<LocationId>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// World and story state consumed by one pipeline run.
///
/// # Examples
///
/// ```
/// use fabula_core::{CharacterState, NarrativeSnapshot, VitalStatus};
///
/// let snapshot = NarrativeSnapshot::builder()
///     .world_id("eldoria")
///     .characters(vec![
///         CharacterState::new("alice", "Alice", VitalStatus::Alive),
///         CharacterState::new("bob", "Bob", VitalStatus::Dead),
///     ])
///     .build()
///     .unwrap();
///
/// let fallen: Vec<_> = snapshot.non_living_characters().map(|c| c.name().as_str()).collect();
/// assert_eq!(fallen, vec!["Bob"]);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_builder::Builder,
    derive_getters::Getters,
)]
#[builder(
    setter(into),
    build_fn(private, name = "build_internal", validate = "Self::validate")
)]
pub struct NarrativeSnapshot {
    /// Owning world reference
    world_id: String,
    /// Every character known to the world
    #[builder(default)]
    characters: Vec<CharacterState>,
    /// Characters currently on stage
    #[builder(default)]
    active_characters: Vec<CharacterId>,
    /// Where the story currently takes place
    #[builder(default, setter(into, strip_option))]
    current_location: Option<LocationId>,
    /// Recent event descriptions, oldest first
    #[builder(default)]
    recent_events: Vec<String>,
    /// When the snapshot was taken
    #[builder(default = "Utc::now()")]
    taken_at: DateTime<Utc>,
}

impl NarrativeSnapshot {
    /// Creates a new snapshot builder.
    pub fn builder() -> NarrativeSnapshotBuilder {
        NarrativeSnapshotBuilder::default()
    }

    /// Looks up a character by reference.
    pub fn character(&self, id: &CharacterId) -> Option<&CharacterState> {
        self.characters.iter().find(|c| c.id() == id)
    }

    /// Characters that cannot act or speak.
    pub fn non_living_characters(&self) -> impl Iterator<Item = &CharacterState> {
        self.characters
            .iter()
            .filter(|c| !c.vital_status().is_alive())
    }
}

impl NarrativeSnapshotBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.world_id {
            Some(world_id) if world_id.trim().is_empty() => {
                Err("world id must not be blank".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Build the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the world id is missing or blank.
    pub fn build(&self) -> FabulaResult<NarrativeSnapshot> {
        Ok(self.build_internal().map_err(|e| builder_error("NarrativeSnapshot", e))?)
    }
}
