//! Facts accumulated by the long-term memory aggregator.

use crate::MemoryLevel;
use chrono::{DateTime, Utc};
use fabula_error::{ConsistencyError, ConsistencyErrorKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// What a fact is about.
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
pub enum FactType {
    /// State of a character (alive, injured, location)
    CharacterState,
    /// State of a location
    LocationState,
    /// Relationship between entities
    Relationship,
    /// Something a character knows
    Knowledge,
    /// Something that happened
    Event,
    /// A recorded contradiction between other facts
    Contradiction,
}

impl FactType {
    /// Whether facts of this type must name at least one entity.
    pub fn requires_entities(&self) -> bool {
        matches!(
            self,
            FactType::CharacterState | FactType::LocationState | FactType::Relationship
        )
    }
}

/// A single accepted or candidate world fact.
///
/// # Examples
///
/// ```
/// use fabula_core::{Fact, FactType, MemoryLevel};
///
/// let fact = Fact::new("Bob died at the bridge", FactType::CharacterState, MemoryLevel::Chapter)
///     .with_entity("Bob")
///     .with_confidence(0.9);
/// assert!(fact.is_valid());
///
/// let orphan = Fact::new("Someone died", FactType::CharacterState, MemoryLevel::Chapter);
/// assert!(!orphan.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Fact {
    /// Unique identity
    id: Uuid,
    /// Statement text
    content: String,
    /// What the fact is about
    fact_type: FactType,
    /// Memory level the fact belongs to
    level: MemoryLevel,
    /// Names of referenced entities
    entities: BTreeSet<String>,
    /// Optional in-story time reference
    time_context: Option<String>,
    /// Confidence in [0, 1]
    confidence: f64,
    /// Where the fact came from
    source: Option<String>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
}

impl Fact {
    /// Creates a fact with full confidence and no entities.
    pub fn new(content: impl Into<String>, fact_type: FactType, level: MemoryLevel) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            fact_type,
            level,
            entities: BTreeSet::new(),
            time_context: None,
            confidence: 1.0,
            source: None,
            created_at: Utc::now(),
        }
    }

    /// Builder method to set the identity.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Builder method to reference one more entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entities.insert(entity.into());
        self
    }

    /// Builder method to set the confidence.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Builder method to set the in-story time reference.
    pub fn with_time_context(mut self, time_context: impl Into<String>) -> Self {
        self.time_context = Some(time_context.into());
        self
    }

    /// Builder method to set the source label.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether the fact names the entity (case-insensitive).
    pub fn references(&self, entity: &str) -> bool {
        self.entities.iter().any(|e| e.eq_ignore_ascii_case(entity))
    }

    /// Checks the fact's invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is blank, the confidence is outside
    /// [0, 1], or an entity-referencing fact names no entity.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConsistencyError> {
        let reason = if self.content.trim().is_empty() {
            Some("content is blank".to_string())
        } else if !(0.0..=1.0).contains(&self.confidence) {
            Some(format!("confidence {} is outside [0, 1]", self.confidence))
        } else if self.fact_type.requires_entities() && self.entities.is_empty() {
            Some(format!("{} fact references no entity", self.fact_type))
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConsistencyError::new(ConsistencyErrorKind::InvalidFact {
                id: self.id.to_string(),
                reason,
            })),
            None => Ok(()),
        }
    }

    /// Whether the fact satisfies its invariants.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
