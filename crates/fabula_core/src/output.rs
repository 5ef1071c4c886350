//! Integrated narrative output and extracted events.

use crate::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event shapes the pipeline understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoryEvent {
    /// A character changed location
    CharacterMoved {
        /// Character name
        character: String,
        /// Destination
        to: String,
        /// Origin, when known
        #[serde(default)]
        from: Option<String>,
    },
    /// A character died
    CharacterDied {
        /// Character name
        character: String,
        /// Cause of death, when known
        #[serde(default)]
        cause: Option<String>,
    },
    /// An item changed hands
    ItemTransferred {
        /// Item name
        item: String,
        /// New holder
        to: String,
        /// Previous holder, when known
        #[serde(default)]
        from: Option<String>,
    },
    /// Two entities' relationship changed
    RelationshipChanged {
        /// First entity
        source: String,
        /// Second entity
        target: String,
        /// What changed
        change: String,
    },
    /// Something was discovered
    Discovery {
        /// What was discovered
        description: String,
    },
}

/// An event extracted from generated text.
///
/// Known shapes deserialize into [`StoryEvent`]; anything else is kept as an
/// opaque JSON payload.
///
/// # Examples
///
/// ```
/// use fabula_core::{NarrativeEvent, StoryEvent};
///
/// let known: NarrativeEvent =
///     serde_json::from_str(r#"{"type": "character_died", "character": "Bob"}"#).unwrap();
/// assert!(matches!(known, NarrativeEvent::Known(StoryEvent::CharacterDied { .. })));
///
/// let opaque: NarrativeEvent = serde_json::from_str(r#"{"type": "weather", "rain": true}"#).unwrap();
/// assert!(matches!(opaque, NarrativeEvent::Opaque(_)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NarrativeEvent {
    /// A recognised event shape
    Known(StoryEvent),
    /// Any other payload
    Opaque(serde_json::Value),
}

/// Final narrative text produced by the integration stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct NarrativeOutput {
    /// Unique identity
    id: Uuid,
    /// Integrated prose
    text: String,
    /// Structured events found in the generated text
    events: Vec<NarrativeEvent>,
    /// Generation metadata
    metadata: Metadata,
    /// When the output was integrated
    generated_at: DateTime<Utc>,
}

impl NarrativeOutput {
    /// Creates an output stamped now.
    pub fn new(text: impl Into<String>, events: Vec<NarrativeEvent>, metadata: Metadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            events,
            metadata,
            generated_at: Utc::now(),
        }
    }
}
