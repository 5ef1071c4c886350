//! Narrative intents: the caller's declared goal for one pipeline run.

use crate::{CharacterId, LocationId, builder_error};
use chrono::{DateTime, Utc};
use fabula_error::FabulaResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// What kind of text the caller wants.
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
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentType {
    /// Continue the story from where it stands
    Continue,
    /// Introduce a new event into the scene
    IntroduceEvent,
    /// Produce dialogue between characters
    GenerateDialogue,
    /// Describe the current scene
    DescribeScene,
    /// Summarize what has happened
    Summarize,
    /// Raise the stakes
    CreateTension,
    /// Bring an open conflict to a close
    ResolveConflict,
}

impl IntentType {
    /// Short instruction describing the intent to a generation agent.
    pub fn instruction(&self) -> &'static str {
        match self {
            IntentType::Continue => "Continue the narrative from the current moment.",
            IntentType::IntroduceEvent => "Introduce a new event that changes the situation.",
            IntentType::GenerateDialogue => "Write dialogue between the characters present.",
            IntentType::DescribeScene => "Describe the current scene in vivid detail.",
            IntentType::Summarize => "Summarize the story so far.",
            IntentType::CreateTension => "Raise the tension of the current scene.",
            IntentType::ResolveConflict => "Resolve the conflict the characters are facing.",
        }
    }
}

/// The caller's declared narrative goal. Immutable once built.
///
/// # Examples
///
/// ```
/// use fabula_core::{IntentType, NarrativeIntent};
///
/// let intent = NarrativeIntent::builder()
///     .intent_type(IntentType::GenerateDialogue)
///     .description("Alice confronts Bob")
///     .target_characters(vec!["alice".into(), "bob".into()])
///     .build()
///     .unwrap();
///
/// assert_eq!(*intent.intent_type(), IntentType::GenerateDialogue);
/// assert_eq!(intent.target_characters().len(), 2);
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
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct NarrativeIntent {
    /// Unique identity
    #[builder(default = "Uuid::new_v4()")]
    id: Uuid,
    /// What kind of text is requested
    intent_type: IntentType,
    /// Optional free-text elaboration
    #[builder(default, setter(into, strip_option))]
    description: Option<String>,
    /// Characters the text should focus on
    #[builder(default)]
    target_characters: Vec<CharacterId>,
    /// Location the text should focus on
    #[builder(default, setter(into, strip_option))]
    target_location: Option<LocationId>,
    /// Caller-supplied parameters passed through to templates
    #[builder(default)]
    parameters: BTreeMap<String, serde_json::Value>,
    /// Creation timestamp
    #[builder(default = "Utc::now()")]
    created_at: DateTime<Utc>,
}

impl NarrativeIntent {
    /// Creates a new intent builder.
    pub fn builder() -> NarrativeIntentBuilder {
        NarrativeIntentBuilder::default()
    }

    /// Creates an intent of the given type with no targets.
    pub fn new(intent_type: IntentType) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent_type,
            description: None,
            target_characters: Vec::new(),
            target_location: None,
            parameters: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Looks up a caller-supplied parameter as text.
    pub fn parameter_str(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).and_then(|value| value.as_str())
    }
}

impl NarrativeIntentBuilder {
    /// Build the intent.
    ///
    /// # Errors
    ///
    /// Returns an error if the intent type is missing.
    pub fn build(&self) -> FabulaResult<NarrativeIntent> {
        Ok(self.build_internal().map_err(|e| builder_error("NarrativeIntent", e))?)
    }
}
