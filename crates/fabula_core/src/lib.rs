//! Core data types for the Fabula narrative pipeline.
//!
//! This crate provides the value types shared by every stage of a pipeline run:
//! intents, state snapshots, facts, prompts, agent responses, validation results
//! and the stage-by-stage pipeline result record.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod agent;
mod canonical;
mod context;
mod fact;
mod generation;
mod ids;
mod intent;
mod memory;
mod metadata;
mod output;
mod response;
mod result;
mod snapshot;
mod stage;
mod validation;
mod violation;

pub use agent::{AgentKind, AgentPrompt, ExecutionOrder, PromptPriority, PromptSet};
pub use canonical::CanonicalState;
pub use context::{PipelineContext, PipelineContextBuilder};
pub use fact::{Fact, FactType};
pub use generation::{GenerationParameters, GenerationRequest, GenerationResponse};
pub use ids::{CharacterId, LocationId};
pub use intent::{IntentType, NarrativeIntent, NarrativeIntentBuilder};
pub use memory::{MemoryDigest, MemoryLevel};
pub use metadata::{Metadata, MetadataKey, MetadataValue};
pub use output::{NarrativeEvent, NarrativeOutput, StoryEvent};
pub use response::{AgentResponse, RawOutput};
pub use result::PipelineResult;
pub use snapshot::{CharacterState, NarrativeSnapshot, NarrativeSnapshotBuilder, VitalStatus};
pub use stage::{PipelineStage, PipelineStageResult, StageStatus};
pub use validation::{ValidationError, ValidationResult, ValidationSeverity, ValidationWarning};
pub use violation::{CoherenceViolation, ViolationSeverity, ViolationType};

use fabula_error::BuilderError;

/// Convert a derive_builder failure for `target` into a [`BuilderError`].
///
/// Uninitialized required fields become missing-field errors; anything the
/// builder's own validation refused becomes a rejection.
#[track_caller]
pub(crate) fn builder_error(target: &'static str, message: impl std::fmt::Display) -> BuilderError {
    let message = message.to_string();
    match message
        .strip_suffix(" must be initialized")
        .map(|field| field.trim_matches('`'))
    {
        Some(field) => BuilderError::missing(target, field),
        None => BuilderError::rejected(target, message),
    }
}
