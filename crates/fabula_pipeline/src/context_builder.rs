//! The BuildContext stage.

use crate::PipelineRequest;
use chrono::Utc;
use fabula_core::{CharacterId, Metadata, MetadataKey, PipelineContext};
use fabula_error::FabulaResult;
use std::collections::BTreeMap;
use tracing::debug;

/// Assembles the per-run context from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextBuilder;

impl ContextBuilder {
    /// Creates a context builder.
    pub fn new() -> Self {
        Self
    }

    /// Builds the context and stamps it with build metadata.
    ///
    /// The newest digest becomes the latest memory and the newest digest per
    /// level becomes that level's summary. Active characters are the
    /// snapshot's plus the intent's targets; the intent's target location
    /// overrides the snapshot's current location.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be assembled.
    pub fn build(&self, request: &PipelineRequest) -> FabulaResult<PipelineContext> {
        let snapshot = request.snapshot();
        let intent = request.intent();

        let mut digests: Vec<_> = request.memories().iter().collect();
        digests.sort_by_key(|d| *d.created_at());
        let latest_memory = digests.last().map(|d| (*d).clone());
        let memory_summaries: BTreeMap<_, _> = digests
            .iter()
            .map(|d| (*d.level(), d.summary().clone()))
            .collect();

        let mut active_characters: Vec<CharacterId> = snapshot.active_characters().clone();
        for target in intent.target_characters() {
            if !active_characters.contains(target) {
                active_characters.push(target.clone());
            }
        }

        let current_location = intent
            .target_location()
            .clone()
            .or_else(|| snapshot.current_location().clone());

        let memory_available = latest_memory.is_some();
        let mut metadata = Metadata::new()
            .with(MetadataKey::BuildTimestamp, Utc::now())
            .with(MetadataKey::MemoryAvailable, memory_available)
            .with(MetadataKey::IntentType, intent.intent_type().to_string());
        if let Some(state) = request.canonical_state() {
            metadata.insert(MetadataKey::CanonicalVersion, *state.version());
        }

        let mut builder = PipelineContext::builder();
        builder
            .snapshot(snapshot.clone())
            .intent(intent.clone())
            .memory_summaries(memory_summaries)
            .active_characters(active_characters)
            .metadata(metadata);
        if let Some(memory) = latest_memory {
            builder.latest_memory(memory);
        }
        if let Some(state) = request.canonical_state() {
            builder.canonical_state(state.clone());
        }
        if let Some(location) = current_location {
            builder.current_location(location);
        }
        let context = builder.build()?;

        debug!(
            context = %context.id(),
            memory_available,
            active = context.active_characters().len(),
            "Context built"
        );
        Ok(context)
    }
}
