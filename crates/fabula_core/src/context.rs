//! The per-run pipeline context.

use crate::{
    CanonicalState, CharacterId, LocationId, MemoryDigest, MemoryLevel, Metadata, MetadataKey,
    MetadataValue, NarrativeIntent, NarrativeSnapshot, builder_error,
};
use chrono::{DateTime, Utc};
use fabula_error::FabulaResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Everything later stages need to know about one run.
///
/// Built once per run; later stages only read it. Adding metadata produces a
/// new context value.
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
pub struct PipelineContext {
    /// Unique identity
    #[builder(default = "Uuid::new_v4()")]
    id: Uuid,
    /// World and story state snapshot
    snapshot: Arc<NarrativeSnapshot>,
    /// Intent being realized
    intent: NarrativeIntent,
    /// Most recent memory digest
    #[builder(default, setter(into, strip_option))]
    latest_memory: Option<MemoryDigest>,
    /// Canonical fact set snapshot
    #[builder(default, setter(into, strip_option))]
    canonical_state: Option<Arc<CanonicalState>>,
    /// Summary text per memory level
    #[builder(default)]
    memory_summaries: BTreeMap<MemoryLevel, String>,
    /// Characters on stage
    #[builder(default)]
    active_characters: Vec<CharacterId>,
    /// Where the story takes place
    #[builder(default, setter(into, strip_option))]
    current_location: Option<LocationId>,
    /// Extra information stamped by stages
    #[builder(default)]
    metadata: Metadata,
    /// Creation timestamp
    #[builder(default = "Utc::now()")]
    created_at: DateTime<Utc>,
}

impl PipelineContext {
    /// Creates a new context builder.
    pub fn builder() -> PipelineContextBuilder {
        PipelineContextBuilder::default()
    }

    /// Returns a new context carrying one more metadata entry.
    pub fn with_metadata(&self, key: MetadataKey, value: impl Into<MetadataValue>) -> Self {
        let mut next = self.clone();
        next.metadata.insert(key, value);
        next
    }

    /// Whether any memory input is available.
    pub fn has_memory(&self) -> bool {
        self.latest_memory.is_some() || !self.memory_summaries.is_empty()
    }

    /// Display names of the active characters, falling back to their ids.
    pub fn active_character_names(&self) -> Vec<String> {
        self.active_characters
            .iter()
            .map(|id| {
                self.snapshot
                    .character(id)
                    .map(|c| c.name().clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect()
    }
}

impl PipelineContextBuilder {
    /// Build the context.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot or intent is missing.
    pub fn build(&self) -> FabulaResult<PipelineContext> {
        Ok(self.build_internal().map_err(|e| builder_error("PipelineContext", e))?)
    }
}
