//! Caller input for one pipeline run.

use fabula_core::{
    AgentKind, CanonicalState, ExecutionOrder, MemoryDigest, NarrativeIntent, NarrativeSnapshot,
};
use fabula_error::{BuilderError, FabulaResult};
use std::sync::Arc;

/// Everything the caller supplies for one run.
///
/// The state snapshot and the intent are required; building without either
/// fails before any stage can run. An agent override, when given, must name
/// at least one agent.
///
/// # Examples
///
/// ```
/// use fabula_core::{IntentType, NarrativeIntent, NarrativeSnapshot};
/// use fabula_pipeline::PipelineRequest;
///
/// let request = PipelineRequest::builder()
///     .snapshot(NarrativeSnapshot::builder().world_id("eldoria").build().unwrap())
///     .intent(NarrativeIntent::new(IntentType::Continue))
///     .build()
///     .unwrap();
/// assert!(request.memories().is_empty());
///
/// let missing = PipelineRequest::builder()
///     .intent(NarrativeIntent::new(IntentType::Continue))
///     .build();
/// assert!(missing.is_err());
/// ```
#[derive(Debug, Clone, derive_builder::Builder, derive_getters::Getters)]
#[builder(
    setter(into),
    build_fn(private, name = "build_internal", validate = "Self::validate")
)]
pub struct PipelineRequest {
    /// World and story state
    snapshot: Arc<NarrativeSnapshot>,
    /// Intent to realize
    intent: NarrativeIntent,
    /// Memory digests available to the run
    #[builder(default)]
    memories: Vec<MemoryDigest>,
    /// Canonical fact set snapshot
    #[builder(default, setter(into, strip_option))]
    canonical_state: Option<Arc<CanonicalState>>,
    /// Agents to run instead of the configured defaults
    #[builder(default, setter(into, strip_option))]
    agents: Option<Vec<AgentKind>>,
    /// Execution order instead of the configured default
    #[builder(default, setter(into, strip_option))]
    execution_order: Option<ExecutionOrder>,
}

impl PipelineRequest {
    /// Creates a new request builder.
    pub fn builder() -> PipelineRequestBuilder {
        PipelineRequestBuilder::default()
    }
}

impl PipelineRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.agents {
            Some(Some(agents)) if agents.is_empty() => {
                Err("agent override must name at least one agent".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// Returns a missing-field error if the snapshot or intent was not set,
    /// and a rejection if the agent override is empty.
    pub fn build(&self) -> FabulaResult<PipelineRequest> {
        self.build_internal().map_err(|e| {
            let error = match e {
                PipelineRequestBuilderError::UninitializedField(field) => {
                    BuilderError::missing("PipelineRequest", field)
                }
                PipelineRequestBuilderError::ValidationError(reason) => {
                    BuilderError::rejected("PipelineRequest", reason)
                }
            };
            error.into()
        })
    }
}
