//! Agent responses and the raw output of one execution pass.

use crate::{AgentKind, Metadata, MetadataKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Outcome of one agent call.
///
/// A skipped response is a success with empty content carrying
/// [`MetadataKey::Skipped`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AgentResponse {
    /// Agent that produced the response
    agent: AgentKind,
    /// Generated text, possibly empty
    content: String,
    /// Whether the call succeeded
    #[getter(skip)]
    success: bool,
    /// Failure message
    error: Option<String>,
    /// Elapsed time of the call
    duration: Duration,
    /// Metadata read by pipeline components
    metadata: Metadata,
    /// Metadata passed through from the generation provider
    provider_metadata: HashMap<String, serde_json::Value>,
}

impl AgentResponse {
    /// Creates a successful response.
    pub fn completed(agent: AgentKind, content: impl Into<String>, duration: Duration) -> Self {
        Self {
            agent,
            content: content.into(),
            success: true,
            error: None,
            duration,
            metadata: Metadata::new(),
            provider_metadata: HashMap::new(),
        }
    }

    /// Creates a failed response.
    pub fn failed(agent: AgentKind, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            agent,
            content: String::new(),
            success: false,
            error: Some(error.into()),
            duration,
            metadata: Metadata::new(),
            provider_metadata: HashMap::new(),
        }
    }

    /// Creates a response for a prompt that was not executed.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabula_core::{AgentKind, AgentResponse};
    ///
    /// let skipped = AgentResponse::skipped(AgentKind::Summary);
    /// assert!(skipped.is_success());
    /// assert!(skipped.is_skipped());
    /// assert!(skipped.content().is_empty());
    /// ```
    pub fn skipped(agent: AgentKind) -> Self {
        Self::completed(agent, String::new(), Duration::ZERO).with_metadata(MetadataKey::Skipped, true)
    }

    /// Builder method to add a metadata entry.
    pub fn with_metadata(
        mut self,
        key: MetadataKey,
        value: impl Into<crate::MetadataValue>,
    ) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Builder method to attach provider metadata.
    pub fn with_provider_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.provider_metadata = metadata;
        self
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Whether the prompt was skipped rather than executed.
    pub fn is_skipped(&self) -> bool {
        self.metadata.get_bool(MetadataKey::Skipped).unwrap_or(false)
    }

    /// Whether the response carries usable text.
    pub fn has_content(&self) -> bool {
        self.success && !self.content.trim().is_empty()
    }
}

/// Every agent response from one execution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct RawOutput {
    /// Responses in prompt order
    responses: Vec<AgentResponse>,
    /// Wall-clock duration of the pass
    total_duration: Duration,
}

impl RawOutput {
    /// Creates a raw output.
    pub fn new(responses: Vec<AgentResponse>, total_duration: Duration) -> Self {
        Self {
            responses,
            total_duration,
        }
    }

    /// First response produced by the agent.
    pub fn response_for(&self, agent: AgentKind) -> Option<&AgentResponse> {
        self.responses.iter().find(|r| *r.agent() == agent)
    }

    /// Responses that failed.
    pub fn failed(&self) -> impl Iterator<Item = &AgentResponse> {
        self.responses.iter().filter(|r| !r.is_success())
    }

    /// Whether every response succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.responses.iter().all(AgentResponse::is_success)
    }

    /// Number of responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Whether the pass produced no responses.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
