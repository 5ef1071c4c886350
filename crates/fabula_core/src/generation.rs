//! Request and response types at the generation back end boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Sampling parameters sent with every generation call.
///
/// # Examples
///
/// ```
/// use fabula_core::GenerationParameters;
///
/// let params = GenerationParameters::default().with_temperature(0.2);
/// assert_eq!(*params.temperature(), 0.2);
/// assert_eq!(*params.max_tokens(), 1024);
/// assert_eq!(*params.top_p(), 0.9);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct GenerationParameters {
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    temperature: f32,
    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    max_tokens: u32,
    /// Nucleus sampling threshold
    #[serde(default = "default_top_p")]
    top_p: f32,
    /// Sequences that stop generation
    #[serde(default)]
    stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_top_p() -> f32 {
    0.9
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            stop_sequences: Vec::new(),
        }
    }
}

/// One call to the generation back end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct GenerationRequest {
    /// System instruction text
    system: String,
    /// User instruction text
    user: String,
    /// Sampling parameters
    parameters: GenerationParameters,
}

impl GenerationRequest {
    /// Creates a request.
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        parameters: GenerationParameters,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            parameters,
        }
    }
}

/// Successful result of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct GenerationResponse {
    /// Generated text
    text: String,
    /// Tokens consumed by the prompt
    prompt_tokens: u32,
    /// Tokens produced by the completion
    completion_tokens: u32,
    /// Time the back end spent on the call
    elapsed: Duration,
    /// Provider-specific metadata
    provider_metadata: HashMap<String, serde_json::Value>,
}

impl GenerationResponse {
    /// Creates a response.
    pub fn new(
        text: impl Into<String>,
        prompt_tokens: u32,
        completion_tokens: u32,
        elapsed: Duration,
    ) -> Self {
        Self {
            text: text.into(),
            prompt_tokens,
            completion_tokens,
            elapsed,
            provider_metadata: HashMap::new(),
        }
    }

    /// Builder method to attach provider metadata.
    pub fn with_provider_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.provider_metadata.insert(key.into(), value);
        self
    }

    /// Prompt plus completion tokens.
    pub fn tokens_used(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}
