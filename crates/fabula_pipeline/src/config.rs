//! Pipeline configuration sections.

use crate::StructuralRules;
use fabula_core::{AgentKind, ExecutionOrder, GenerationParameters};
use fabula_retry::RetryPolicyConfig;
use serde::{Deserialize, Serialize};

/// Run-shape defaults applied when a request does not override them.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct PipelineSettings {
    /// Dispatch topology for prompt sets
    default_execution_order: ExecutionOrder,
    /// Agents prompted on every run
    agents: Vec<AgentKind>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_execution_order: ExecutionOrder::Sequential,
            agents: vec![AgentKind::Narrator],
        }
    }
}

/// Validation thresholds and consistency patterns.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct ValidationSettings {
    /// Structural thresholds
    #[serde(flatten)]
    structural: StructuralRules,
    /// Action pattern templates replacing the built-in set
    #[setters(strip_option)]
    action_patterns: Option<Vec<String>>,
}

/// Everything the orchestrator reads from configuration.
///
/// # Examples
///
/// ```
/// use fabula_core::ExecutionOrder;
/// use fabula_pipeline::PipelineConfig;
///
/// let config: PipelineConfig = toml::from_str(r#"
///     [retry]
///     kind = "simple"
///     max_retries = 3
///
///     [pipeline]
///     default_execution_order = "parallel"
/// "#).unwrap();
///
/// assert_eq!(*config.pipeline().default_execution_order(), ExecutionOrder::Parallel);
/// assert_eq!(*config.validation().structural().min_length(), 10);
/// ```
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct PipelineConfig {
    /// Sampling parameters for every agent call
    generation: GenerationParameters,
    /// Retry policy for invalid output
    retry: RetryPolicyConfig,
    /// Validation settings
    validation: ValidationSettings,
    /// Run-shape defaults
    pipeline: PipelineSettings,
}
