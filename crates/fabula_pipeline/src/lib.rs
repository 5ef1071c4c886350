//! Pipeline orchestration for the Fabula narrative engine.
//!
//! One run of the [`PipelineOrchestrator`] moves through six stages:
//!
//! 1. **BuildContext**: assemble the [`PipelineContext`](fabula_core::PipelineContext)
//!    from the state snapshot, the intent and any memory digests.
//! 2. **PreparePrompt**: resolve one template per agent and build a prompt set.
//! 3. **Generate**: dispatch the prompts through the agent executor.
//! 4. **Validate**: structural checks plus the narrative consistency validator.
//! 5. **Retry**: rewrite invalid output under the configured retry policy.
//! 6. **Integrate**: turn the final raw output into narrative output.
//!
//! Every stage is recorded in the returned
//! [`PipelineResult`](fabula_core::PipelineResult), whether the run succeeded
//! or not.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context_builder;
mod integrator;
mod metrics;
mod orchestrator;
mod request;
mod structural;
mod template;

pub use config::{PipelineConfig, PipelineSettings, ValidationSettings};
pub use context_builder::ContextBuilder;
pub use integrator::{ComposedNarrative, Integrator, extract_events};
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use orchestrator::PipelineOrchestrator;
pub use request::{PipelineRequest, PipelineRequestBuilder};
pub use structural::{StructuralRules, StructuralValidator};
pub use template::{DefaultTemplate, PromptTemplate, TemplateRegistry};
