//! Pipeline stages and their recorded outcomes.

use crate::Metadata;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The stages of one pipeline run, in execution order.
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
pub enum PipelineStage {
    /// Assemble the pipeline context
    BuildContext,
    /// Resolve templates into a prompt set
    PreparePrompt,
    /// Dispatch prompts to agents
    Generate,
    /// Structural and consistency checks
    Validate,
    /// Rewrite loop over invalid output
    Retry,
    /// Turn raw output into narrative output
    Integrate,
}

/// Lifecycle status of a stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum StageStatus {
    /// Not started
    Pending,
    /// In progress
    Running,
    /// Finished normally
    Completed,
    /// Finished with an error
    Failed,
    /// Not needed for this run
    Skipped,
}

/// What happened in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PipelineStageResult {
    /// Which stage
    stage: PipelineStage,
    /// Final status
    status: StageStatus,
    /// Time spent in the stage
    duration: Duration,
    /// Failure message
    error: Option<String>,
    /// Stage output summary
    output: Metadata,
}

impl PipelineStageResult {
    /// A stage that finished normally.
    pub fn completed(stage: PipelineStage, duration: Duration, output: Metadata) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            duration,
            error: None,
            output,
        }
    }

    /// A stage that failed.
    pub fn failed(stage: PipelineStage, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            duration,
            error: Some(error.into()),
            output: Metadata::new(),
        }
    }

    /// A stage that was not needed.
    pub fn skipped(stage: PipelineStage) -> Self {
        Self {
            stage,
            status: StageStatus::Skipped,
            duration: Duration::ZERO,
            error: None,
            output: Metadata::new(),
        }
    }

    /// Builder method to attach output data to any status.
    pub fn with_output(mut self, output: Metadata) -> Self {
        self.output = output;
        self
    }
}
