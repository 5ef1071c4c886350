//! The complete record of one pipeline run.

use crate::{NarrativeOutput, PipelineContext, PipelineStage, PipelineStageResult, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Outcome of one pipeline run.
///
/// Only constructed through [`PipelineResult::success`] and
/// [`PipelineResult::failure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct PipelineResult {
    /// Unique identity
    id: Uuid,
    /// Context the run built, absent when context building failed
    context: Option<PipelineContext>,
    /// Integrated output
    output: Option<NarrativeOutput>,
    /// Overall success
    #[getter(skip)]
    success: bool,
    /// Top-level failure message
    error: Option<String>,
    /// Stage records in execution order
    stages: Vec<PipelineStageResult>,
    /// Wall-clock duration of the run
    total_duration: Duration,
    /// Attempts recorded by the retry engine, zero when it never ran
    retry_count: u32,
    /// When the run started
    started_at: DateTime<Utc>,
    /// When the run finished
    completed_at: DateTime<Utc>,
}

impl PipelineResult {
    /// A successful run.
    pub fn success(
        context: PipelineContext,
        output: NarrativeOutput,
        stages: Vec<PipelineStageResult>,
        retry_count: u32,
        started_at: DateTime<Utc>,
        total_duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            context: Some(context),
            output: Some(output),
            success: true,
            error: None,
            stages,
            total_duration,
            retry_count,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// A failed run. Output is kept when integration still produced one.
    pub fn failure(
        context: Option<PipelineContext>,
        output: Option<NarrativeOutput>,
        error: impl Into<String>,
        stages: Vec<PipelineStageResult>,
        retry_count: u32,
        started_at: DateTime<Utc>,
        total_duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            context,
            output,
            success: false,
            error: Some(error.into()),
            stages,
            total_duration,
            retry_count,
            started_at,
            completed_at: Utc::now(),
        }
    }

    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Record for one stage.
    pub fn stage(&self, stage: PipelineStage) -> Option<&PipelineStageResult> {
        self.stages.iter().find(|s| *s.stage() == stage)
    }

    /// Stages that failed.
    pub fn failed_stages(&self) -> impl Iterator<Item = &PipelineStageResult> {
        self.stages
            .iter()
            .filter(|s| *s.status() == StageStatus::Failed)
    }
}
