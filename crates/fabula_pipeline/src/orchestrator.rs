//! The pipeline state machine.

use crate::{
    ContextBuilder, Integrator, PipelineConfig, PipelineMetrics, PipelineRequest,
    PipelineSettings, StructuralValidator, TemplateRegistry,
};
use chrono::{DateTime, Utc};
use fabula_agents::AgentExecutor;
use fabula_consistency::{ActionPatterns, NarrativeConsistencyValidator};
use fabula_core::{
    Metadata, MetadataKey, PipelineContext, PipelineResult, PipelineStage, PipelineStageResult,
    RawOutput, ValidationResult,
};
use fabula_error::{FabulaError, FabulaResult, PipelineError, PipelineErrorKind};
use fabula_interface::{ContradictionChecker, GenerationBackend, HealthStatus};
use fabula_retry::{RetryEngine, RetryPolicy};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Stage records collected during one run.
struct RunLog {
    stages: Vec<PipelineStageResult>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunLog {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    fn push(&mut self, result: PipelineStageResult) {
        debug!(
            stage = %result.stage(),
            status = %result.status(),
            duration_ms = result.duration().as_millis() as u64,
            "Stage finished"
        );
        self.stages.push(result);
    }

    fn fail(
        mut self,
        context: Option<PipelineContext>,
        stage: PipelineStage,
        stage_started: Instant,
        message: String,
    ) -> PipelineResult {
        warn!(stage = %stage, error = %message, "Fatal stage failure");
        self.push(PipelineStageResult::failed(
            stage,
            stage_started.elapsed(),
            message.clone(),
        ));
        let total = self.started.elapsed();
        PipelineResult::failure(context, None, message, self.stages, 0, self.started_at, total)
    }
}

/// Drives one narrative request through every pipeline stage.
///
/// The orchestrator owns no per-run state, so one instance can serve many
/// concurrent runs.
///
/// # Examples
///
/// ```no_run
/// use fabula_core::{IntentType, NarrativeIntent, NarrativeSnapshot};
/// use fabula_interface::GenerationBackend;
/// use fabula_pipeline::{PipelineConfig, PipelineOrchestrator, PipelineRequest};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(backend: impl GenerationBackend) -> fabula_error::FabulaResult<()> {
/// let orchestrator = PipelineOrchestrator::new(backend, &PipelineConfig::default())?;
/// let request = PipelineRequest::builder()
///     .snapshot(NarrativeSnapshot::builder().world_id("eldoria").build()?)
///     .intent(NarrativeIntent::new(IntentType::Continue))
///     .build()?;
///
/// let result = orchestrator.run(&request, &CancellationToken::new()).await?;
/// if let Some(output) = result.output() {
///     println!("{}", output.text());
/// }
/// # Ok(())
/// # }
/// ```
pub struct PipelineOrchestrator<B> {
    executor: AgentExecutor<B>,
    registry: Arc<TemplateRegistry>,
    structural: StructuralValidator,
    consistency: NarrativeConsistencyValidator,
    retry: RetryEngine,
    integrator: Integrator,
    context_builder: ContextBuilder,
    settings: PipelineSettings,
    metrics: PipelineMetrics,
}

impl<B: GenerationBackend> PipelineOrchestrator<B> {
    /// Creates an orchestrator from configuration, with the default templates.
    ///
    /// # Errors
    ///
    /// Returns an error if the retry policy or the action patterns in the
    /// configuration are invalid.
    pub fn new(backend: B, config: &PipelineConfig) -> FabulaResult<Self> {
        let consistency = match config.validation().action_patterns() {
            Some(templates) => NarrativeConsistencyValidator::new()
                .with_patterns(ActionPatterns::new(templates.iter())?),
            None => NarrativeConsistencyValidator::new(),
        };
        Ok(Self {
            executor: AgentExecutor::new(backend).with_parameters(config.generation().clone()),
            registry: Arc::new(TemplateRegistry::with_defaults()),
            structural: StructuralValidator::new(config.validation().structural().clone()),
            consistency,
            retry: RetryEngine::new(config.retry().clone().into_policy()?),
            integrator: Integrator::new(),
            context_builder: ContextBuilder::new(),
            settings: config.pipeline().clone(),
            metrics: PipelineMetrics::new(),
        })
    }

    /// Builder method to share a template registry.
    pub fn with_registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Builder method to add a fact-level contradiction checker.
    pub fn with_checker(mut self, checker: Arc<dyn ContradictionChecker>) -> Self {
        self.consistency = self.consistency.with_checker(checker);
        self
    }

    /// Builder method to replace the retry policy.
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry = RetryEngine::new(policy);
        self
    }

    /// The template registry.
    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Run metrics.
    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Health of the generation back end.
    pub async fn health(&self) -> HealthStatus {
        self.executor.health().await
    }

    /// Structural checks merged with the consistency check.
    pub fn validate_output(&self, output: &RawOutput, context: &PipelineContext) -> ValidationResult {
        let structural = self.structural.validate(output);
        let coherence = self.consistency.validate(output, context);
        structural.merge(coherence.to_validation_result())
    }

    /// Runs the pipeline for one request.
    ///
    /// Stage faults are recorded in the returned result rather than raised.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires before or during a
    /// stage.
    #[instrument(skip_all, fields(intent = %request.intent().intent_type()))]
    pub async fn run(
        &self,
        request: &PipelineRequest,
        cancel: &CancellationToken,
    ) -> FabulaResult<PipelineResult> {
        self.metrics.record_run();
        match self.run_stages(request, cancel).await {
            Ok(result) => {
                if result.is_success() {
                    self.metrics.record_success();
                } else {
                    self.metrics.record_failure();
                }
                info!(
                    success = result.is_success(),
                    retry_count = result.retry_count(),
                    duration_ms = result.total_duration().as_millis() as u64,
                    "Pipeline run finished"
                );
                Ok(result)
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.metrics.record_cancellation();
                } else {
                    self.metrics.record_failure();
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        request: &PipelineRequest,
        cancel: &CancellationToken,
    ) -> FabulaResult<PipelineResult> {
        let mut log = RunLog::new();

        // BuildContext
        ensure_not_cancelled(PipelineStage::BuildContext, cancel)?;
        let stage_started = Instant::now();
        let context = match self.context_builder.build(request) {
            Ok(context) => context,
            Err(e) => {
                return Ok(log.fail(
                    None,
                    PipelineStage::BuildContext,
                    stage_started,
                    e.message(),
                ));
            }
        };
        log.push(PipelineStageResult::completed(
            PipelineStage::BuildContext,
            stage_started.elapsed(),
            Metadata::new().with(MetadataKey::MemoryAvailable, context.has_memory()),
        ));

        // PreparePrompt
        ensure_not_cancelled(PipelineStage::PreparePrompt, cancel)?;
        let stage_started = Instant::now();
        let agents = request
            .agents()
            .as_deref()
            .unwrap_or(self.settings.agents().as_slice());
        let order = (*request.execution_order())
            .unwrap_or(*self.settings.default_execution_order());
        let prompts = match self.registry.build_prompt_set(&context, agents, order) {
            Ok(prompts) => prompts,
            Err(e) => {
                return Ok(log.fail(
                    Some(context),
                    PipelineStage::PreparePrompt,
                    stage_started,
                    e.message(),
                ));
            }
        };
        log.push(PipelineStageResult::completed(
            PipelineStage::PreparePrompt,
            stage_started.elapsed(),
            Metadata::new()
                .with(MetadataKey::PromptCount, prompts.len())
                .with(MetadataKey::ExecutionOrder, order.to_string()),
        ));

        // Generate
        ensure_not_cancelled(PipelineStage::Generate, cancel)?;
        let stage_started = Instant::now();
        let raw = match self.executor.execute(&prompts, cancel).await {
            Ok(raw) => raw,
            Err(e) if e.is_cancelled() => return Err(cancelled_during(PipelineStage::Generate, e)),
            Err(e) => {
                return Ok(log.fail(
                    Some(context),
                    PipelineStage::Generate,
                    stage_started,
                    e.message(),
                ));
            }
        };
        self.record_agent_calls(&raw);
        let produced = raw
            .responses()
            .iter()
            .any(|r| r.is_success() && !r.is_skipped());
        if !produced {
            let message = match raw.failed().filter_map(|r| r.error().clone()).next() {
                Some(error) => format!("No agent produced output: {error}"),
                None => "No agent produced output".to_string(),
            };
            return Ok(log.fail(Some(context), PipelineStage::Generate, stage_started, message));
        }
        log.push(PipelineStageResult::completed(
            PipelineStage::Generate,
            stage_started.elapsed(),
            Metadata::new()
                .with(MetadataKey::ResponseCount, raw.len())
                .with(MetadataKey::FailedCount, raw.failed().count()),
        ));

        // Validate
        ensure_not_cancelled(PipelineStage::Validate, cancel)?;
        let stage_started = Instant::now();
        let validation = self.validate_output(&raw, &context);
        let mut validate_output = validation.metadata().clone();
        validate_output.insert(MetadataKey::ErrorCount, validation.errors().len());
        validate_output.insert(MetadataKey::WarningCount, validation.warnings().len());
        log.push(PipelineStageResult::completed(
            PipelineStage::Validate,
            stage_started.elapsed(),
            validate_output,
        ));

        // Retry
        let (raw, errors, retry_count) = if validation.is_valid() {
            log.push(PipelineStageResult::skipped(PipelineStage::Retry));
            (raw, Vec::new(), 0)
        } else {
            ensure_not_cancelled(PipelineStage::Retry, cancel)?;
            self.retry_stage(raw, validation, &context, cancel, &mut log)
                .await?
        };

        // Integrate
        ensure_not_cancelled(PipelineStage::Integrate, cancel)?;
        let stage_started = Instant::now();
        let output = self.integrator.integrate(&raw, &context, retry_count);
        log.push(PipelineStageResult::completed(
            PipelineStage::Integrate,
            stage_started.elapsed(),
            Metadata::new()
                .with(MetadataKey::ContentLength, output.text().chars().count())
                .with(MetadataKey::EventCount, output.events().len()),
        ));

        let total = log.started.elapsed();
        if errors.is_empty() {
            Ok(PipelineResult::success(
                context,
                output,
                log.stages,
                retry_count,
                log.started_at,
                total,
            ))
        } else {
            Ok(PipelineResult::failure(
                Some(context),
                Some(output),
                errors.join("; "),
                log.stages,
                retry_count,
                log.started_at,
                total,
            ))
        }
    }

    /// Rewrites invalid output under the retry policy.
    ///
    /// Returns the final output, the errors still standing and the attempt
    /// count.
    async fn retry_stage(
        &self,
        raw: RawOutput,
        validation: ValidationResult,
        context: &PipelineContext,
        cancel: &CancellationToken,
        log: &mut RunLog,
    ) -> FabulaResult<(RawOutput, Vec<String>, u32)> {
        let stage_started = Instant::now();
        let executor = &self.executor;
        let metrics = &self.metrics;
        let outcome = self
            .retry
            .execute_with_retry(
                || std::future::ready(Ok::<_, FabulaError>(raw.clone())),
                |candidate: &RawOutput| self.validate_output(candidate, context),
                |previous: RawOutput, validation: ValidationResult, cancel: CancellationToken| async move {
                    let rewritten = executor.rewrite(&previous, &validation, &cancel).await?;
                    let (calls, failures) = rewrite_calls(&previous, &rewritten);
                    metrics.record_agent_calls(calls, failures);
                    Ok::<_, FabulaError>(rewritten)
                },
                cancel,
            )
            .await;

        let retried = match outcome {
            Ok(retried) => retried,
            Err(e) if e.is_cancelled() => return Err(cancelled_during(PipelineStage::Retry, e)),
            Err(e) => {
                log.push(PipelineStageResult::failed(
                    PipelineStage::Retry,
                    stage_started.elapsed(),
                    e.message(),
                ));
                return Ok((raw, validation.error_messages(), 0));
            }
        };

        let retry_count = retried.attempt_count();
        self.metrics.record_retries(retry_count.saturating_sub(1));
        let duration = stage_started.elapsed();
        let stage_output = Metadata::new().with(MetadataKey::AttemptCount, retry_count);
        let errors = if retried.is_success() {
            log.push(PipelineStageResult::completed(PipelineStage::Retry, duration, stage_output));
            Vec::new()
        } else {
            let errors = retried.validation_errors();
            log.push(
                PipelineStageResult::failed(
                    PipelineStage::Retry,
                    duration,
                    format!(
                        "Retries exhausted after {} attempts: {}",
                        retry_count,
                        errors.join("; ")
                    ),
                )
                .with_output(stage_output),
            );
            errors
        };
        Ok((retried.into_value(), errors, retry_count))
    }

    fn record_agent_calls(&self, output: &RawOutput) {
        let executed = output.responses().iter().filter(|r| !r.is_skipped()).count();
        self.metrics
            .record_agent_calls(executed, output.failed().count());
    }
}

/// Calls issued by one rewrite pass and how many of them failed.
///
/// Failed and skipped responses are carried forward without a call.
fn rewrite_calls(previous: &RawOutput, rewritten: &RawOutput) -> (usize, usize) {
    previous
        .responses()
        .iter()
        .zip(rewritten.responses())
        .filter(|(before, _)| before.is_success() && !before.is_skipped())
        .fold((0, 0), |(calls, failures), (_, after)| {
            (calls + 1, failures + usize::from(!after.is_success()))
        })
}

fn ensure_not_cancelled(stage: PipelineStage, cancel: &CancellationToken) -> FabulaResult<()> {
    if cancel.is_cancelled() {
        info!(stage = %stage, "Pipeline cancelled before stage");
        return Err(PipelineError::new(PipelineErrorKind::Cancelled).into());
    }
    Ok(())
}

fn cancelled_during(stage: PipelineStage, error: FabulaError) -> FabulaError {
    info!(stage = %stage, "Pipeline cancelled during stage");
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_not_cancelled() {
        let cancel = CancellationToken::new();
        assert!(ensure_not_cancelled(PipelineStage::Generate, &cancel).is_ok());
        cancel.cancel();
        let err = ensure_not_cancelled(PipelineStage::Generate, &cancel).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_rewrite_calls_skip_carried_responses() {
        use fabula_core::{AgentKind, AgentResponse};
        use std::time::Duration;

        let previous = RawOutput::new(
            vec![
                AgentResponse::completed(AgentKind::Narrator, "Bob waved.", Duration::ZERO),
                AgentResponse::failed(AgentKind::Character, "quota exceeded", Duration::ZERO),
                AgentResponse::skipped(AgentKind::Summary),
                AgentResponse::completed(AgentKind::Consistency, "Fine.", Duration::ZERO),
            ],
            Duration::ZERO,
        );
        let rewritten = RawOutput::new(
            vec![
                AgentResponse::completed(AgentKind::Narrator, "Alice waved.", Duration::ZERO),
                AgentResponse::failed(AgentKind::Character, "quota exceeded", Duration::ZERO),
                AgentResponse::skipped(AgentKind::Summary),
                AgentResponse::failed(AgentKind::Consistency, "overloaded", Duration::ZERO),
            ],
            Duration::ZERO,
        );

        assert_eq!(rewrite_calls(&previous, &rewritten), (2, 1));
    }

    #[test]
    fn test_run_log_failure_records_stage() {
        let log = RunLog::new();
        let result = log.fail(None, PipelineStage::BuildContext, Instant::now(), "boom".into());
        assert!(!result.is_success());
        assert_eq!(result.error().as_deref(), Some("boom"));
        assert_eq!(result.failed_stages().count(), 1);
    }
}
