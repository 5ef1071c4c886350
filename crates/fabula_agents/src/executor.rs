//! The agent executor and its single-call unit.

use fabula_core::{
    AgentPrompt, AgentResponse, ExecutionOrder, GenerationParameters, GenerationRequest,
    MetadataKey, PromptSet, RawOutput,
};
use fabula_error::{AgentError, AgentErrorKind, FabulaResult, PipelineError, PipelineErrorKind};
use fabula_interface::{GenerationBackend, HealthStatus};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Issues agent calls against a generation back end.
///
/// # Examples
///
/// ```no_run
/// use fabula_agents::AgentExecutor;
/// use fabula_core::{AgentKind, AgentPrompt, ExecutionOrder, PromptSet};
/// use fabula_interface::GenerationBackend;
/// use tokio_util::sync::CancellationToken;
///
/// async fn narrate(backend: impl GenerationBackend) -> fabula_error::FabulaResult<()> {
///     let executor = AgentExecutor::new(backend);
///     let prompts = PromptSet::new(
///         vec![AgentPrompt::new(AgentKind::Narrator, "You narrate.", "Continue the story.")],
///         ExecutionOrder::Sequential,
///     );
///     let output = executor.execute(&prompts, &CancellationToken::new()).await?;
///     println!("{} responses", output.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AgentExecutor<B> {
    backend: B,
    parameters: GenerationParameters,
}

impl<B: GenerationBackend> AgentExecutor<B> {
    /// Creates an executor sending default generation parameters.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            parameters: GenerationParameters::default(),
        }
    }

    /// Builder method to override the generation parameters.
    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// The generation back end.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The parameters sent with every call.
    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }

    /// Runs every prompt of the set according to its execution order.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires during a call.
    #[instrument(skip_all, fields(order = %prompts.order(), prompts = prompts.len()))]
    pub async fn execute(
        &self,
        prompts: &PromptSet,
        cancel: &CancellationToken,
    ) -> FabulaResult<RawOutput> {
        let started = Instant::now();
        let responses = match prompts.order() {
            ExecutionOrder::Parallel => self.execute_parallel(prompts.prompts(), cancel).await?,
            ExecutionOrder::Sequential => {
                self.execute_sequential(prompts.prompts(), cancel).await?
            }
            ExecutionOrder::Conditional => {
                self.execute_conditional(prompts.prompts(), cancel).await?
            }
        };
        let output = RawOutput::new(responses, started.elapsed());
        debug!(
            responses = output.len(),
            failed = output.failed().count(),
            duration_ms = output.total_duration().as_millis() as u64,
            "Execution pass finished"
        );
        Ok(output)
    }

    /// Calls the back end for one prompt, honoring cancellation.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires before the call
    /// completes. Back end failures are returned as failed responses.
    pub async fn execute_single(
        &self,
        prompt: &AgentPrompt,
        cancel: &CancellationToken,
    ) -> FabulaResult<AgentResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::new(PipelineErrorKind::Cancelled).into()),
            response = self.call_agent(prompt) => Ok(response),
        }
    }

    /// Calls the back end for one prompt. Every fault becomes a failed response.
    #[instrument(skip_all, fields(agent = %prompt.agent()))]
    pub async fn call_agent(&self, prompt: &AgentPrompt) -> AgentResponse {
        let agent = *prompt.agent();
        let request = GenerationRequest::new(
            prompt.system().clone(),
            prompt.user().clone(),
            self.parameters.clone(),
        );
        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.backend.generate(&request))
            .catch_unwind()
            .await;
        let duration = started.elapsed();

        match outcome {
            Ok(Ok(generated)) if generated.text().trim().is_empty() => {
                let error = AgentError::new(AgentErrorKind::EmptyContent);
                warn!(%agent, "Back end returned empty content");
                AgentResponse::failed(agent, error.message(), duration)
            }
            Ok(Ok(generated)) => {
                debug!(
                    %agent,
                    tokens = generated.tokens_used(),
                    duration_ms = duration.as_millis() as u64,
                    "Agent call succeeded"
                );
                AgentResponse::completed(agent, generated.text().clone(), duration)
                    .with_metadata(MetadataKey::PromptTokens, *generated.prompt_tokens())
                    .with_metadata(MetadataKey::CompletionTokens, *generated.completion_tokens())
                    .with_metadata(MetadataKey::TokensUsed, generated.tokens_used())
                    .with_provider_metadata(generated.provider_metadata().clone())
            }
            Ok(Err(e)) => {
                warn!(%agent, error = %e, "Agent call failed");
                AgentResponse::failed(agent, e.message(), duration)
            }
            Err(panic) => {
                let message = format!("generation back end panicked: {}", panic_message(&*panic));
                warn!(%agent, %message, "Agent call panicked");
                AgentResponse::failed(agent, message, duration)
            }
        }
    }

    /// Runs the back end's health check.
    pub async fn health(&self) -> HealthStatus {
        if self.backend.health_check().await {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy {
                message: format!("back end '{}' failed its health check", self.backend.name()),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
