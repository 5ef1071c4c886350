//! Parallel, sequential and conditional dispatch over a prompt list.

use crate::AgentExecutor;
use fabula_core::{AgentPrompt, AgentResponse, PromptPriority};
use fabula_error::{FabulaResult, PipelineError, PipelineErrorKind};
use fabula_interface::GenerationBackend;
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

impl<B: GenerationBackend> AgentExecutor<B> {
    /// Runs every prompt concurrently and waits for all of them.
    ///
    /// Responses come back in prompt order. Cancellation drops every
    /// outstanding call at once.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires before all calls finish.
    pub async fn execute_parallel(
        &self,
        prompts: &[AgentPrompt],
        cancel: &CancellationToken,
    ) -> FabulaResult<Vec<AgentResponse>> {
        let calls = prompts.iter().map(|prompt| self.call_agent(prompt));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(outstanding = prompts.len(), "Parallel pass cancelled");
                Err(PipelineError::new(PipelineErrorKind::Cancelled).into())
            }
            responses = join_all(calls) => Ok(responses),
        }
    }

    /// Runs prompts one at a time, stopping after a failed required prompt.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires during a call.
    pub async fn execute_sequential(
        &self,
        prompts: &[AgentPrompt],
        cancel: &CancellationToken,
    ) -> FabulaResult<Vec<AgentResponse>> {
        let mut responses = Vec::with_capacity(prompts.len());
        for prompt in prompts {
            let response = self.execute_single(prompt, cancel).await?;
            let stop = !response.is_success() && *prompt.priority() == PromptPriority::Required;
            responses.push(response);
            if stop {
                info!(
                    agent = %prompt.agent(),
                    remaining = prompts.len() - responses.len(),
                    "Required agent failed, stopping sequential pass"
                );
                break;
            }
        }
        Ok(responses)
    }

    /// Runs prompts one at a time, deciding each from the calls before it.
    ///
    /// Required prompts always run. Optional prompts run only if every earlier
    /// call in the pass succeeded; fallback prompts run only if one failed.
    /// Prompts that do not run are answered with a skipped response, which
    /// does not count toward the success record.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires during a call.
    pub async fn execute_conditional(
        &self,
        prompts: &[AgentPrompt],
        cancel: &CancellationToken,
    ) -> FabulaResult<Vec<AgentResponse>> {
        let mut responses = Vec::with_capacity(prompts.len());
        let mut any_failed = false;
        for prompt in prompts {
            let run = match prompt.priority() {
                PromptPriority::Required => true,
                PromptPriority::Optional => !any_failed,
                PromptPriority::Fallback => any_failed,
            };
            if !run {
                debug!(agent = %prompt.agent(), priority = %prompt.priority(), "Skipping prompt");
                responses.push(AgentResponse::skipped(*prompt.agent()));
                continue;
            }

            let response = self.execute_single(prompt, cancel).await?;
            any_failed |= !response.is_success();
            responses.push(response);
        }
        Ok(responses)
    }
}
