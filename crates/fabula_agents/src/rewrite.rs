//! The rewrite pass over a previous execution.

use crate::AgentExecutor;
use fabula_core::{AgentKind, AgentPrompt, AgentResponse, RawOutput, ValidationResult};
use fabula_error::{FabulaResult, PipelineError, PipelineErrorKind};
use fabula_interface::GenerationBackend;
use futures_util::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Builds the prompt asking an agent to revise its previous content.
///
/// # Examples
///
/// ```
/// use fabula_agents::rewrite_prompt;
/// use fabula_core::AgentKind;
///
/// let prompt = rewrite_prompt(AgentKind::Narrator, "Bob waved.", &["Bob is dead".to_string()]);
/// assert!(prompt.user().contains("Bob waved."));
/// assert!(prompt.user().contains("Bob is dead"));
/// ```
pub fn rewrite_prompt(agent: AgentKind, previous: &str, errors: &[String]) -> AgentPrompt {
    let system = format!(
        "You are the {agent} agent of a story engine. Revise your previous output so that it \
         fixes every listed problem and changes nothing else."
    );
    let user = format!(
        "Previous output:\n{previous}\n\nProblems found:\n{}\n\nRewrite the output.",
        errors.join("; ")
    );
    AgentPrompt::new(agent, system, user)
}

impl<B: GenerationBackend> AgentExecutor<B> {
    /// Re-issues every successful agent with its content and the validation
    /// errors, carrying failed and skipped responses forward unchanged.
    ///
    /// Rewrites run concurrently; responses keep their previous order.
    ///
    /// # Errors
    ///
    /// Returns a cancellation error if the token fires during a rewrite call.
    #[instrument(skip_all, fields(responses = previous.len(), errors = validation.errors().len()))]
    pub async fn rewrite(
        &self,
        previous: &RawOutput,
        validation: &ValidationResult,
        cancel: &CancellationToken,
    ) -> FabulaResult<RawOutput> {
        let started = Instant::now();
        let errors = validation.error_messages();

        let passes = previous.responses().iter().map(|response| {
            let errors = &errors;
            async move {
                if !response.is_success() || response.is_skipped() {
                    return response.clone();
                }
                let prompt = rewrite_prompt(*response.agent(), response.content(), errors);
                self.call_agent(&prompt).await
            }
        });

        let responses: Vec<AgentResponse> = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PipelineError::new(PipelineErrorKind::Cancelled).into());
            }
            responses = join_all(passes) => responses,
        };

        let rewritten = previous
            .responses()
            .iter()
            .filter(|r| r.is_success() && !r.is_skipped())
            .count();
        info!(
            rewritten,
            carried = responses.len() - rewritten,
            "Rewrite pass finished"
        );
        Ok(RawOutput::new(responses, started.elapsed()))
    }
}
