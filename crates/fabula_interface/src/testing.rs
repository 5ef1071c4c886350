//! Scripted generation back end for tests.
//!
//! Enabled with the `testing` feature.

use crate::GenerationBackend;
use async_trait::async_trait;
use fabula_core::{GenerationRequest, GenerationResponse};
use fabula_error::{AgentError, AgentErrorKind, FabulaResult};
use parking_lot::Mutex;
use std::time::Duration;

/// A single scripted reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Succeed with the text
    Success(String),
    /// Fail with a back end error
    Error(String),
    /// Never answer
    Hang,
    /// Panic inside `generate`
    Panic,
}

/// Back end that answers by rule, recording every request it sees.
///
/// A rule fires when its marker occurs in the system text followed by the
/// user text. Requests that match no rule get the fallback reply. Successful
/// replies report 20 prompt and 40 completion tokens.
///
/// # Examples
///
/// ```
/// use fabula_interface::testing::{MockBackend, MockResponse};
///
/// let backend = MockBackend::new_success("The gate opened.")
///     .with_rule("storm", MockResponse::Error("overloaded".into()));
/// assert_eq!(backend.call_count(), 0);
/// ```
#[derive(Debug)]
pub struct MockBackend {
    rules: Vec<(String, MockResponse)>,
    fallback: MockResponse,
    healthy: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    /// Mock with the given fallback reply.
    pub fn new(fallback: MockResponse) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
            healthy: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock that answers every request with the text.
    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new(MockResponse::Success(text.into()))
    }

    /// Adds a routing rule. Earlier rules win.
    pub fn with_rule(mut self, marker: impl Into<String>, response: MockResponse) -> Self {
        self.rules.push((marker.into(), response));
        self
    }

    /// Marks the mock as failing its health check.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Number of generate calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of generate calls whose prompt contained the marker.
    pub fn calls_for(&self, marker: &str) -> usize {
        self.prompts()
            .iter()
            .filter(|prompt| prompt.contains(marker))
            .count()
    }

    /// System and user text of every call joined by a newline, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|(system, user)| format!("{system}\n{user}"))
            .collect()
    }

    /// User text of every call, in call order.
    pub fn user_texts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, user)| user.clone()).collect()
    }

    fn reply_for(&self, prompt: &str) -> MockResponse {
        self.rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, request: &GenerationRequest) -> FabulaResult<GenerationResponse> {
        self.calls
            .lock()
            .push((request.system().clone(), request.user().clone()));
        let reply = self.reply_for(&format!("{}\n{}", request.system(), request.user()));
        tokio::time::sleep(Duration::from_millis(1)).await;

        match reply {
            MockResponse::Success(text) => Ok(GenerationResponse::new(
                text,
                20,
                40,
                Duration::from_millis(1),
            )),
            MockResponse::Error(message) => {
                Err(AgentError::new(AgentErrorKind::Backend(message)).into())
            }
            MockResponse::Hang => std::future::pending().await,
            MockResponse::Panic => panic!("mock back end exploded"),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        "mock"
    }
}
