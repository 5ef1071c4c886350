//! Trait definitions for generation back ends and fact checkers.

use async_trait::async_trait;
use fabula_core::{CanonicalState, CoherenceViolation, GenerationRequest, GenerationResponse};
use fabula_error::FabulaResult;
use std::sync::Arc;

/// Core trait that every text generation back end must implement.
///
/// A back end receives one system/user instruction pair plus sampling
/// parameters and returns generated text with token accounting. Failures are
/// reported as errors; the agent executor turns them into failed responses.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text for one agent call.
    async fn generate(&self, request: &GenerationRequest) -> FabulaResult<GenerationResponse>;

    /// Liveness check used for readiness only.
    async fn health_check(&self) -> bool {
        true
    }

    /// Provider name (e.g., "anthropic", "mock").
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: GenerationBackend + ?Sized> GenerationBackend for Arc<T> {
    async fn generate(&self, request: &GenerationRequest) -> FabulaResult<GenerationResponse> {
        (**self).generate(request).await
    }

    async fn health_check(&self) -> bool {
        (**self).health_check().await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Detects contradictions inside a canonical fact set.
pub trait ContradictionChecker: Send + Sync {
    /// Every contradiction found in the state.
    fn contradictions(&self, state: &CanonicalState) -> Vec<CoherenceViolation>;
}

impl<T: ContradictionChecker + ?Sized> ContradictionChecker for Arc<T> {
    fn contradictions(&self, state: &CanonicalState) -> Vec<CoherenceViolation> {
        (**self).contradictions(state)
    }
}
