use async_trait::async_trait;
use fabula_core::{
    CanonicalState, CoherenceViolation, GenerationParameters, GenerationRequest,
    GenerationResponse, MemoryLevel,
};
use fabula_error::FabulaResult;
use fabula_interface::{ContradictionChecker, GenerationBackend, HealthStatus};
use std::sync::Arc;
use std::time::Duration;

struct EchoBackend;

#[async_trait]
impl GenerationBackend for EchoBackend {
    async fn generate(&self, request: &GenerationRequest) -> FabulaResult<GenerationResponse> {
        Ok(GenerationResponse::new(
            request.user().clone(),
            3,
            5,
            Duration::from_millis(1),
        ))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct NoContradictions;

impl ContradictionChecker for NoContradictions {
    fn contradictions(&self, _state: &CanonicalState) -> Vec<CoherenceViolation> {
        Vec::new()
    }
}

#[tokio::test]
async fn shared_backend_delegates_to_inner() -> anyhow::Result<()> {
    let backend: Arc<dyn GenerationBackend> = Arc::new(EchoBackend);
    let request = GenerationRequest::new("system", "hello", GenerationParameters::default());

    let response = backend.generate(&request).await?;

    assert_eq!(response.text(), "hello");
    assert_eq!(response.tokens_used(), 8);
    assert!(backend.health_check().await);
    assert_eq!(backend.name(), "echo");
    Ok(())
}

#[test]
fn shared_checker_delegates_to_inner() {
    let checker: Arc<dyn ContradictionChecker> = Arc::new(NoContradictions);
    let state = CanonicalState::new("eldoria", MemoryLevel::World);
    assert!(checker.contradictions(&state).is_empty());
}

#[test]
fn degraded_is_still_operational() {
    let degraded = HealthStatus::Degraded {
        message: "slow".to_string(),
    };
    assert!(degraded.is_operational());
    assert_eq!(degraded.to_string(), "degraded: slow");

    let down = HealthStatus::Unhealthy {
        message: "refused".to_string(),
    };
    assert!(!down.is_operational());
}
