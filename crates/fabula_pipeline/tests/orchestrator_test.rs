//! Tests for PipelineOrchestrator.

mod test_utils;

use fabula_consistency::VitalStatusContradictionChecker;
use fabula_core::{
    AgentKind, AgentPrompt, CanonicalState, ExecutionOrder, Fact, FactType, IntentType,
    MemoryLevel, MetadataKey, NarrativeEvent, NarrativeIntent, PipelineContext, PipelineStage,
    StageStatus, StoryEvent,
};
use fabula_error::{FabulaErrorKind, PipelineErrorKind};
use fabula_pipeline::{PipelineConfig, PipelineOrchestrator, PipelineRequest, PromptTemplate, TemplateRegistry};
use fabula_retry::{NoRetryPolicy, SimpleRetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{CLEAN_PROSE, DEAD_BOB_PROSE, MockBackend, MockResponse, request, snapshot};
use tokio_util::sync::CancellationToken;

const REWRITE_MARKER: &str = "Rewrite the output.";

fn orchestrator(backend: &Arc<MockBackend>) -> anyhow::Result<PipelineOrchestrator<Arc<MockBackend>>> {
    Ok(PipelineOrchestrator::new(backend.clone(), &PipelineConfig::default())?)
}

fn stage_status(result: &fabula_core::PipelineResult, stage: PipelineStage) -> Option<StageStatus> {
    result.stage(stage).map(|s| *s.status())
}

#[tokio::test]
async fn test_clean_run_succeeds_without_retry() -> anyhow::Result<()> {
    let text = format!(
        "{CLEAN_PROSE}\n```events\n[{{\"type\": \"character_moved\", \"character\": \"Alice\", \"to\": \"harbor\"}}]\n```"
    );
    let backend = Arc::new(MockBackend::new_success(text));
    let orchestrator = orchestrator(&backend)?;

    let result = orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert!(result.is_success());
    assert!(result.error().is_none());
    assert_eq!(*result.retry_count(), 0);
    assert_eq!(backend.call_count(), 1);

    let stages: Vec<_> = result.stages().iter().map(|s| *s.stage()).collect();
    assert_eq!(
        stages,
        vec![
            PipelineStage::BuildContext,
            PipelineStage::PreparePrompt,
            PipelineStage::Generate,
            PipelineStage::Validate,
            PipelineStage::Retry,
            PipelineStage::Integrate,
        ]
    );
    assert_eq!(stage_status(&result, PipelineStage::Retry), Some(StageStatus::Skipped));

    let output = result.output().as_ref().expect("output");
    assert_eq!(output.text(), CLEAN_PROSE);
    assert_eq!(
        output.events(),
        &vec![NarrativeEvent::Known(StoryEvent::CharacterMoved {
            character: "Alice".to_string(),
            to: "harbor".to_string(),
            from: None,
        })]
    );
    assert_eq!(output.metadata().get_int(MetadataKey::TokensUsed), Some(60));
    assert_eq!(output.metadata().get_text(MetadataKey::ContributingAgents), Some("narrator"));

    let metrics = orchestrator.metrics().snapshot();
    assert_eq!(metrics.runs, 1);
    assert_eq!(metrics.successes, 1);
    assert_eq!(metrics.agent_calls, 1);
    Ok(())
}

#[tokio::test]
async fn test_dead_character_exhausts_retries() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success(DEAD_BOB_PROSE));
    let orchestrator = orchestrator(&backend)?
        .with_retry_policy(Arc::new(SimpleRetryPolicy::new(1, Duration::ZERO)));

    let result = orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert!(!result.is_success());
    assert_eq!(*result.retry_count(), 2);
    let error = result.error().as_deref().unwrap_or_default();
    assert!(error.contains("Bob"), "error was: {error}");
    assert_eq!(stage_status(&result, PipelineStage::Retry), Some(StageStatus::Failed));
    assert_eq!(stage_status(&result, PipelineStage::Integrate), Some(StageStatus::Completed));
    assert!(result.output().is_some());

    // One generation plus one rewrite
    assert_eq!(backend.call_count(), 2);
    assert_eq!(backend.calls_for(REWRITE_MARKER), 1);
    assert_eq!(orchestrator.metrics().snapshot().failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_every_rewrite_is_counted_once() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success(DEAD_BOB_PROSE));
    let orchestrator = orchestrator(&backend)?
        .with_retry_policy(Arc::new(SimpleRetryPolicy::new(2, Duration::ZERO)));

    let result = orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert!(!result.is_success());
    assert_eq!(*result.retry_count(), 3);
    assert_eq!(backend.call_count(), 3);
    let metrics = orchestrator.metrics().snapshot();
    assert_eq!(metrics.agent_calls, 3);
    assert_eq!(metrics.agent_failures, 0);
    assert_eq!(metrics.retries, 2);
    Ok(())
}

#[tokio::test]
async fn test_rewrite_repairs_output() -> anyhow::Result<()> {
    let backend = Arc::new(
        MockBackend::new_success(DEAD_BOB_PROSE)
            .with_rule(REWRITE_MARKER, MockResponse::Success(CLEAN_PROSE.to_string())),
    );
    let orchestrator = orchestrator(&backend)?;

    let result = orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert!(result.is_success());
    assert_eq!(*result.retry_count(), 2);
    assert_eq!(stage_status(&result, PipelineStage::Retry), Some(StageStatus::Completed));
    let output = result.output().as_ref().expect("output");
    assert_eq!(output.text(), CLEAN_PROSE);
    assert_eq!(output.metadata().get_int(MetadataKey::AttemptCount), Some(2));

    // The rewrite prompt quotes the problem it must fix
    let rewrite = backend
        .prompts()
        .into_iter()
        .find(|p| p.contains(REWRITE_MARKER))
        .expect("rewrite prompt");
    assert!(rewrite.contains(DEAD_BOB_PROSE));
    assert!(rewrite.contains("Bob is dead"));
    Ok(())
}

#[tokio::test]
async fn test_generation_failure_is_fatal() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new(MockResponse::Error("quota exceeded".into())));
    let orchestrator = orchestrator(&backend)?;

    let result = orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert!(!result.is_success());
    assert!(result.output().is_none());
    assert_eq!(stage_status(&result, PipelineStage::Generate), Some(StageStatus::Failed));
    assert!(result.stage(PipelineStage::Validate).is_none());
    assert!(result.error().as_deref().unwrap_or_default().contains("quota exceeded"));
    assert_eq!(orchestrator.metrics().snapshot().agent_failures, 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_template_is_fatal() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success(CLEAN_PROSE));
    let orchestrator = orchestrator(&backend)?.with_registry(Arc::new(TemplateRegistry::new()));

    let result = orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert!(!result.is_success());
    assert_eq!(stage_status(&result, PipelineStage::PreparePrompt), Some(StageStatus::Failed));
    assert!(result.context().is_some());
    assert!(result.error().as_deref().unwrap_or_default().contains("No prompt template"));
    assert_eq!(backend.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_request_overrides_agents_and_order() -> anyhow::Result<()> {
    let backend = Arc::new(
        MockBackend::new_success(CLEAN_PROSE).with_rule(
            "You voice the characters",
            MockResponse::Success("\"We must hurry,\" said Alice.".to_string()),
        ),
    );
    let orchestrator = orchestrator(&backend)?;
    let request = PipelineRequest::builder()
        .snapshot(snapshot())
        .intent(NarrativeIntent::new(IntentType::GenerateDialogue))
        .agents(vec![AgentKind::Narrator, AgentKind::Character])
        .execution_order(ExecutionOrder::Parallel)
        .build()?;

    let result = orchestrator.run(&request, &CancellationToken::new()).await?;

    assert!(result.is_success());
    assert_eq!(backend.call_count(), 2);
    let output = result.output().as_ref().expect("output");
    assert_eq!(
        output.text(),
        &format!("{CLEAN_PROSE}\n\n\"We must hurry,\" said Alice.")
    );
    let prepare = result.stage(PipelineStage::PreparePrompt).expect("prepare stage");
    assert_eq!(prepare.output().get_text(MetadataKey::ExecutionOrder), Some("parallel"));
    Ok(())
}

struct TerseTemplate;

impl PromptTemplate for TerseTemplate {
    fn build(&self, _context: &PipelineContext) -> AgentPrompt {
        AgentPrompt::new(AgentKind::Narrator, "Be brief.", "SUMMARY MARKER")
    }
}

#[tokio::test]
async fn test_exact_template_wins_for_its_intent() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success(CLEAN_PROSE));
    let orchestrator = orchestrator(&backend)?;
    orchestrator
        .registry()
        .register(AgentKind::Narrator, IntentType::Summarize, TerseTemplate);

    let summarize = PipelineRequest::builder()
        .snapshot(snapshot())
        .intent(NarrativeIntent::new(IntentType::Summarize))
        .build()?;
    orchestrator.run(&summarize, &CancellationToken::new()).await?;
    orchestrator.run(&request(), &CancellationToken::new()).await?;

    assert_eq!(backend.calls_for("SUMMARY MARKER"), 1);
    assert_eq!(backend.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_fact_contradiction_blocks_success() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success(CLEAN_PROSE));
    let orchestrator = orchestrator(&backend)?
        .with_checker(Arc::new(VitalStatusContradictionChecker::new()))
        .with_retry_policy(Arc::new(NoRetryPolicy));

    let mut state = CanonicalState::new("eldoria", MemoryLevel::World);
    state.add_facts([
        Fact::new("Bob died in the siege", FactType::CharacterState, MemoryLevel::World)
            .with_entity("bob"),
        Fact::new("Bob is alive and well", FactType::CharacterState, MemoryLevel::World)
            .with_entity("bob"),
    ])?;
    let request = PipelineRequest::builder()
        .snapshot(snapshot())
        .intent(NarrativeIntent::new(IntentType::Continue))
        .canonical_state(state)
        .build()?;

    let result = orchestrator.run(&request, &CancellationToken::new()).await?;

    assert!(!result.is_success());
    assert_eq!(*result.retry_count(), 1);
    assert!(result.error().as_deref().unwrap_or_default().contains("both dead and alive"));
    assert_eq!(backend.calls_for(REWRITE_MARKER), 0);
    Ok(())
}

#[tokio::test]
async fn test_cancelled_before_start() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success(CLEAN_PROSE));
    let orchestrator = orchestrator(&backend)?;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator.run(&request(), &cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(backend.call_count(), 0);
    let metrics = orchestrator.metrics().snapshot();
    assert_eq!(metrics.cancellations, 1);
    assert_eq!(metrics.failures, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_generation() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new(MockResponse::Hang));
    let orchestrator = orchestrator(&backend)?;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = orchestrator.run(&request(), &cancel).await.unwrap_err();

    match err.kind() {
        FabulaErrorKind::Pipeline(e) => assert_eq!(e.kind(), &PipelineErrorKind::Cancelled),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let config: PipelineConfig = toml::from_str(
        r#"
        [validation]
        action_patterns = ["no placeholder here"]
        "#,
    )
    .unwrap();

    let backend = Arc::new(MockBackend::new_success(CLEAN_PROSE));
    assert!(PipelineOrchestrator::new(backend, &config).is_err());
}
