mod test_utils;

use fabula_agents::AgentExecutor;
use fabula_core::{
    AgentKind, ExecutionOrder, MetadataKey, PromptPriority, PromptSet, ValidationError,
    ValidationResult, ValidationSeverity,
};
use fabula_interface::HealthStatus;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockBackend, MockResponse, prompt};
use tokio_util::sync::CancellationToken;

fn three_prompts() -> Vec<fabula_core::AgentPrompt> {
    vec![
        prompt(AgentKind::Narrator, "first", PromptPriority::Required),
        prompt(AgentKind::Character, "second", PromptPriority::Required),
        prompt(AgentKind::Summary, "third", PromptPriority::Optional),
    ]
}

fn failing_second() -> MockBackend {
    MockBackend::new_success("A lantern flickered in the hall.")
        .with_rule("second", MockResponse::Error("model overloaded".into()))
}

#[tokio::test]
async fn sequential_stops_after_failed_required_prompt() -> anyhow::Result<()> {
    let backend = Arc::new(failing_second());
    let executor = AgentExecutor::new(Arc::clone(&backend));
    let prompts = PromptSet::new(three_prompts(), ExecutionOrder::Sequential);

    let output = executor.execute(&prompts, &CancellationToken::new()).await?;

    assert_eq!(output.len(), 2);
    assert!(output.responses()[0].is_success());
    assert!(!output.responses()[1].is_success());
    assert_eq!(backend.calls_for("third"), 0);
    Ok(())
}

#[tokio::test]
async fn sequential_continues_past_failed_optional_prompt() -> anyhow::Result<()> {
    let backend = Arc::new(
        MockBackend::new_success("The river ran cold.")
            .with_rule("first", MockResponse::Error("flaky".into())),
    );
    let executor = AgentExecutor::new(Arc::clone(&backend));
    let prompts = PromptSet::new(
        vec![
            prompt(AgentKind::Narrator, "first", PromptPriority::Optional),
            prompt(AgentKind::Summary, "second", PromptPriority::Required),
        ],
        ExecutionOrder::Sequential,
    );

    let output = executor.execute(&prompts, &CancellationToken::new()).await?;

    assert_eq!(output.len(), 2);
    assert_eq!(backend.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn parallel_returns_one_response_per_prompt_in_order() -> anyhow::Result<()> {
    let backend = Arc::new(failing_second());
    let executor = AgentExecutor::new(Arc::clone(&backend));
    let prompts = PromptSet::new(three_prompts(), ExecutionOrder::Parallel);

    let output = executor.execute(&prompts, &CancellationToken::new()).await?;

    assert_eq!(output.len(), 3);
    let agents: Vec<AgentKind> = output.responses().iter().map(|r| *r.agent()).collect();
    assert_eq!(
        agents,
        vec![AgentKind::Narrator, AgentKind::Character, AgentKind::Summary]
    );
    assert!(!output.responses()[1].is_success());
    assert!(output.responses()[2].is_success());
    assert_eq!(backend.call_count(), 3);
    Ok(())
}

#[tokio::test]
async fn conditional_skips_optional_after_failure() -> anyhow::Result<()> {
    let backend = Arc::new(
        MockBackend::new_success("The gate opened.")
            .with_rule("first", MockResponse::Error("timeout".into())),
    );
    let executor = AgentExecutor::new(Arc::clone(&backend));
    let prompts = PromptSet::new(
        vec![
            prompt(AgentKind::Narrator, "first", PromptPriority::Required),
            prompt(AgentKind::Character, "second", PromptPriority::Optional),
            prompt(AgentKind::Summary, "third", PromptPriority::Fallback),
        ],
        ExecutionOrder::Conditional,
    );

    let output = executor.execute(&prompts, &CancellationToken::new()).await?;

    assert_eq!(output.len(), 3);
    let skipped = &output.responses()[1];
    assert!(skipped.is_success());
    assert!(skipped.is_skipped());
    assert!(skipped.content().is_empty());
    assert_eq!(backend.calls_for("second"), 0);

    let fallback = &output.responses()[2];
    assert!(!fallback.is_skipped());
    assert_eq!(fallback.content(), "The gate opened.");
    Ok(())
}

#[tokio::test]
async fn conditional_skips_fallback_when_all_succeed() -> anyhow::Result<()> {
    let backend = Arc::new(MockBackend::new_success("Snow fell on the keep."));
    let executor = AgentExecutor::new(Arc::clone(&backend));
    let prompts = PromptSet::new(
        vec![
            prompt(AgentKind::Narrator, "first", PromptPriority::Required),
            prompt(AgentKind::Character, "second", PromptPriority::Optional),
            prompt(AgentKind::Summary, "third", PromptPriority::Fallback),
        ],
        ExecutionOrder::Conditional,
    );

    let output = executor.execute(&prompts, &CancellationToken::new()).await?;

    assert!(output.responses()[2].is_skipped());
    assert_eq!(backend.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn empty_content_is_a_failure() -> anyhow::Result<()> {
    let executor = AgentExecutor::new(MockBackend::new_success("   "));
    let response = executor
        .call_agent(&prompt(AgentKind::Narrator, "first", PromptPriority::Required))
        .await;

    assert!(!response.is_success());
    assert_eq!(response.error().as_deref(), Some("empty content"));
    Ok(())
}

#[tokio::test]
async fn successful_call_records_token_usage() {
    let executor = AgentExecutor::new(MockBackend::new_success("The bell tolled."));
    let response = executor
        .call_agent(&prompt(AgentKind::Narrator, "first", PromptPriority::Required))
        .await;

    assert!(response.is_success());
    assert_eq!(response.metadata().get_int(MetadataKey::PromptTokens), Some(20));
    assert_eq!(response.metadata().get_int(MetadataKey::TokensUsed), Some(60));
    assert!(*response.duration() > Duration::ZERO);
}

#[tokio::test]
async fn backend_panic_becomes_failed_response() {
    let executor = AgentExecutor::new(
        MockBackend::new_success("unused").with_rule("first", MockResponse::Panic),
    );
    let response = executor
        .call_agent(&prompt(AgentKind::Narrator, "first", PromptPriority::Required))
        .await;

    assert!(!response.is_success());
    assert!(
        response
            .error()
            .as_deref()
            .is_some_and(|e| e.contains("mock back end exploded"))
    );
}

#[tokio::test]
async fn rewrite_carries_failed_responses_unchanged() -> anyhow::Result<()> {
    let backend = Arc::new(failing_second());
    let executor = AgentExecutor::new(Arc::clone(&backend));
    let prompts = PromptSet::new(three_prompts(), ExecutionOrder::Parallel);
    let first = executor.execute(&prompts, &CancellationToken::new()).await?;
    let calls_before = backend.call_count();

    let validation = ValidationResult::valid().with_error(ValidationError::new(
        "Bob cannot act",
        ValidationSeverity::Critical,
    ));
    let second = executor
        .rewrite(&first, &validation, &CancellationToken::new())
        .await?;

    assert_eq!(second.len(), 3);
    assert_eq!(second.responses()[1], first.responses()[1]);
    assert_eq!(backend.call_count(), calls_before + 2);

    let rewrite_requests: Vec<String> = backend.user_texts().split_off(calls_before);
    assert!(rewrite_requests.iter().all(|u| u.contains("Bob cannot act")));
    assert!(
        rewrite_requests
            .iter()
            .all(|u| u.contains("A lantern flickered in the hall."))
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelling_parallel_pass_aborts_all_calls() {
    let backend = MockBackend::new_success("unused")
        .with_rule("first", MockResponse::Hang)
        .with_rule("second", MockResponse::Hang);
    let executor = AgentExecutor::new(backend);
    let prompts = PromptSet::new(three_prompts(), ExecutionOrder::Parallel);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = executor.execute(&prompts, &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn health_reflects_backend_check() {
    let healthy = AgentExecutor::new(MockBackend::new_success("ok"));
    assert_eq!(healthy.health().await, HealthStatus::Healthy);

    let down = AgentExecutor::new(MockBackend::new_success("ok").unhealthy());
    assert!(!down.health().await.is_operational());
}
