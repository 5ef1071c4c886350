use fabula_core::{ValidationError, ValidationResult, ValidationSeverity};
use fabula_error::{AgentError, AgentErrorKind};
use fabula_retry::{
    ExponentialBackoffPolicy, NoRetryPolicy, RetryEngine, RetryPolicy, SimpleRetryPolicy,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn never_valid(_: &u32) -> ValidationResult {
    ValidationResult::valid().with_error(ValidationError::new(
        "still wrong",
        ValidationSeverity::Major,
    ))
}

fn valid_from_three(value: &u32) -> ValidationResult {
    if *value >= 3 {
        ValidationResult::valid()
    } else {
        never_valid(value)
    }
}

#[tokio::test]
async fn valid_first_value_is_not_retried() -> anyhow::Result<()> {
    let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(3, Duration::ZERO)));
    let rewrites = AtomicU32::new(0);

    let result = engine
        .execute_with_retry(
            || async { Ok(5u32) },
            valid_from_three,
            |v: u32, _, _| {
                rewrites.fetch_add(1, Ordering::SeqCst);
                async move { Ok(v) }
            },
            &CancellationToken::new(),
        )
        .await?;

    assert!(result.is_success());
    assert_eq!(result.attempt_count(), 1);
    assert!(!result.was_retried());
    assert_eq!(rewrites.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn rewrites_until_valid() -> anyhow::Result<()> {
    let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(5, Duration::ZERO)));

    let result = engine
        .execute_with_retry(
            || async { Ok(1u32) },
            valid_from_three,
            |v: u32, _, _| async move { Ok(v + 1) },
            &CancellationToken::new(),
        )
        .await?;

    assert!(result.is_success());
    assert_eq!(*result.value(), 3);
    assert_eq!(result.attempt_count(), 3);
    assert!(result.attempts()[2].is_success());
    assert!(!result.attempts()[0].is_success());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn attempts_never_exceed_max_retries_plus_one() -> anyhow::Result<()> {
    let policies: Vec<Arc<dyn RetryPolicy>> = vec![
        Arc::new(NoRetryPolicy),
        Arc::new(SimpleRetryPolicy::new(1, Duration::from_millis(5))),
        Arc::new(SimpleRetryPolicy::new(4, Duration::ZERO)),
        Arc::new(ExponentialBackoffPolicy::new(3, Duration::from_millis(10), 2.0)?),
    ];

    for policy in policies {
        let max = policy.max_retries();
        let calls = AtomicU32::new(0);
        let engine = RetryEngine::new(policy);

        let result = engine
            .execute_with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(0u32) }
                },
                never_valid,
                |v: u32, _, _| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(v) }
                },
                &CancellationToken::new(),
            )
            .await?;

        assert!(!result.is_success());
        assert_eq!(result.attempt_count(), max + 1);
        assert_eq!(calls.load(Ordering::SeqCst), max + 1);
        assert_eq!(result.last_errors(), ["still wrong".to_string()]);
        assert!(result.into_result().is_err());
    }
    Ok(())
}

#[tokio::test]
async fn rewrite_fault_consumes_one_attempt() -> anyhow::Result<()> {
    let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(2, Duration::ZERO)));
    let rewrites = AtomicU32::new(0);

    let result = engine
        .execute_with_retry(
            || async { Ok(1u32) },
            valid_from_three,
            |v: u32, _, _| {
                let call = rewrites.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        return Err(
                            AgentError::new(AgentErrorKind::Backend("model overloaded".into()))
                                .into(),
                        );
                    }
                    Ok(v + 2)
                }
            },
            &CancellationToken::new(),
        )
        .await?;

    assert!(result.is_success());
    assert_eq!(result.attempt_count(), 3);
    let faulted = &result.attempts()[1];
    assert!(!faulted.is_success());
    assert_eq!(faulted.errors(), &["Generation failed: model overloaded".to_string()]);
    Ok(())
}

#[tokio::test]
async fn final_rewrite_fault_keeps_last_validation_errors() -> anyhow::Result<()> {
    let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(1, Duration::ZERO)));

    let result = engine
        .execute_with_retry(
            || async { Ok(0u32) },
            never_valid,
            |_: u32, _, _| async {
                Err::<u32, _>(
                    AgentError::new(AgentErrorKind::Backend("model overloaded".into())).into(),
                )
            },
            &CancellationToken::new(),
        )
        .await?;

    assert!(!result.is_success());
    assert_eq!(result.attempt_count(), 2);
    assert_eq!(result.last_errors(), ["Generation failed: model overloaded".to_string()]);
    assert_eq!(result.validation_errors(), vec!["still wrong".to_string()]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn total_duration_includes_backoff_waits() -> anyhow::Result<()> {
    let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(2, Duration::from_secs(3))));

    let result = engine
        .execute_with_retry(
            || async { Ok(0u32) },
            never_valid,
            |v: u32, _, _| async move { Ok(v) },
            &CancellationToken::new(),
        )
        .await?;

    assert!(*result.total_duration() >= Duration::from_secs(6));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_aborts_the_loop() {
    let engine = RetryEngine::new(Arc::new(SimpleRetryPolicy::new(3, Duration::from_secs(60))));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let err = engine
        .execute_with_retry(
            || async { Ok(0u32) },
            never_valid,
            |v: u32, _, _| async move { Ok(v) },
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}

#[tokio::test]
async fn failing_operation_is_reported() {
    let engine = RetryEngine::new(Arc::new(NoRetryPolicy));
    let err = engine
        .execute_with_retry(
            || async { Err(AgentError::new(AgentErrorKind::EmptyContent).into()) },
            |_: &u32| ValidationResult::valid(),
            |v: u32, _, _| async move { Ok(v) },
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(!err.is_cancelled());
    assert!(err.to_string().contains("empty content"));
}
