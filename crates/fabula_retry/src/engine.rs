//! The operate, validate, rewrite loop.

use crate::{RetryAttempt, RetryContext, RetryPolicy, RetryResult};
use fabula_core::ValidationResult;
use fabula_error::{FabulaResult, RetryError, RetryErrorKind};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Runs an operation and rewrites its value until it validates or the policy
/// gives up.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    policy: Arc<dyn RetryPolicy>,
}

impl RetryEngine {
    /// Creates an engine driven by the policy.
    pub fn new(policy: Arc<dyn RetryPolicy>) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &Arc<dyn RetryPolicy> {
        &self.policy
    }

    /// Produces a value with `operation`, then validates and rewrites it until
    /// it passes or the policy declines another attempt.
    ///
    /// At most `1 + max_retries` operation and rewrite calls are made. A fault
    /// raised by `rewrite` is recorded as a failed attempt and the loop goes on
    /// with the previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if `operation` fails, or a cancellation error if the
    /// token fires before the call starts, during a backoff wait, or inside a
    /// rewrite.
    #[instrument(skip_all, fields(max_retries = self.policy.max_retries()))]
    pub async fn execute_with_retry<T, Op, OpFut, V, Rw, RwFut>(
        &self,
        operation: Op,
        mut validate: V,
        mut rewrite: Rw,
        cancel: &CancellationToken,
    ) -> FabulaResult<RetryResult<T>>
    where
        T: Clone,
        Op: FnOnce() -> OpFut,
        OpFut: Future<Output = FabulaResult<T>>,
        V: FnMut(&T) -> ValidationResult,
        Rw: FnMut(T, ValidationResult, CancellationToken) -> RwFut,
        RwFut: Future<Output = FabulaResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(RetryError::new(RetryErrorKind::Cancelled).into());
        }

        let started = Instant::now();
        let mut attempts = Vec::new();

        let attempt_started = Instant::now();
        let mut current = operation().await.map_err(|e| {
            if e.is_cancelled() {
                e
            } else {
                RetryError::new(RetryErrorKind::OperationFailed(e.message())).into()
            }
        })?;
        let mut validation = validate(&current);
        attempts.push(RetryAttempt::new(
            1,
            attempt_started.elapsed(),
            validation.error_messages(),
        ));

        let mut attempt: u32 = 1;
        while !validation.is_valid() {
            let context = RetryContext::from_validation(&validation, started.elapsed());
            if attempt > self.policy.max_retries() || !self.policy.should_retry(attempt, &context)
            {
                debug!(attempt, "Policy declined further retries");
                break;
            }

            self.policy.on_retry(attempt, &context);
            let delay = self.policy.get_delay(attempt);
            wait(delay, cancel).await?;

            attempt += 1;
            let attempt_started = Instant::now();
            match rewrite(current.clone(), validation.clone(), cancel.clone()).await {
                Ok(next) => {
                    validation = validate(&next);
                    current = next;
                    attempts.push(RetryAttempt::new(
                        attempt,
                        attempt_started.elapsed(),
                        validation.error_messages(),
                    ));
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    let message = e.message();
                    warn!(attempt, error = %message, "Rewrite failed");
                    attempts.push(RetryAttempt::new(
                        attempt,
                        attempt_started.elapsed(),
                        vec![message],
                    ));
                }
            }
        }

        let success = validation.is_valid();
        let total_duration = started.elapsed();
        info!(
            success,
            attempts = attempts.len(),
            duration_ms = total_duration.as_millis() as u64,
            "Retry loop finished"
        );
        Ok(RetryResult::new(current, validation, attempts, total_duration))
    }
}

async fn wait(delay: Duration, cancel: &CancellationToken) -> FabulaResult<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Backoff wait cancelled");
            Err(RetryError::new(RetryErrorKind::Cancelled).into())
        }
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
