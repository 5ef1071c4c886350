//! Retry policies: whether to try again and how long to wait first.

use crate::RetryContext;
use fabula_error::{FabulaResult, RetryError, RetryErrorKind};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Strategy consulted by the retry engine after every failed validation.
///
/// Attempt numbers are 1-based and count the calls made so far, so the first
/// decision is made with `attempt = 1`.
pub trait RetryPolicy: Send + Sync + fmt::Debug {
    /// Upper bound on the number of retries.
    fn max_retries(&self) -> u32;

    /// Whether another attempt should be made.
    fn should_retry(&self, attempt: u32, context: &RetryContext) -> bool;

    /// How long to wait before the next attempt.
    fn get_delay(&self, attempt: u32) -> Duration;

    /// Observability hook fired right before the wait.
    fn on_retry(&self, _attempt: u32, _context: &RetryContext) {}
}

/// Never retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoRetryPolicy;

impl RetryPolicy for NoRetryPolicy {
    fn max_retries(&self) -> u32 {
        0
    }

    fn should_retry(&self, _attempt: u32, _context: &RetryContext) -> bool {
        false
    }

    fn get_delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

/// Fixed number of retries with a fixed delay.
///
/// A context without error messages never triggers a retry.
///
/// # Examples
///
/// ```
/// use fabula_retry::{RetryContext, RetryPolicy, SimpleRetryPolicy};
/// use std::time::Duration;
///
/// let policy = SimpleRetryPolicy::new(2, Duration::from_millis(50));
/// let failing = RetryContext::from_messages(vec!["too short".into()], vec![], Duration::ZERO);
/// let clean = RetryContext::from_messages(vec![], vec![], Duration::ZERO);
///
/// assert!(policy.should_retry(2, &failing));
/// assert!(!policy.should_retry(3, &failing));
/// assert!(!policy.should_retry(1, &clean));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleRetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl SimpleRetryPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl RetryPolicy for SimpleRetryPolicy {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, attempt: u32, context: &RetryContext) -> bool {
        attempt <= self.max_retries && context.has_errors()
    }

    fn get_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn on_retry(&self, attempt: u32, context: &RetryContext) {
        warn!(
            attempt,
            max_retries = self.max_retries,
            errors = context.errors().len(),
            delay_ms = self.delay.as_millis() as u64,
            "Retrying after failed validation"
        );
    }
}

/// Exponential backoff with an optional cap.
///
/// The delay before retry `n` is `initial_delay * multiplier^(n-1)`, clamped
/// to the cap when one is set.
///
/// # Examples
///
/// ```
/// use fabula_retry::{ExponentialBackoffPolicy, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = ExponentialBackoffPolicy::new(3, Duration::from_millis(100), 10.0)
///     .unwrap()
///     .with_max_delay(Duration::from_secs(1));
///
/// assert_eq!(policy.get_delay(1), Duration::from_millis(100));
/// assert_eq!(policy.get_delay(2), Duration::from_millis(1000));
/// assert_eq!(policy.get_delay(3), Duration::from_millis(1000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoffPolicy {
    max_retries: u32,
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoffPolicy {
    /// Creates an uncapped policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the multiplier is below 1 or not finite.
    #[track_caller]
    pub fn new(max_retries: u32, initial_delay: Duration, multiplier: f64) -> FabulaResult<Self> {
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(RetryError::new(RetryErrorKind::InvalidPolicy(format!(
                "multiplier must be a finite number >= 1, got {multiplier}"
            )))
            .into());
        }
        Ok(Self {
            max_retries,
            initial_delay,
            multiplier,
            max_delay: None,
        })
    }

    /// Builder method to cap every delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }
}

impl RetryPolicy for ExponentialBackoffPolicy {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, attempt: u32, _context: &RetryContext) -> bool {
        attempt <= self.max_retries
    }

    fn get_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let nanos = self.initial_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        let delay = if nanos >= u64::MAX as f64 {
            Duration::from_nanos(u64::MAX)
        } else {
            Duration::from_nanos(nanos.round() as u64)
        };
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    fn on_retry(&self, attempt: u32, context: &RetryContext) {
        warn!(
            attempt,
            max_retries = self.max_retries,
            errors = context.errors().len(),
            delay_ms = self.get_delay(attempt).as_millis() as u64,
            "Backing off before retry"
        );
    }
}

type RetryPredicate = dyn Fn(&RetryContext) -> bool + Send + Sync;

/// Retries only while a predicate over the context holds.
///
/// # Examples
///
/// ```
/// use fabula_retry::{ConditionalRetryPolicy, RetryContext, RetryPolicy};
/// use std::time::Duration;
///
/// let policy = ConditionalRetryPolicy::from_patterns(3, Duration::ZERO, ["timeout", "temporary"]);
/// let transient = RetryContext::from_messages(vec!["Request TIMEOUT".into()], vec![], Duration::ZERO);
/// let permanent = RetryContext::from_messages(vec!["bad prompt".into()], vec![], Duration::ZERO);
///
/// assert!(policy.should_retry(1, &transient));
/// assert!(!policy.should_retry(1, &permanent));
/// ```
#[derive(Clone)]
pub struct ConditionalRetryPolicy {
    max_retries: u32,
    delay: Duration,
    predicate: Arc<RetryPredicate>,
}

impl ConditionalRetryPolicy {
    /// Creates a policy from an arbitrary predicate.
    pub fn new<F>(max_retries: u32, delay: Duration, predicate: F) -> Self
    where
        F: Fn(&RetryContext) -> bool + Send + Sync + 'static,
    {
        Self {
            max_retries,
            delay,
            predicate: Arc::new(predicate),
        }
    }

    /// Retries when any error message contains any of the patterns, ignoring case.
    pub fn from_patterns<I, S>(max_retries: u32, delay: Duration, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self::new(max_retries, delay, move |context: &RetryContext| {
            context.errors().iter().any(|error| {
                let error = error.to_lowercase();
                patterns.iter().any(|p| error.contains(p.as_str()))
            })
        })
    }
}

impl fmt::Debug for ConditionalRetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalRetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy for ConditionalRetryPolicy {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, attempt: u32, context: &RetryContext) -> bool {
        attempt <= self.max_retries && (self.predicate)(context)
    }

    fn get_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn on_retry(&self, attempt: u32, context: &RetryContext) {
        warn!(
            attempt,
            max_retries = self.max_retries,
            errors = ?context.errors(),
            "Retry condition matched"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_survives_huge_exponents() {
        let policy = ExponentialBackoffPolicy::new(u32::MAX, Duration::from_secs(1), 2.0)
            .expect("valid multiplier");
        assert_eq!(policy.get_delay(10_000), Duration::from_nanos(u64::MAX));

        let capped = policy.with_max_delay(Duration::from_secs(30));
        assert_eq!(capped.get_delay(10_000), Duration::from_secs(30));
    }

    #[test]
    fn backoff_rejects_shrinking_multiplier() {
        assert!(ExponentialBackoffPolicy::new(3, Duration::from_millis(10), 0.5).is_err());
        assert!(ExponentialBackoffPolicy::new(3, Duration::from_millis(10), f64::NAN).is_err());
    }

    #[test]
    fn empty_patterns_never_match() {
        let policy = ConditionalRetryPolicy::from_patterns(3, Duration::ZERO, [""]);
        let context = RetryContext::from_messages(vec!["anything".into()], vec![], Duration::ZERO);
        assert!(!policy.should_retry(1, &context));
    }
}
