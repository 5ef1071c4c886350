//! Serde-configurable retry policy settings.

use crate::{
    ConditionalRetryPolicy, ExponentialBackoffPolicy, NoRetryPolicy, RetryPolicy,
    SimpleRetryPolicy,
};
use fabula_error::{FabulaResult, RetryError, RetryErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Retry policy as written in a configuration file.
///
/// # Examples
///
/// ```toml
/// [retry]
/// kind = "exponential"
/// max_retries = 3
/// initial_delay_ms = 250
/// multiplier = 2.0
/// max_delay_ms = 2000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicyConfig {
    /// Never retry
    None,
    /// Fixed count and delay
    Simple {
        /// Upper bound on retries
        max_retries: u32,
        /// Delay between attempts
        #[serde(default)]
        delay_ms: u64,
    },
    /// Exponential backoff with an optional cap
    Exponential {
        /// Upper bound on retries
        max_retries: u32,
        /// Delay before the first retry
        initial_delay_ms: u64,
        /// Growth factor per retry
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        /// Cap on any single delay
        #[serde(default)]
        max_delay_ms: Option<u64>,
    },
    /// Retry only when an error message matches a pattern
    Conditional {
        /// Upper bound on retries
        max_retries: u32,
        /// Delay between attempts
        #[serde(default)]
        delay_ms: u64,
        /// Case-insensitive substrings that make an error retryable
        patterns: Vec<String>,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        RetryPolicyConfig::Simple {
            max_retries: 2,
            delay_ms: 0,
        }
    }
}

impl RetryPolicyConfig {
    /// Builds the configured policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the exponential multiplier is unusable or a
    /// conditional policy lists no patterns.
    pub fn into_policy(self) -> FabulaResult<Arc<dyn RetryPolicy>> {
        let policy: Arc<dyn RetryPolicy> = match self {
            RetryPolicyConfig::None => Arc::new(NoRetryPolicy),
            RetryPolicyConfig::Simple {
                max_retries,
                delay_ms,
            } => Arc::new(SimpleRetryPolicy::new(
                max_retries,
                Duration::from_millis(delay_ms),
            )),
            RetryPolicyConfig::Exponential {
                max_retries,
                initial_delay_ms,
                multiplier,
                max_delay_ms,
            } => {
                let policy = ExponentialBackoffPolicy::new(
                    max_retries,
                    Duration::from_millis(initial_delay_ms),
                    multiplier,
                )?;
                match max_delay_ms {
                    Some(cap) => Arc::new(policy.with_max_delay(Duration::from_millis(cap))),
                    None => Arc::new(policy),
                }
            }
            RetryPolicyConfig::Conditional {
                max_retries,
                delay_ms,
                patterns,
            } => {
                if patterns.iter().all(|p| p.trim().is_empty()) {
                    return Err(RetryError::new(RetryErrorKind::InvalidPolicy(
                        "conditional policy needs at least one pattern".to_string(),
                    ))
                    .into());
                }
                Arc::new(ConditionalRetryPolicy::from_patterns(
                    max_retries,
                    Duration::from_millis(delay_ms),
                    patterns,
                ))
            }
        };
        Ok(policy)
    }
}
