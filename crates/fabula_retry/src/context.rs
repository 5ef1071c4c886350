//! Values exchanged between the retry engine and its policies.

use fabula_core::{Metadata, ValidationResult};
use fabula_error::{FabulaResult, RetryError, RetryErrorKind};
use std::time::Duration;

/// What a policy sees when deciding whether to retry.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RetryContext {
    /// Error messages from the latest validation
    errors: Vec<String>,
    /// Warning messages from the latest validation
    warnings: Vec<String>,
    /// Time spent so far in the retry call
    elapsed: Duration,
    /// Validation metadata
    metadata: Metadata,
    #[getter(skip)]
    critical: bool,
}

impl RetryContext {
    /// Builds a context from a validation result and the time spent so far.
    pub fn from_validation(validation: &ValidationResult, elapsed: Duration) -> Self {
        Self {
            errors: validation.error_messages(),
            warnings: validation.warning_messages(),
            elapsed,
            metadata: validation.metadata().clone(),
            critical: validation.has_critical(),
        }
    }

    /// Builds a context directly from messages, used by policies under test.
    pub fn from_messages(errors: Vec<String>, warnings: Vec<String>, elapsed: Duration) -> Self {
        Self {
            errors,
            warnings,
            elapsed,
            metadata: Metadata::new(),
            critical: false,
        }
    }

    /// Whether any error was graded critical.
    pub fn has_critical(&self) -> bool {
        self.critical
    }

    /// Whether the context carries at least one error message.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Record of one operation or rewrite call.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct RetryAttempt {
    /// 1-based attempt number
    number: u32,
    /// Whether the attempt produced a valid value
    #[getter(skip)]
    success: bool,
    /// Time spent producing and validating the value
    duration: Duration,
    /// Validation errors or the rewrite fault, empty on success
    errors: Vec<String>,
}

impl RetryAttempt {
    /// Creates an attempt record.
    pub fn new(number: u32, duration: Duration, errors: Vec<String>) -> Self {
        Self {
            number,
            success: errors.is_empty(),
            duration,
            errors,
        }
    }

    /// Whether the attempt produced a valid value.
    pub fn is_success(&self) -> bool {
        self.success
    }
}

/// Outcome of [`RetryEngine::execute_with_retry`](crate::RetryEngine::execute_with_retry).
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RetryResult<T> {
    /// Last value produced
    value: T,
    /// Whether the last value passed validation
    #[getter(skip)]
    success: bool,
    /// Validation of the last value
    validation: ValidationResult,
    /// Every attempt in order
    attempts: Vec<RetryAttempt>,
    /// Wall-clock span of the whole call, waits included
    total_duration: Duration,
}

impl<T> RetryResult<T> {
    pub(crate) fn new(
        value: T,
        validation: ValidationResult,
        attempts: Vec<RetryAttempt>,
        total_duration: Duration,
    ) -> Self {
        Self {
            value,
            success: validation.is_valid(),
            validation,
            attempts,
            total_duration,
        }
    }

    /// Whether the final value passed validation.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Number of operation and rewrite calls made.
    pub fn attempt_count(&self) -> u32 {
        u32::try_from(self.attempts.len()).unwrap_or(u32::MAX)
    }

    /// Whether more than one attempt was made.
    pub fn was_retried(&self) -> bool {
        self.attempts.len() > 1
    }

    /// Error messages from the validation of the last value.
    ///
    /// Unlike [`last_errors`](Self::last_errors), a faulted final rewrite
    /// does not replace these.
    pub fn validation_errors(&self) -> Vec<String> {
        self.validation.error_messages()
    }

    /// Errors recorded by the last attempt, rewrite faults included.
    pub fn last_errors(&self) -> &[String] {
        self.attempts
            .last()
            .map(|a| a.errors.as_slice())
            .unwrap_or_default()
    }

    /// Consumes the result, returning the final value regardless of success.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Consumes the result, returning the value only if it passed validation.
    ///
    /// # Errors
    ///
    /// Returns an error if every permitted attempt was used without success.
    pub fn into_result(self) -> FabulaResult<T> {
        if self.success {
            Ok(self.value)
        } else {
            Err(RetryError::new(RetryErrorKind::Exhausted(self.attempt_count())).into())
        }
    }
}
