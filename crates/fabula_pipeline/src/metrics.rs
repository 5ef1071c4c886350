//! Metrics collection for pipeline runs.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Metrics collector for pipeline runs.
///
/// Cloning shares the underlying counters.
///
/// # Examples
///
/// ```
/// use fabula_pipeline::PipelineMetrics;
///
/// let metrics = PipelineMetrics::new();
/// metrics.record_run();
/// metrics.record_success();
/// assert_eq!(metrics.snapshot().runs, 1);
/// assert_eq!(metrics.success_rate(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    inner: Arc<PipelineMetricsInner>,
}

#[derive(Debug)]
struct PipelineMetricsInner {
    // Run outcomes
    runs: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    cancellations: AtomicU64,

    // Work done inside runs
    retries: AtomicU64,
    agent_calls: AtomicU64,
    agent_failures: AtomicU64,

    last_success: parking_lot::Mutex<Option<Instant>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    /// Creates a new metrics collector.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PipelineMetricsInner {
                runs: AtomicU64::new(0),
                successes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                cancellations: AtomicU64::new(0),
                retries: AtomicU64::new(0),
                agent_calls: AtomicU64::new(0),
                agent_failures: AtomicU64::new(0),
                last_success: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Records the start of a run.
    pub fn record_run(&self) {
        self.inner.runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a successful run.
    pub fn record_success(&self) {
        self.inner.successes.fetch_add(1, Ordering::Relaxed);
        *self.inner.last_success.lock() = Some(Instant::now());
    }

    /// Records a failed run.
    pub fn record_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cancelled run.
    pub fn record_cancellation(&self) {
        self.inner.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    /// Records retry attempts.
    pub fn record_retries(&self, count: u32) {
        self.inner
            .retries
            .fetch_add(u64::from(count), Ordering::Relaxed);
    }

    /// Records agent calls and how many of them failed.
    pub fn record_agent_calls(&self, calls: usize, failures: usize) {
        self.inner
            .agent_calls
            .fetch_add(calls as u64, Ordering::Relaxed);
        self.inner
            .agent_failures
            .fetch_add(failures as u64, Ordering::Relaxed);
    }

    /// Gets the run count.
    pub fn runs(&self) -> u64 {
        self.inner.runs.load(Ordering::Relaxed)
    }

    /// Gets the successful run count.
    pub fn successes(&self) -> u64 {
        self.inner.successes.load(Ordering::Relaxed)
    }

    /// Gets the failed run count.
    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// Gets the cancelled run count.
    pub fn cancellations(&self) -> u64 {
        self.inner.cancellations.load(Ordering::Relaxed)
    }

    /// Gets time since the last successful run.
    pub fn time_since_success(&self) -> Option<std::time::Duration> {
        self.inner
            .last_success
            .lock()
            .map(|instant| instant.elapsed())
    }

    /// Gets the share of finished runs that succeeded (0.0 - 1.0).
    pub fn success_rate(&self) -> f64 {
        let finished = self.successes() + self.failures();
        if finished == 0 {
            return 1.0;
        }
        self.successes() as f64 / finished as f64
    }

    /// Creates a serializable snapshot of current metrics.
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            runs: self.runs(),
            successes: self.successes(),
            failures: self.failures(),
            cancellations: self.cancellations(),
            retries: self.inner.retries.load(Ordering::Relaxed),
            agent_calls: self.inner.agent_calls.load(Ordering::Relaxed),
            agent_failures: self.inner.agent_failures.load(Ordering::Relaxed),
            seconds_since_success: self.time_since_success().map(|d| d.as_secs()),
        }
    }
}

/// Serializable snapshot of pipeline metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineMetricsSnapshot {
    /// Runs started
    pub runs: u64,
    /// Runs that succeeded
    pub successes: u64,
    /// Runs that finished without valid output
    pub failures: u64,
    /// Runs stopped by cancellation
    pub cancellations: u64,
    /// Retry attempts across all runs
    pub retries: u64,
    /// Agent calls across all runs
    pub agent_calls: u64,
    /// Agent calls that failed
    pub agent_failures: u64,
    /// Seconds since the last successful run
    pub seconds_since_success: Option<u64>,
}
