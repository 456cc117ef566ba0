use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Point-in-time view of the aggregated extraction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct ExtractorStats {
    /// Attempts that found a matching resource URL.
    pub successful: u64,

    /// Attempts that did not.
    pub failed: u64,

    /// Cumulative wall-clock time of successful attempts, in milliseconds.
    pub total_time_ms: u64,

    /// Mean successful-attempt duration; zero while nothing has succeeded.
    pub average_time_ms: f64,
}

#[derive(Debug, Default)]
struct StatsInner {
    successful: u64,
    failed: u64,
    total_time: Duration,
}

/// Running counters shared by every in-flight task.
///
/// Counters only grow; [`reset`](Self::reset) is the single way back to
/// zero. A std mutex guards the cell — the critical sections contain no
/// await points, so increments stay exact on a multi-threaded runtime.
#[derive(Clone, Default)]
pub struct StatsRecorder {
    inner: Arc<Mutex<StatsInner>>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the inner mutex lock, recovering from poison if necessary.
    fn lock_inner(&self) -> std::sync::MutexGuard<'_, StatsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned stats mutex");
            poisoned.into_inner()
        })
    }

    pub fn record_success(&self, elapsed: Duration) {
        let mut inner = self.lock_inner();
        inner.successful += 1;
        inner.total_time += elapsed;
    }

    pub fn record_failure(&self) {
        self.lock_inner().failed += 1;
    }

    pub fn snapshot(&self) -> ExtractorStats {
        let inner = self.lock_inner();
        let total_ms = inner.total_time.as_millis() as u64;
        ExtractorStats {
            successful: inner.successful,
            failed: inner.failed,
            total_time_ms: total_ms,
            average_time_ms: if inner.successful == 0 {
                0.0
            } else {
                total_ms as f64 / inner.successful as f64
            },
        }
    }

    pub fn reset(&self) {
        *self.lock_inner() = StatsInner::default();
    }
}
