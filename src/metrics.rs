//! Aggregate Metrics
//!
//! Run-wide counters and latency samples shared by every worker. One
//! mutex guards the whole aggregate so the per-attempt fold is atomic:
//! counts, the sample log and the error breakdown can never drift apart
//! under concurrent updates. Network calls happen outside the lock.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Shared accumulator for attempt outcomes. Created zero-initialized
/// once per run, never reset, read only after all workers have joined.
#[derive(Debug, Default)]
pub struct AggregateMetrics {
    inner: Mutex<MetricsSnapshot>,
}

/// Point-in-time copy of the aggregate. Also serves as the inner state
/// behind the mutex.
#[derive(Debug, Default, Clone)]
pub struct MetricsSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub idempotent_hits: u64,
    pub total_latency: Duration,
    pub latency_samples: Vec<Duration>,
    pub error_counts: HashMap<String, u64>,
}

impl MetricsSnapshot {
    /// Completed attempts recorded so far.
    pub fn total_attempts(&self) -> u64 {
        self.success_count + self.failure_count
    }
}

impl AggregateMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed attempt into the aggregate. Exactly one call
    /// per attempt keeps the invariant
    /// `success_count + failure_count == latency_samples.len()`.
    pub fn record_attempt(
        &self,
        success: bool,
        latency: Duration,
        error_tag: Option<String>,
        idempotent_hit: bool,
    ) {
        let mut inner = self.lock();
        if success {
            inner.success_count += 1;
        } else {
            inner.failure_count += 1;
        }
        if idempotent_hit {
            inner.idempotent_hits += 1;
        }
        inner.total_latency += latency;
        inner.latency_samples.push(latency);
        if let Some(tag) = error_tag {
            *inner.error_counts.entry(tag).or_insert(0) += 1;
        }
    }

    /// Copy of the current aggregate state.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.lock().clone()
    }

    // A worker that panicked mid-fold cannot leave a half-applied
    // attempt (the fold mutates under one lock hold), so a poisoned
    // mutex is still internally consistent.
    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_and_samples_stay_in_step() {
        let metrics = AggregateMetrics::new();
        metrics.record_attempt(true, Duration::from_millis(10), None, false);
        metrics.record_attempt(true, Duration::from_millis(20), None, true);
        metrics.record_attempt(false, Duration::from_millis(30), Some("HTTP_500".into()), false);

        let snap = metrics.snapshot();
        assert_eq!(snap.success_count, 2);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.total_attempts(), 3);
        assert_eq!(snap.latency_samples.len() as u64, snap.total_attempts());
        assert_eq!(snap.idempotent_hits, 1);
        assert_eq!(snap.total_latency, Duration::from_millis(60));
        assert_eq!(snap.error_counts.get("HTTP_500"), Some(&1));
    }

    #[test]
    fn error_tags_accumulate_per_tag() {
        let metrics = AggregateMetrics::new();
        for _ in 0..3 {
            metrics.record_attempt(false, Duration::from_millis(1), Some("HTTP_500".into()), false);
        }
        metrics.record_attempt(false, Duration::from_millis(1), Some("TRANSPORT".into()), false);

        let snap = metrics.snapshot();
        assert_eq!(snap.error_counts.get("HTTP_500"), Some(&3));
        assert_eq!(snap.error_counts.get("TRANSPORT"), Some(&1));
        assert_eq!(snap.failure_count, 4);
    }

    #[test]
    fn concurrent_folds_lose_nothing() {
        let metrics = Arc::new(AggregateMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let metrics = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    metrics.record_attempt(
                        i % 2 == 0,
                        Duration::from_micros(i),
                        (i % 2 != 0).then(|| "HTTP_429".to_string()),
                        false,
                    );
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snap = metrics.snapshot();
        assert_eq!(snap.total_attempts(), 800);
        assert_eq!(snap.success_count, 400);
        assert_eq!(snap.failure_count, 400);
        assert_eq!(snap.latency_samples.len(), 800);
        assert_eq!(snap.error_counts.get("HTTP_429"), Some(&400));
    }
}
