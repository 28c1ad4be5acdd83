//! Run Report
//!
//! Derived statistics over the final metrics snapshot. Pure
//! computation: nothing here mutates the aggregate. Percentiles use the
//! nearest-rank method, indexing the ascending-sorted samples at
//! `floor(p * len)` so results are reproducible sample-for-sample.

use crate::metrics::MetricsSnapshot;
use std::time::Duration;
use tracing::info;

/// Final statistics for one harness run.
#[derive(Debug, Clone)]
pub struct StressReport {
    pub total_attempts: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub idempotent_hits: u64,
    /// Fraction of attempts that succeeded, 0 when nothing ran
    pub success_rate: f64,
    /// Fraction of successful attempts that were server-side dedup hits
    pub idempotent_hit_rate: f64,
    pub avg_latency_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    /// Attempts per wall-clock second across the whole pool
    pub throughput_rps: f64,
    pub elapsed: Duration,
    /// Error tag -> occurrence count, sorted by tag for stable output
    pub error_counts: Vec<(String, u64)>,
}

impl StressReport {
    pub fn from_snapshot(snapshot: &MetricsSnapshot, elapsed: Duration) -> Self {
        let total = snapshot.total_attempts();

        let success_rate = if total > 0 {
            snapshot.success_count as f64 / total as f64
        } else {
            0.0
        };
        let idempotent_hit_rate = if snapshot.success_count > 0 {
            snapshot.idempotent_hits as f64 / snapshot.success_count as f64
        } else {
            0.0
        };
        let avg_latency_ms = if total > 0 {
            snapshot.total_latency.as_secs_f64() * 1000.0 / total as f64
        } else {
            0.0
        };
        let throughput_rps = if elapsed.as_secs_f64() > 0.0 {
            total as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let mut sorted = snapshot.latency_samples.clone();
        sorted.sort_unstable();

        let mut error_counts: Vec<(String, u64)> = snapshot
            .error_counts
            .iter()
            .map(|(tag, count)| (tag.clone(), *count))
            .collect();
        error_counts.sort();

        Self {
            total_attempts: total,
            success_count: snapshot.success_count,
            failure_count: snapshot.failure_count,
            idempotent_hits: snapshot.idempotent_hits,
            success_rate,
            idempotent_hit_rate,
            avg_latency_ms,
            p50_ms: nearest_rank_ms(&sorted, 0.50),
            p95_ms: nearest_rank_ms(&sorted, 0.95),
            p99_ms: nearest_rank_ms(&sorted, 0.99),
            throughput_rps,
            elapsed,
            error_counts,
        }
    }

    /// Log the full report. Always prints complete statistics, even when
    /// every attempt failed.
    pub fn render(&self) {
        info!("========== STRESS TEST RESULTS ==========");
        info!("Total execution time: {:.2} seconds", self.elapsed.as_secs_f64());
        info!("Total requests: {}", self.total_attempts);
        info!("Successful transfers: {}", self.success_count);
        info!("Failed transfers: {}", self.failure_count);
        info!("Success rate: {:.2}%", self.success_rate * 100.0);
        info!(
            "Idempotent hits: {} ({:.2}% of successful)",
            self.idempotent_hits,
            self.idempotent_hit_rate * 100.0
        );
        info!("Average response time: {:.2} ms", self.avg_latency_ms);
        info!("Response time P50: {:.2} ms", self.p50_ms);
        info!("Response time P95: {:.2} ms", self.p95_ms);
        info!("Response time P99: {:.2} ms", self.p99_ms);
        info!("Throughput: {:.2} requests/second", self.throughput_rps);

        if !self.error_counts.is_empty() {
            info!("Error breakdown:");
            for (tag, count) in &self.error_counts {
                info!("  {tag}: {count} occurrences");
            }
        }
        info!("=========================================");
    }
}

/// Nearest-rank percentile over ascending-sorted samples: index
/// `floor(p * len)`, clamped to the last element. Zero when empty.
fn nearest_rank_ms(sorted: &[Duration], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p * sorted.len() as f64).floor() as usize).min(sorted.len() - 1);
    sorted[idx].as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn snapshot_with_samples(samples_ms: &[u64]) -> MetricsSnapshot {
        let latency_samples: Vec<Duration> =
            samples_ms.iter().map(|&ms| Duration::from_millis(ms)).collect();
        MetricsSnapshot {
            success_count: samples_ms.len() as u64,
            failure_count: 0,
            idempotent_hits: 0,
            total_latency: latency_samples.iter().sum(),
            latency_samples,
            error_counts: HashMap::new(),
        }
    }

    #[test]
    fn nearest_rank_matches_reference_indices() {
        // For [10,20,30,40,50]: P50 index = floor(0.5*5) = 2 -> 30ms
        let snap = snapshot_with_samples(&[10, 20, 30, 40, 50]);
        let report = StressReport::from_snapshot(&snap, Duration::from_secs(1));
        assert_eq!(report.p50_ms, 30.0);
        // floor(0.95*5) = 4 -> 50ms, floor(0.99*5) = 4 -> 50ms
        assert_eq!(report.p95_ms, 50.0);
        assert_eq!(report.p99_ms, 50.0);
    }

    #[test]
    fn percentiles_sort_unordered_samples() {
        let snap = snapshot_with_samples(&[50, 10, 40, 20, 30]);
        let report = StressReport::from_snapshot(&snap, Duration::from_secs(1));
        assert_eq!(report.p50_ms, 30.0);
    }

    #[test]
    fn empty_run_reports_zeroes() {
        let snap = MetricsSnapshot::default();
        let report = StressReport::from_snapshot(&snap, Duration::from_secs(1));
        assert_eq!(report.total_attempts, 0);
        assert_eq!(report.success_rate, 0.0);
        assert_eq!(report.idempotent_hit_rate, 0.0);
        assert_eq!(report.avg_latency_ms, 0.0);
        assert_eq!(report.p50_ms, 0.0);
        assert_eq!(report.throughput_rps, 0.0);
    }

    #[test]
    fn rates_and_throughput() {
        let mut snap = snapshot_with_samples(&[10, 10, 10, 10]);
        snap.success_count = 3;
        snap.failure_count = 1;
        snap.idempotent_hits = 1;
        let report = StressReport::from_snapshot(&snap, Duration::from_secs(2));

        assert_eq!(report.total_attempts, 4);
        assert!((report.success_rate - 0.75).abs() < 1e-9);
        assert!((report.idempotent_hit_rate - 1.0 / 3.0).abs() < 1e-9);
        assert!((report.throughput_rps - 2.0).abs() < 1e-9);
        assert!((report.avg_latency_ms - 10.0).abs() < 1e-9);
    }

    #[test]
    fn error_breakdown_is_sorted_by_tag() {
        let mut snap = snapshot_with_samples(&[5, 5]);
        snap.success_count = 0;
        snap.failure_count = 2;
        snap.error_counts.insert("TRANSPORT".to_string(), 1);
        snap.error_counts.insert("HTTP_500".to_string(), 1);
        let report = StressReport::from_snapshot(&snap, Duration::from_secs(1));

        let tags: Vec<&str> = report.error_counts.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tags, vec!["HTTP_500", "TRANSPORT"]);
    }

    #[test]
    fn single_sample_is_every_percentile() {
        let snap = snapshot_with_samples(&[42]);
        let report = StressReport::from_snapshot(&snap, Duration::from_secs(1));
        assert_eq!(report.p50_ms, 42.0);
        assert_eq!(report.p95_ms, 42.0);
        assert_eq!(report.p99_ms, 42.0);
    }
}
