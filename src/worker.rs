//! Stress Worker
//!
//! One worker runs a fixed sequence of transfer attempts: random
//! participant pair, fresh-or-replayed idempotency key, one client call,
//! one fold into the shared aggregate, then an optional jittered think
//! time. Attempts inside a worker are strictly sequential; workers only
//! meet each other at the metrics mutex.
//!
//! Key replay is deliberately worker-local. Each worker keeps its own
//! used-key list and replays only keys it issued itself, so a replayed
//! key always names a logical transfer this worker already attempted.

use crate::client::{IdempotencyKey, TransferClient, TransferRequest};
use crate::config::HarnessConfig;
use crate::metrics::AggregateMetrics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

pub struct Worker {
    id: usize,
    config: Arc<HarnessConfig>,
    client: Arc<TransferClient>,
    metrics: Arc<AggregateMetrics>,
    rng: StdRng,
    used_keys: Vec<IdempotencyKey>,
}

impl Worker {
    /// Build a worker. With a configured seed every worker gets its own
    /// deterministic RNG stream; otherwise entropy seeding.
    pub fn new(
        id: usize,
        config: Arc<HarnessConfig>,
        client: Arc<TransferClient>,
        metrics: Arc<AggregateMetrics>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id as u64)),
            None => StdRng::from_entropy(),
        };
        Self {
            id,
            config,
            client,
            metrics,
            rng,
            used_keys: Vec::new(),
        }
    }

    /// Execute all attempts, folding each into the shared aggregate.
    pub async fn run(mut self) {
        info!(
            "Worker {} starting {} transfer attempts",
            self.id, self.config.attempts_per_worker
        );

        for attempt in 0..self.config.attempts_per_worker {
            let (from, to) = self.pick_pair();
            let request = TransferRequest {
                from_user_id: from.clone(),
                from_type: self.config.account_type.clone(),
                to_user_id: to.clone(),
                to_type: self.config.account_type.clone(),
                amount: self.config.transfer_amount,
                description: format!("Stress test transfer T{}-R{attempt}", self.id),
            };

            let (key, replayed) = self.next_key(attempt);
            if replayed {
                info!("Worker {} replaying idempotency key: {key}", self.id);
            }

            let result = self.client.transfer(&request, &key).await;

            let idempotent_hit = replayed && result.success && result.is_idempotent_replay();
            if result.success {
                if idempotent_hit {
                    info!("Worker {} idempotent hit detected", self.id);
                }
                info!(
                    "Worker {} transfer success: {from} -> {to} ({:.1}ms)",
                    self.id,
                    result.latency.as_secs_f64() * 1000.0
                );
            } else {
                warn!(
                    "Worker {} transfer failed: {} - {}",
                    self.id,
                    result.error_tag(),
                    result.body.chars().take(100).collect::<String>()
                );
            }

            let error_tag = (!result.success).then(|| result.error_tag());
            self.metrics
                .record_attempt(result.success, result.latency, error_tag, idempotent_hit);

            self.maybe_think().await;
        }

        info!(
            "Worker {} completed {} transfers",
            self.id, self.config.attempts_per_worker
        );
    }

    /// Uniform random (source, destination) with self-transfers
    /// excluded. Requires at least two participants, validated before
    /// any worker starts.
    fn pick_pair(&mut self) -> (String, String) {
        let participants = &self.config.participants;
        let from_idx = self.rng.gen_range(0..participants.len());
        let mut to_idx = self.rng.gen_range(0..participants.len() - 1);
        if to_idx >= from_idx {
            to_idx += 1;
        }
        (participants[from_idx].clone(), participants[to_idx].clone())
    }

    /// Duplication decision. Returns the key for this attempt and
    /// whether it is a replay of a previously-used key. A replay draw
    /// against an empty key list falls back to the fresh key.
    fn next_key(&mut self, attempt: usize) -> (IdempotencyKey, bool) {
        let fresh = IdempotencyKey::generate(self.id, attempt);
        let replay_drawn = self.rng.gen_range(1..=100) <= self.config.duplicate_percent;

        if replay_drawn && !self.used_keys.is_empty() {
            let idx = self.rng.gen_range(0..self.used_keys.len());
            (self.used_keys[idx].clone(), true)
        } else {
            self.used_keys.push(fresh.clone());
            (fresh, false)
        }
    }

    /// Jittered inter-attempt delay emulating realistic arrival spacing.
    async fn maybe_think(&mut self) {
        if self.config.think_percent == 0 {
            return;
        }
        if self.rng.gen_range(1..=100) <= self.config.think_percent {
            let ms = self
                .rng
                .gen_range(self.config.think_min_ms..=self.config.think_max_ms);
            sleep(Duration::from_millis(ms)).await;
        }
    }
}
