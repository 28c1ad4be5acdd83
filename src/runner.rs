//! Scheduler / Runner
//!
//! Drives the whole harness: health probe, sequential account funding,
//! the parallel worker pool with join-all barrier semantics, and the
//! hand-off to reporting and verification. A single worker fault is
//! logged and must never abort its siblings; statistics are read only
//! after every worker has joined.

use crate::client::TransferClient;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::metrics::{AggregateMetrics, MetricsSnapshot};
use crate::report::StressReport;
use crate::verify::{VerificationOutcome, Verifier};
use crate::worker::Worker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info};

/// Workload result: final aggregate plus pool wall-clock time.
pub struct RunOutcome {
    pub snapshot: MetricsSnapshot,
    pub elapsed: Duration,
}

/// Everything a caller needs after a full harness run.
pub struct HarnessSummary {
    pub report: StressReport,
    pub verification: VerificationOutcome,
}

pub struct Runner {
    config: Arc<HarnessConfig>,
    client: Arc<TransferClient>,
}

impl Runner {
    /// Validates preconditions before anything concurrent can start.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        config.validate()?;
        let client = Arc::new(TransferClient::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Liveness probe. A failure aborts the run before any funding or
    /// transfer call is attempted.
    pub async fn check_health(&self) -> Result<(), HarnessError> {
        match self.client.health().await {
            Ok(()) => {
                info!("Application is healthy and ready");
                Ok(())
            }
            Err(e) => {
                error!("Health probe failed, aborting before workload: {e}");
                Err(e)
            }
        }
    }

    /// Fund every participant from the bank account, then wait for
    /// asynchronous writes to settle. Sequential, bootstrap timeouts.
    pub async fn fund_accounts(&self) -> Result<(), HarnessError> {
        info!("Setting up test accounts with initial balances");
        for participant in &self.config.participants {
            self.client.fund(&self.config, participant).await?;
            info!(
                "Funded account {participant} with {:.2}",
                self.config.initial_balance
            );
        }

        info!(
            "Waiting {}s for funding writes to settle",
            self.config.settle_delay_secs
        );
        sleep(Duration::from_secs(self.config.settle_delay_secs)).await;
        info!("Test account setup completed");
        Ok(())
    }

    /// Launch the worker pool and block until every worker has joined.
    /// A panicked worker is logged; the barrier still waits for the
    /// rest and their results stay in the aggregate.
    pub async fn run_workload(&self) -> RunOutcome {
        info!(
            "Starting stress run: {} workers x {} attempts ({}% duplicate keys)",
            self.config.workers, self.config.attempts_per_worker, self.config.duplicate_percent
        );

        let metrics = Arc::new(AggregateMetrics::new());
        let started = Instant::now();

        let mut handles = Vec::with_capacity(self.config.workers);
        for id in 0..self.config.workers {
            let worker = Worker::new(
                id,
                Arc::clone(&self.config),
                Arc::clone(&self.client),
                Arc::clone(&metrics),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        for (id, handle) in handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!("Worker {id} aborted: {e}");
            }
        }

        let elapsed = started.elapsed();
        info!("Stress run finished in {:.2}s", elapsed.as_secs_f64());

        RunOutcome {
            snapshot: metrics.snapshot(),
            elapsed,
        }
    }
}

/// Full harness sequence: health probe, funding, workload, report,
/// verification. `Err` covers pre-run aborts and unreadable balances; a
/// conservation mismatch is reported inside the summary.
pub async fn execute(config: HarnessConfig) -> Result<HarnessSummary, HarnessError> {
    let runner = Runner::new(config)?;

    runner.check_health().await?;
    runner.fund_accounts().await?;

    let outcome = runner.run_workload().await;
    let report = StressReport::from_snapshot(&outcome.snapshot, outcome.elapsed);
    report.render();

    let verifier = Verifier::new(Arc::clone(&runner.config), Arc::clone(&runner.client));
    let verification = verifier.verify().await?;

    Ok(HarnessSummary {
        report,
        verification,
    })
}
