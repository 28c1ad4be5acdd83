//! ledger-stress - Concurrent Idempotent-Transfer Stress Harness
//!
//! Drives many simultaneous clients against a money-transfer endpoint,
//! deliberately replays a fraction of requests under identical
//! idempotency keys, and verifies balance conservation afterwards.
//!
//! # Modules
//!
//! - [`config`] - Workload tunables and logging settings
//! - [`client`] - Transfer Client and wire types
//! - [`metrics`] - Shared aggregate updated by all workers
//! - [`worker`] - Attempt loop with the key-duplication strategy
//! - [`runner`] - Pool scheduling, bootstrap and join barrier
//! - [`report`] - Derived statistics (rates, percentiles, throughput)
//! - [`verify`] - Post-run balance-conservation check

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod verify;
pub mod worker;

// Convenient re-exports at crate root
pub use client::{AttemptResult, IdempotencyKey, TransferClient, TransferRequest};
pub use config::HarnessConfig;
pub use error::HarnessError;
pub use metrics::{AggregateMetrics, MetricsSnapshot};
pub use report::StressReport;
pub use runner::{HarnessSummary, RunOutcome, Runner};
pub use verify::{AccountBalance, VerificationOutcome, Verifier};
pub use worker::Worker;
