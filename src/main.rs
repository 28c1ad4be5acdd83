//! ledger-stress - Concurrent Idempotent-Transfer Stress Harness
//!
//! Entry point. Sequence:
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  Health  │──▶│   Fund   │──▶│ Workers  │──▶│  Verify  │
//! │  probe   │   │ accounts │   │ (pool)   │   │ balances │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! Exit codes: non-zero when the health probe fails, when configuration
//! preconditions fail, when a balance cannot be read, or when balance
//! conservation does not hold. Individual failed transfer attempts only
//! show up in the statistics.

use std::process::ExitCode;

use ledger_stress::config::HarnessConfig;
use ledger_stress::{logging, runner};
use tracing::{error, info};

// ============================================================
// CLI ARGUMENTS
// ============================================================

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get target override from command line (--base-url argument)
fn get_base_url_override() -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--base-url" && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

/// Get RNG seed override from command line (--seed argument)
fn get_seed_override() -> Option<u64> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--seed" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> ExitCode {
    let env = get_env();
    let mut config = match HarnessConfig::load_or_default(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config for env '{env}': {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(base_url) = get_base_url_override() {
        config.base_url = base_url;
    }
    if let Some(seed) = get_seed_override() {
        config.seed = Some(seed);
    }

    let _guard = logging::init_logging(&config);

    info!("Ledger stress harness");
    info!("Target: {}", config.base_url);
    info!("Concurrent workers: {}", config.workers);
    info!("Transfers per worker: {}", config.attempts_per_worker);
    info!(
        "Total transfers: {}",
        config.workers * config.attempts_per_worker
    );
    info!("Duplicate key percentage: {}%", config.duplicate_percent);
    info!("Initial balance per account: {:.2}", config.initial_balance);
    info!("Transfer amount: {:.2}", config.transfer_amount);
    info!("Participants: {}", config.participants.len());

    match runner::execute(config).await {
        Ok(summary) => {
            if summary.verification.passed {
                ExitCode::SUCCESS
            } else {
                // Conservation failure is CI-relevant even though the
                // report already printed in full.
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Harness aborted: {e}");
            ExitCode::FAILURE
        }
    }
}
