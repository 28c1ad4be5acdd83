//! Harness Configuration
//!
//! Every knob of the reference workload is tunable here: target URL,
//! pool width, attempts per worker, duplicate-key probability, amounts,
//! participant set, timeouts, think-time shape, settle delay and the
//! balance-verification epsilon. Defaults reproduce the reference run.

use crate::error::HarnessError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HarnessConfig {
    // Logging
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,

    /// Base URL of the transfer service under test
    pub base_url: String,
    /// Account funding all participants during bootstrap
    pub bank_participant: String,
    /// Participant ids the workload transfers between (at least two)
    pub participants: Vec<String>,
    /// Account type used for every transfer and balance read
    pub account_type: String,

    // Workload shape
    pub workers: usize,
    pub attempts_per_worker: usize,
    /// Probability (0-100) that an attempt replays a previously-used key
    pub duplicate_percent: u32,
    pub initial_balance: Decimal,
    pub transfer_amount: Decimal,

    // Think time between attempts
    pub think_percent: u32,
    pub think_min_ms: u64,
    pub think_max_ms: u64,

    // Per-call timeouts and settle delay
    pub transfer_timeout_secs: u64,
    pub bootstrap_timeout_secs: u64,
    pub health_timeout_secs: u64,
    /// Wait after funding and before verification, for async persistence
    pub settle_delay_secs: u64,

    /// Absolute tolerance for the balance-conservation check
    pub balance_epsilon: Decimal,

    /// Fixed RNG seed for deterministic runs; entropy-seeded when absent
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: "./logs".to_string(),
            log_file: "ledger-stress.log".to_string(),
            use_json: false,
            rotation: "daily".to_string(),

            base_url: "http://localhost:8090".to_string(),
            bank_participant: "Bank".to_string(),
            participants: (1..=8).map(|i| format!("StressUser{i}")).collect(),
            account_type: "AVAILABLE".to_string(),

            workers: 15,
            attempts_per_worker: 30,
            duplicate_percent: 25,
            initial_balance: Decimal::new(1_000_000, 2), // 10000.00
            transfer_amount: Decimal::new(1_000, 2),     // 10.00

            think_percent: 40,
            think_min_ms: 50,
            think_max_ms: 150,

            transfer_timeout_secs: 15,
            bootstrap_timeout_secs: 10,
            health_timeout_secs: 5,
            settle_delay_secs: 3,

            balance_epsilon: Decimal::new(1, 2), // 0.01

            seed: None,
        }
    }
}

impl HarnessConfig {
    /// Load `config/{env}.yaml`
    pub fn load(env: &str) -> Result<Self, HarnessError> {
        let config_path = format!("config/{env}.yaml");
        let content = fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `config/{env}.yaml`, falling back to defaults when the file
    /// does not exist. Parse errors still fail.
    pub fn load_or_default(env: &str) -> Result<Self, HarnessError> {
        match Self::load(env) {
            Ok(config) => Ok(config),
            Err(HarnessError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Check workload preconditions before any concurrent work starts.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.participants.len() < 2 {
            return Err(HarnessError::Config(format!(
                "need at least 2 participants to form a transfer, got {}",
                self.participants.len()
            )));
        }
        if self.workers == 0 {
            return Err(HarnessError::Config("workers must be at least 1".into()));
        }
        if self.attempts_per_worker == 0 {
            return Err(HarnessError::Config(
                "attempts_per_worker must be at least 1".into(),
            ));
        }
        if self.duplicate_percent > 100 {
            return Err(HarnessError::Config(format!(
                "duplicate_percent must be 0-100, got {}",
                self.duplicate_percent
            )));
        }
        if self.think_percent > 100 {
            return Err(HarnessError::Config(format!(
                "think_percent must be 0-100, got {}",
                self.think_percent
            )));
        }
        if self.think_min_ms > self.think_max_ms {
            return Err(HarnessError::Config(format!(
                "think_min_ms ({}) exceeds think_max_ms ({})",
                self.think_min_ms, self.think_max_ms
            )));
        }
        if self.transfer_amount <= Decimal::ZERO {
            return Err(HarnessError::Config(
                "transfer_amount must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Expected post-run total across all participant accounts.
    pub fn expected_total(&self) -> Decimal {
        self.initial_balance * Decimal::from(self.participants.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, 15);
        assert_eq!(config.attempts_per_worker, 30);
        assert_eq!(config.duplicate_percent, 25);
        assert_eq!(config.participants.len(), 8);
    }

    #[test]
    fn rejects_fewer_than_two_participants() {
        let mut config = HarnessConfig::default();
        config.participants = vec!["OnlyOne".to_string()];
        assert!(matches!(config.validate(), Err(HarnessError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        let mut config = HarnessConfig::default();
        config.duplicate_percent = 101;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.think_percent = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_think_range() {
        let mut config = HarnessConfig::default();
        config.think_min_ms = 200;
        config.think_max_ms = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn expected_total_scales_with_participants() {
        let mut config = HarnessConfig::default();
        config.initial_balance = Decimal::new(10_000, 2); // 100.00
        config.participants = vec!["A".into(), "B".into(), "C".into()];
        assert_eq!(config.expected_total(), Decimal::new(30_000, 2));
    }

    #[test]
    fn yaml_roundtrip_keeps_amounts() {
        let config = HarnessConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: HarnessConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back.initial_balance, config.initial_balance);
        assert_eq!(back.transfer_amount, config.transfer_amount);
        assert_eq!(back.balance_epsilon, config.balance_epsilon);
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let yaml = "workers: 2\nattempts_per_worker: 5\n";
        let config: HarnessConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.attempts_per_worker, 5);
        assert_eq!(config.duplicate_percent, 25);
        assert_eq!(config.base_url, "http://localhost:8090");
    }
}
