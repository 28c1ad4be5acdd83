//! Balance Conservation Verifier
//!
//! Independent post-run check: after a settle delay for asynchronous
//! persistence, fetch every participant balance and compare the sum
//! against `initial_balance x participant_count`. The epsilon covers
//! floating-point representation error on the wire, not business
//! tolerance. A participant whose balance cannot be fetched is a hard
//! failure; an unknown balance is never assumed zero.

use crate::client::TransferClient;
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

/// Read-only balance snapshot fetched from the service.
#[derive(Debug, Clone)]
pub struct AccountBalance {
    pub participant: String,
    pub account_type: String,
    pub amount: Decimal,
}

/// Result of the conservation check.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub expected_total: Decimal,
    pub actual_total: Decimal,
    /// expected - actual; positive means money disappeared
    pub discrepancy: Decimal,
    pub passed: bool,
    pub balances: Vec<AccountBalance>,
}

pub struct Verifier {
    config: Arc<HarnessConfig>,
    client: Arc<TransferClient>,
}

impl Verifier {
    pub fn new(config: Arc<HarnessConfig>, client: Arc<TransferClient>) -> Self {
        Self { config, client }
    }

    /// Run the conservation check. `Err` means a balance could not be
    /// read at all; a mismatch is reported in the outcome, not as `Err`.
    pub async fn verify(&self) -> Result<VerificationOutcome, HarnessError> {
        info!(
            "Waiting {}s for async writes to settle before verification",
            self.config.settle_delay_secs
        );
        sleep(Duration::from_secs(self.config.settle_delay_secs)).await;

        info!("Verifying final account balances");

        let mut balances = Vec::with_capacity(self.config.participants.len());
        let mut actual_total = Decimal::ZERO;

        for participant in &self.config.participants {
            let amount = self
                .client
                .balance(participant, &self.config.account_type)
                .await?;
            info!("Account {participant}: {amount:.2}");
            actual_total += amount;
            balances.push(AccountBalance {
                participant: participant.clone(),
                account_type: self.config.account_type.clone(),
                amount,
            });
        }

        let expected_total = self.config.expected_total();
        let (discrepancy, passed) =
            evaluate(expected_total, actual_total, self.config.balance_epsilon);

        info!("Total expected balance: {expected_total:.2}");
        info!("Total actual balance: {actual_total:.2}");
        if passed {
            info!("Balance verification PASSED - no money lost or created");
        } else {
            error!("Balance verification FAILED - discrepancy: {discrepancy:.2}");
        }

        Ok(VerificationOutcome {
            expected_total,
            actual_total,
            discrepancy,
            passed,
            balances,
        })
    }
}

/// Compare totals within epsilon. Returns (expected - actual, passed).
pub fn evaluate(expected: Decimal, actual: Decimal, epsilon: Decimal) -> (Decimal, bool) {
    let discrepancy = expected - actual;
    (discrepancy, discrepancy.abs() < epsilon)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn exact_match_passes() {
        let (discrepancy, passed) = evaluate(dec(20_000), dec(20_000), dec(1));
        assert!(passed);
        assert_eq!(discrepancy, Decimal::ZERO);
    }

    #[test]
    fn sub_epsilon_difference_passes() {
        // 0.005 below expected, epsilon 0.01
        let expected = dec(20_000);
        let actual = expected - Decimal::new(5, 3);
        let (_, passed) = evaluate(expected, actual, dec(1));
        assert!(passed);
    }

    #[test]
    fn epsilon_boundary_fails() {
        // |diff| == epsilon is a failure: tolerance is strictly below
        let (discrepancy, passed) = evaluate(dec(20_000), dec(19_999), dec(1));
        assert!(!passed);
        assert_eq!(discrepancy, dec(1));
    }

    #[test]
    fn lost_money_is_positive_discrepancy() {
        let (discrepancy, passed) = evaluate(dec(20_000), dec(19_000), dec(1));
        assert!(!passed);
        assert_eq!(discrepancy, dec(1_000)); // 10.00 missing
    }

    #[test]
    fn created_money_also_fails() {
        let (discrepancy, passed) = evaluate(dec(20_000), dec(21_000), dec(1));
        assert!(!passed);
        assert_eq!(discrepancy, dec(-1_000));
    }
}
