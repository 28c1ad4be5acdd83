//! Transfer Client
//!
//! Wraps one `reqwest::Client` for all calls against the service under
//! test. Workload transfers never raise past this boundary: a timeout,
//! refused connection or DNS failure comes back as an `AttemptResult`
//! with `success = false` and the distinguished transport tag, so a bad
//! attempt can never abort a worker. No retries are issued here.

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Error tag recorded when a request never produced an HTTP status.
pub const TRANSPORT_TAG: &str = "TRANSPORT";

/// Client-supplied token letting the server recognize a replayed request
/// for the same logical transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Fresh key, unique per (worker, attempt, timestamp).
    pub fn generate(worker_id: usize, attempt: usize) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        Self(format!("stress-t{worker_id}-r{attempt}-{millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Single-transfer request body. Field names follow the wire contract;
/// the amount goes out as a JSON number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub from_user_id: String,
    pub from_type: String,
    pub to_user_id: String,
    pub to_type: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
}

/// Outcome of one transfer attempt.
///
/// `status` is `None` when the request failed in transit (timeout,
/// connection refused, DNS); `body` then carries the error text instead
/// of a response payload.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    pub status: Option<u16>,
    pub latency: Duration,
    pub success: bool,
    pub body: String,
}

impl AttemptResult {
    /// Error tag for the failure breakdown: `HTTP_{status}` or the
    /// transport tag.
    pub fn error_tag(&self) -> String {
        match self.status {
            Some(status) => format!("HTTP_{status}"),
            None => TRANSPORT_TAG.to_string(),
        }
    }

    /// Whether the response body signals a deduplicated outcome.
    /// Case-insensitive substring match on the known markers.
    pub fn is_idempotent_replay(&self) -> bool {
        let body = self.body.to_lowercase();
        body.contains("idempotent") || body.contains("duplicate")
    }
}

/// HTTP client for the transfer service.
pub struct TransferClient {
    http: reqwest::Client,
    base_url: String,
    transfer_timeout: Duration,
    bootstrap_timeout: Duration,
    health_timeout: Duration,
}

impl TransferClient {
    pub fn new(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            transfer_timeout: Duration::from_secs(config.transfer_timeout_secs),
            bootstrap_timeout: Duration::from_secs(config.bootstrap_timeout_secs),
            health_timeout: Duration::from_secs(config.health_timeout_secs),
        })
    }

    /// Issue exactly one timed transfer carrying the idempotency key.
    pub async fn transfer(
        &self,
        request: &TransferRequest,
        key: &IdempotencyKey,
    ) -> AttemptResult {
        let started = Instant::now();
        let response = self
            .http
            .post(format!("{}/api/transfer/single", self.base_url))
            .header("Idempotency-Key", key.as_str())
            .json(request)
            .timeout(self.transfer_timeout)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                // The connection can still drop while the body streams
                // in; that is a transport failure, not a success with an
                // empty body.
                match resp.text().await {
                    Ok(body) => AttemptResult {
                        status: Some(status),
                        latency: started.elapsed(),
                        success: status == 200,
                        body,
                    },
                    Err(e) => AttemptResult {
                        status: None,
                        latency: started.elapsed(),
                        success: false,
                        body: e.to_string(),
                    },
                }
            }
            Err(e) => AttemptResult {
                status: None,
                latency: started.elapsed(),
                success: false,
                body: e.to_string(),
            },
        }
    }

    /// Liveness probe, consulted once before any workload call.
    pub async fn health(&self) -> Result<(), HarnessError> {
        let resp = self
            .http
            .get(format!("{}/actuator/health", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| HarnessError::Health(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(HarnessError::Health(format!(
                "health endpoint returned status {}",
                resp.status()
            )))
        }
    }

    /// Bootstrap funding transfer from the bank account. Sequential
    /// phase, so a failure here is a hard error rather than a metric.
    pub async fn fund(
        &self,
        config: &HarnessConfig,
        participant: &str,
    ) -> Result<(), HarnessError> {
        let request = TransferRequest {
            from_user_id: config.bank_participant.clone(),
            from_type: config.account_type.clone(),
            to_user_id: participant.to_string(),
            to_type: config.account_type.clone(),
            amount: config.initial_balance,
            description: format!("Initial funding for stress test - {participant}"),
        };

        let resp = self
            .http
            .post(format!("{}/api/transfer/single", self.base_url))
            .json(&request)
            .timeout(self.bootstrap_timeout)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            Err(HarnessError::Funding {
                participant: participant.to_string(),
                status,
            })
        }
    }

    /// Current balance for one participant account, parsed from the
    /// plain-text response body.
    pub async fn balance(
        &self,
        participant: &str,
        account_type: &str,
    ) -> Result<Decimal, HarnessError> {
        let resp = self
            .http
            .get(format!(
                "{}/api/balance/{participant}/{account_type}",
                self.base_url
            ))
            .timeout(self.bootstrap_timeout)
            .send()
            .await
            .map_err(|e| HarnessError::BalanceFetch {
                participant: participant.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(HarnessError::BalanceFetch {
                participant: participant.to_string(),
                reason: format!("status {}", resp.status()),
            });
        }

        let text = resp.text().await.map_err(|e| HarnessError::BalanceFetch {
            participant: participant.to_string(),
            reason: e.to_string(),
        })?;

        Decimal::from_str(text.trim()).map_err(|source| HarnessError::BalanceParse {
            participant: participant.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_tag_distinguishes_http_and_transport() {
        let http_failure = AttemptResult {
            status: Some(503),
            latency: Duration::from_millis(5),
            success: false,
            body: String::new(),
        };
        assert_eq!(http_failure.error_tag(), "HTTP_503");

        let transport_failure = AttemptResult {
            status: None,
            latency: Duration::from_millis(5),
            success: false,
            body: "connection refused".to_string(),
        };
        assert_eq!(transport_failure.error_tag(), TRANSPORT_TAG);
    }

    #[test]
    fn replay_marker_match_is_case_insensitive() {
        let result = |body: &str| AttemptResult {
            status: Some(200),
            latency: Duration::ZERO,
            success: true,
            body: body.to_string(),
        };

        assert!(result("Transfer IDEMPOTENT replay detected").is_idempotent_replay());
        assert!(result("duplicate request ignored").is_idempotent_replay());
        assert!(result("DupLiCaTe").is_idempotent_replay());
        assert!(!result("transfer completed").is_idempotent_replay());
        assert!(!result("").is_idempotent_replay());
    }

    #[test]
    fn transfer_request_serializes_wire_field_names() {
        let request = TransferRequest {
            from_user_id: "StressUser1".to_string(),
            from_type: "AVAILABLE".to_string(),
            to_user_id: "StressUser2".to_string(),
            to_type: "AVAILABLE".to_string(),
            amount: Decimal::new(1_000, 2),
            description: "Stress test transfer T0-R0".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["fromUserId"], "StressUser1");
        assert_eq!(value["fromType"], "AVAILABLE");
        assert_eq!(value["toUserId"], "StressUser2");
        assert_eq!(value["toType"], "AVAILABLE");
        assert!(value["amount"].is_number());
        assert_eq!(value["amount"].as_f64().unwrap(), 10.0);
    }

    #[test]
    fn generated_keys_embed_worker_and_attempt() {
        let key = IdempotencyKey::generate(3, 17);
        assert!(key.as_str().starts_with("stress-t3-r17-"));
    }
}
