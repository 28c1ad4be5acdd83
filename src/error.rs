use thiserror::Error;

/// Harness-level failures.
///
/// Per-attempt transport and HTTP faults are deliberately NOT here:
/// they are absorbed at the client boundary and recorded as metrics.
/// These variants cover the sequential phases (setup, bootstrap,
/// verification) where a failure must stop the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Health probe failed: {0}")]
    Health(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Funding {participant} failed with status {status}")]
    Funding { participant: String, status: u16 },

    #[error("Balance fetch failed for {participant}: {reason}")]
    BalanceFetch { participant: String, reason: String },

    #[error("Balance for {participant} is not a valid decimal: {source}")]
    BalanceParse {
        participant: String,
        #[source]
        source: rust_decimal::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}
