//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the tool.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TxqConfig {
    /// Ledger node connection settings.
    pub ledger: LedgerConfig,

    /// Submission engine settings.
    pub submission: SubmissionConfig,

    /// Reconnect-and-resubmit policy.
    pub reconnect: ReconnectConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ledger node connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,

    /// Failover JSON-RPC endpoint URLs.
    pub failover_urls: Vec<String>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Upper bound for the per-transaction network fee, in drops.
    pub max_fee_drops: u64,

    /// Ledgers after the current validated ledger before a prepared
    /// transaction expires (`LastLedgerSequence`). `None` omits it.
    pub max_ledger_version_offset: Option<u32>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://s1.ripple.com:51234".to_string(),
            failover_urls: Vec::new(),
            rpc_timeout_secs: 10,
            max_fee_drops: 2_000_000, // 2 XRP
            max_ledger_version_offset: Some(10),
        }
    }
}

/// How signed transactions of one batch are handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionPolicy {
    /// One lane per account; a transaction is submitted only after the
    /// previous one of the same account reached a terminal state.
    #[default]
    Sequential,
    /// Everything at once. Later sequences may be rejected when an
    /// earlier one fails or is delayed.
    Parallel,
}

/// Submission engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Width of the confirmation window in ledger versions.
    pub horizon: u32,

    /// Delay between status polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Batch publication policy.
    pub policy: SubmissionPolicy,

    /// Stop an account's lane after its first failed transaction.
    pub halt_on_failure: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            horizon: 10,
            poll_interval_ms: 1000,
            policy: SubmissionPolicy::Sequential,
            halt_on_failure: true,
        }
    }
}

/// Delay growth between reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Fixed,
    Exponential,
}

/// Reconnect configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Retry forever. Overrides `max_attempts` and `deadline_secs`.
    pub unbounded: bool,

    /// Maximum number of submit attempts (first attempt included).
    pub max_attempts: u32,

    /// Give up once this much time has passed since the first attempt.
    pub deadline_secs: Option<u64>,

    /// Backoff strategy between attempts.
    pub strategy: BackoffStrategy,

    /// Base delay in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            unbounded: false,
            max_attempts: 10,
            deadline_secs: None,
            strategy: BackoffStrategy::Fixed,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
        }
    }
}

/// Log output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line encoding.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TxqConfig::default();
        assert_eq!(config.submission.horizon, 10);
        assert_eq!(config.submission.poll_interval_ms, 1000);
        assert_eq!(config.submission.policy, SubmissionPolicy::Sequential);
        assert!(!config.reconnect.unbounded);
        assert_eq!(config.reconnect.base_delay_ms, 1000);
    }

    #[test]
    fn test_partial_toml() {
        let config: TxqConfig = toml::from_str(
            r#"
            [submission]
            horizon = 20
            policy = "parallel"

            [reconnect]
            strategy = "exponential"
            "#,
        )
        .unwrap();
        assert_eq!(config.submission.horizon, 20);
        assert_eq!(config.submission.policy, SubmissionPolicy::Parallel);
        assert_eq!(config.reconnect.strategy, BackoffStrategy::Exponential);
        // untouched sections keep defaults
        assert_eq!(config.ledger.rpc_timeout_secs, 10);
        assert_eq!(config.submission.poll_interval_ms, 1000);
    }
}
