//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate endpoint URLs
//! - Validate value ranges (horizon, poll interval, retry bounds)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: TxqConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::TxqConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &TxqConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = url::Url::parse(&config.ledger.rpc_url) {
        errors.push(ValidationError::new(
            "ledger.rpc_url",
            format!("invalid URL '{}': {}", config.ledger.rpc_url, e),
        ));
    }
    for (i, failover) in config.ledger.failover_urls.iter().enumerate() {
        if let Err(e) = url::Url::parse(failover) {
            errors.push(ValidationError::new(
                &format!("ledger.failover_urls[{}]", i),
                format!("invalid URL '{}': {}", failover, e),
            ));
        }
    }
    if config.ledger.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.rpc_timeout_secs", "must be > 0"));
    }
    if config.ledger.max_ledger_version_offset == Some(0) {
        errors.push(ValidationError::new(
            "ledger.max_ledger_version_offset",
            "must be > 0 when set",
        ));
    }

    if config.submission.horizon == 0 {
        errors.push(ValidationError::new("submission.horizon", "must be >= 1"));
    }
    if config.submission.poll_interval_ms == 0 {
        errors.push(ValidationError::new("submission.poll_interval_ms", "must be > 0"));
    }

    let reconnect = &config.reconnect;
    if !reconnect.unbounded && reconnect.max_attempts == 0 {
        errors.push(ValidationError::new(
            "reconnect.max_attempts",
            "must be >= 1 unless reconnect.unbounded is set",
        ));
    }
    if reconnect.base_delay_ms > reconnect.max_delay_ms {
        errors.push(ValidationError::new(
            "reconnect.base_delay_ms",
            format!(
                "base delay {}ms exceeds max delay {}ms",
                reconnect.base_delay_ms, reconnect.max_delay_ms
            ),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TxqConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = TxqConfig::default();
        config.ledger.rpc_url = "not a url".to_string();
        config.submission.horizon = 0;
        config.reconnect.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "submission.horizon"));
    }

    #[test]
    fn test_unbounded_allows_zero_attempts() {
        let mut config = TxqConfig::default();
        config.reconnect.unbounded = true;
        config.reconnect.max_attempts = 0;
        assert!(validate_config(&config).is_ok());
    }
}
