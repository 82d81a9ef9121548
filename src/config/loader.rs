//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TxqConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `ledger.rpc_url`.
pub const RPC_URL_ENV_VAR: &str = "RIPPLE_TXQ_RPC_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TxqConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: TxqConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load configuration from an optional file, then apply environment overrides.
///
/// Without a file every value falls back to its default.
pub fn load_or_default(path: Option<&Path>) -> Result<TxqConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => TxqConfig::default(),
    };

    if let Ok(url) = std::env::var(RPC_URL_ENV_VAR) {
        tracing::debug!(rpc_url = %url, "RPC URL overridden from environment");
        config.ledger.rpc_url = url;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[ledger]\nrpc_url = \"http://localhost:5005\"\n[submission]\nhorizon = 5"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.ledger.rpc_url, "http://localhost:5005");
        assert_eq!(config.submission.horizon, 5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[submission]\nhorizon = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("submission.horizon"));
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[submission\nhorizon = ").unwrap();
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
