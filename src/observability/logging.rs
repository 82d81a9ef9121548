//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Route log lines to stderr so stdout stays machine-readable
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - JSON format for log shipping, pretty format for terminals

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Filter directive for the configured level; `verbose` forces debug for this crate.
pub fn filter_directive(config: &ObservabilityConfig, verbose: bool) -> String {
    if verbose {
        "ripple_txq=debug".to_string()
    } else {
        format!("ripple_txq={}", config.log_level)
    }
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init_logging(config: &ObservabilityConfig, verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| filter_directive(config, verbose).into());
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    result.is_ok()
}
