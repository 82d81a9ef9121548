//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks)
//!     → TxqConfig (validated, immutable)
//!     → CLI flags layered on top in main.rs
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so the tool runs without a config file
//! - The wallet secret never comes from the config file
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    BackoffStrategy, LedgerConfig, LogFormat, ObservabilityConfig, ReconnectConfig,
    SubmissionConfig, SubmissionPolicy, TxqConfig,
};
