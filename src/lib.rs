//! Ripple transaction queue.
//!
//! Builds a queue of account operations for one wallet, signs them with
//! gap-free sequence numbers, and submits each to a ledger node until it
//! is confirmed or definitively failed.

// Core subsystems
pub mod config;
pub mod ledger;
pub mod queue;
pub mod submission;
pub mod tx;

// Cross-cutting concerns
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod report;
pub mod resilience;

pub use config::TxqConfig;
pub use error::AppError;
pub use lifecycle::Shutdown;
pub use queue::{TxQueue, Wallet};
pub use submission::{Publisher, SubmissionEngine, SubmitError};
