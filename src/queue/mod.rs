//! Wallet and transaction queue.
//!
//! # Data Flow
//! ```text
//! Identity (imported, generated, or secret from env)
//!     → wallet.rs (identity + sequence counter)
//!     → builder.rs enqueue (sequence assigned, Drafted)
//!     → builder.rs materialize (prepare + sign, enqueue order)
//!     → Vec<SignedTransaction> for the submission engine
//! ```

pub mod builder;
pub mod wallet;

use thiserror::Error;

use crate::ledger::LedgerError;

pub use builder::{QueueHandle, TxQueue};
pub use wallet::{Identity, Secret, Wallet};

/// Queue and wallet precondition failures.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("wallet not provided")]
    MissingWallet,

    #[error("cannot {action}: {pending} transaction(s) already queued")]
    QueueNotEmpty { action: &'static str, pending: usize },

    #[error("sequence counter exhausted")]
    SequenceExhausted,

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("failed to prepare transaction {sequence}: {source}")]
    Prepare {
        sequence: u32,
        #[source]
        source: LedgerError,
    },

    #[error("failed to sign transaction {sequence}: {source}")]
    Sign {
        sequence: u32,
        #[source]
        source: LedgerError,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
