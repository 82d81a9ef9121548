//! Ledger network collaborator.
//!
//! # Data Flow
//! ```text
//! Operation + PrepareOptions
//!     → txjson.rs (transaction JSON)
//!     → client.rs trait: prepare → sign → submit → get_transaction_status
//!         ├── rpc.rs    (JSON-RPC node, timeouts + failover)
//!         └── memory.rs (simulated ledger, fault injection)
//! ```
//!
//! # Security Constraints
//! - Secrets are passed per call, never stored by a client
//! - Never log secrets or signed blobs at info level

pub mod client;
pub mod memory;
pub mod rpc;
pub mod txjson;
pub mod types;

pub use client::{Connector, LedgerClient};
pub use memory::{CallLog, MemoryConnector, MemoryLedger};
pub use rpc::{RippledClient, RippledConnector};
pub use types::{
    AccountInfo, LedgerError, LedgerResult, SubmitResult, TxOutcome, TER_QUEUED, TES_SUCCESS,
};
