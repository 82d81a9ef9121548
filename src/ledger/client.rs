//! Ledger client seam.
//!
//! The submission engine and queue only talk to the network through
//! these traits. `rpc.rs` implements them over JSON-RPC; `memory.rs`
//! implements them against an in-process simulated ledger.

use std::sync::Arc;

use async_trait::async_trait;

use crate::ledger::types::{AccountInfo, LedgerResult, SubmitResult, TxOutcome};
use crate::queue::wallet::{Identity, Secret};
use crate::tx::{ConfirmationWindow, Operation, PrepareOptions, SignedTransaction, UnsignedTransaction};

/// Operations the tool needs from a ledger node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Turn an operation into an unsigned transaction for `account`.
    async fn prepare(
        &self,
        account: &str,
        operation: &Operation,
        options: &PrepareOptions,
    ) -> LedgerResult<UnsignedTransaction>;

    /// Apply the secret to an unsigned transaction.
    async fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        secret: &Secret,
    ) -> LedgerResult<SignedTransaction>;

    /// Hand a signed blob to the node.
    async fn submit(&self, signed_blob: &str) -> LedgerResult<SubmitResult>;

    /// Look up the validated outcome of a transaction within a window.
    async fn get_transaction_status(
        &self,
        id: &str,
        window: ConfirmationWindow,
    ) -> LedgerResult<TxOutcome>;

    /// Latest validated ledger version.
    async fn get_ledger_version(&self) -> LedgerResult<u32>;

    async fn get_account_info(&self, address: &str) -> LedgerResult<AccountInfo>;

    /// Create a fresh address/secret pair.
    async fn generate_identity(&self) -> LedgerResult<Identity>;
}

/// Produces ledger client connections.
///
/// The submission engine asks for a fresh connection at the top of every
/// submit attempt, so a reconnect never has to patch a shared handle.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> LedgerResult<Arc<dyn LedgerClient>>;
}
