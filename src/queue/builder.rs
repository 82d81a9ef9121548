//! Transaction queue builder.
//!
//! # Responsibilities
//! - Hand out the wallet's sequence numbers, one per enqueued operation
//! - Keep drafts in enqueue order
//! - Defer network work (prepare, sign) to `materialize`
//!
//! # Design Decisions
//! - Wallet and drafts live behind one mutex, so concurrent enqueues get
//!   distinct, gap-free sequence numbers
//! - Sequence override and identity changes are rejected once anything
//!   is queued
//! - `materialize` prepares and signs strictly one draft at a time

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::ledger::LedgerClient;
use crate::queue::wallet::{Identity, Wallet};
use crate::queue::QueueError;
use crate::tx::{
    AccountSetting, DraftTransaction, Operation, PrepareOptions, SignedTransaction,
    TrustlineParams,
};

/// Position and sequence of an enqueued operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueHandle {
    pub index: usize,
    pub sequence: u32,
}

#[derive(Debug)]
struct QueueState {
    wallet: Wallet,
    drafts: Vec<DraftTransaction>,
}

/// Ordered queue of draft operations for one wallet.
#[derive(Debug)]
pub struct TxQueue {
    state: Mutex<QueueState>,
    fee_drops: Option<u64>,
    max_ledger_version_offset: Option<u32>,
}

impl TxQueue {
    pub fn new(wallet: Wallet) -> Self {
        Self {
            state: Mutex::new(QueueState {
                wallet,
                drafts: Vec::new(),
            }),
            fee_drops: None,
            max_ledger_version_offset: None,
        }
    }

    /// Fixed network fee for every materialized transaction.
    pub fn with_fee_drops(mut self, fee_drops: Option<u64>) -> Self {
        self.fee_drops = fee_drops;
        self
    }

    /// Expiration offset written into every materialized transaction.
    pub fn with_max_ledger_version_offset(mut self, offset: Option<u32>) -> Self {
        self.max_ledger_version_offset = offset;
        self
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the next sequence number. Only allowed while the queue is empty.
    pub fn set_sequence(&self, sequence: u32) -> Result<(), QueueError> {
        let mut state = self.lock();
        ensure_empty(&state, "override sequence")?;
        state.wallet.set_sequence(sequence);
        tracing::info!(sequence, "Wallet sequence set");
        Ok(())
    }

    /// Replace the wallet identity. Only allowed while the queue is empty.
    pub fn import_identity(&self, identity: Identity) -> Result<(), QueueError> {
        let mut state = self.lock();
        ensure_empty(&state, "import identity")?;
        tracing::info!(address = %identity.address, "Wallet imported");
        state.wallet.set_identity(identity);
        Ok(())
    }

    /// Ask the ledger node for a fresh identity and adopt it.
    pub async fn generate_identity(&self, client: &dyn LedgerClient) -> Result<Identity, QueueError> {
        ensure_empty(&self.lock(), "generate identity")?;
        let identity = client.generate_identity().await?;

        let mut state = self.lock();
        ensure_empty(&state, "generate identity")?;
        tracing::info!(address = %identity.address, "Wallet generated");
        state.wallet.set_identity(identity.clone());
        Ok(identity)
    }

    /// Adopt the account's next sequence from the ledger.
    pub async fn sync_sequence(&self, client: &dyn LedgerClient) -> Result<u32, QueueError> {
        let address = self.lock().wallet.require_identity()?.address.clone();
        let info = client.get_account_info(&address).await?;
        self.set_sequence(info.sequence)?;
        Ok(info.sequence)
    }

    /// Queue an operation under the wallet's current sequence, then advance it.
    pub fn enqueue(&self, operation: impl Into<Operation>) -> Result<QueueHandle, QueueError> {
        let operation = operation.into();
        let mut state = self.lock();
        state.wallet.require_identity()?;

        let sequence = state.wallet.take_sequence()?;
        let index = state.drafts.len();
        tracing::debug!(kind = %operation.kind(), sequence, index, "Operation queued");
        state.drafts.push(DraftTransaction {
            sequence,
            operation,
        });
        Ok(QueueHandle { index, sequence })
    }

    pub fn set_option(&self, setting: AccountSetting) -> Result<QueueHandle, QueueError> {
        self.enqueue(setting)
    }

    /// One settings transaction per setting, in iteration order.
    pub fn set_options<I>(&self, settings: I) -> Result<Vec<QueueHandle>, QueueError>
    where
        I: IntoIterator<Item = AccountSetting>,
    {
        settings.into_iter().map(|s| self.set_option(s)).collect()
    }

    pub fn set_trustline(&self, params: TrustlineParams) -> Result<QueueHandle, QueueError> {
        self.enqueue(params)
    }

    /// Prepare and sign every draft, in enqueue order.
    pub async fn materialize(
        &self,
        client: &dyn LedgerClient,
    ) -> Result<Vec<SignedTransaction>, QueueError> {
        let (identity, drafts) = {
            let state = self.lock();
            (state.wallet.require_identity()?.clone(), state.drafts.clone())
        };

        let mut signed = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let options = PrepareOptions {
                sequence: draft.sequence,
                fee_drops: self.fee_drops,
                max_ledger_version_offset: self.max_ledger_version_offset,
            };
            let unsigned = client
                .prepare(&identity.address, &draft.operation, &options)
                .await
                .map_err(|source| QueueError::Prepare {
                    sequence: draft.sequence,
                    source,
                })?;
            let tx = client
                .sign(&unsigned, &identity.secret)
                .await
                .map_err(|source| QueueError::Sign {
                    sequence: draft.sequence,
                    source,
                })?;

            tracing::info!(
                kind = %draft.operation.kind(),
                sequence = tx.sequence,
                tx_id = %tx.id,
                "Transaction signed"
            );
            signed.push(tx);
        }
        Ok(signed)
    }

    pub fn len(&self) -> usize {
        self.lock().drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().drafts.is_empty()
    }

    /// Next sequence number that will be handed out.
    pub fn sequence(&self) -> u32 {
        self.lock().wallet.sequence()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().wallet.identity().cloned()
    }

    pub fn drafts(&self) -> Vec<DraftTransaction> {
        self.lock().drafts.clone()
    }
}

fn ensure_empty(state: &QueueState, action: &'static str) -> Result<(), QueueError> {
    if state.drafts.is_empty() {
        Ok(())
    } else {
        Err(QueueError::QueueNotEmpty {
            action,
            pending: state.drafts.len(),
        })
    }
}
