//! Transaction lifecycle types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tx::operation::{Operation, OperationKind};

/// Where a transaction is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Drafted,
    Prepared,
    Signed,
    Submitted,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TxStatus::Confirmed | TxStatus::Failed)
    }
}

/// An operation with its sequence number fixed at enqueue time.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftTransaction {
    pub sequence: u32,
    pub operation: Operation,
}

/// Per-transaction preparation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    pub sequence: u32,
    /// Network fee in drops; queried from the node when `None`.
    pub fee_drops: Option<u64>,
    /// Ledgers after the current validated one before the transaction
    /// can no longer be included.
    pub max_ledger_version_offset: Option<u32>,
}

/// Output of the ledger client's prepare step.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub kind: OperationKind,
    pub account: String,
    pub sequence: u32,
    pub tx_json: Value,
    pub max_ledger_version: Option<u32>,
}

/// A signed transaction, ready to hand to the submission engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    /// Transaction hash.
    pub id: String,
    /// Hex-encoded signed blob.
    #[serde(alias = "signed_transaction")]
    pub signed_transaction: String,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OperationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ledger_version: Option<u32>,
}

/// Inclusive range of ledger versions in which a submitted transaction's
/// outcome must be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationWindow {
    pub min_ledger_version: u32,
    pub max_ledger_version: u32,
}

impl ConfirmationWindow {
    /// `[base, base + horizon]`.
    pub fn from_base(base: u32, horizon: u32) -> Self {
        Self {
            min_ledger_version: base,
            max_ledger_version: base.saturating_add(horizon),
        }
    }

    pub fn contains(&self, version: u32) -> bool {
        (self.min_ledger_version..=self.max_ledger_version).contains(&version)
    }

    /// Chain progress has moved past the window.
    pub fn is_expired(&self, validated_version: u32) -> bool {
        validated_version > self.max_ledger_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let window = ConfirmationWindow::from_base(100, 10);
        assert_eq!(window.min_ledger_version, 100);
        assert_eq!(window.max_ledger_version, 110);
        assert!(window.contains(100));
        assert!(window.contains(110));
        assert!(!window.contains(111));
        assert!(!window.is_expired(110));
        assert!(window.is_expired(111));
    }

    #[test]
    fn test_signed_transaction_accepts_minimal_line() {
        let tx: SignedTransaction =
            serde_json::from_str(r#"{"id":"ABC","signedTransaction":"1200"}"#).unwrap();
        assert_eq!(tx.id, "ABC");
        assert_eq!(tx.signed_transaction, "1200");
        assert_eq!(tx.sequence, 0);
        assert!(tx.kind.is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TxStatus::Confirmed.is_terminal());
        assert!(TxStatus::Failed.is_terminal());
        assert!(!TxStatus::Submitted.is_terminal());
    }
}
