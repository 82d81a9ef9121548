//! Ledger-facing types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine result of a transaction applied to the ledger.
pub const TES_SUCCESS: &str = "tesSUCCESS";

/// Engine result of a transaction held in the node's queue.
pub const TER_QUEUED: &str = "terQUEUED";

/// Resubmission of a blob the node already holds.
pub const TEF_ALREADY: &str = "tefALREADY";

/// The account's sequence has moved past this transaction's.
pub const TEF_PAST_SEQ: &str = "tefPAST_SEQ";

/// Node error codes meaning "try again later", not "request is bad".
const TRANSIENT_NODE_CODES: &[&str] = &["tooBusy", "noNetwork", "noCurrent", "noClosed", "slowDown"];

/// Errors raised by a ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Transport-level fault: connection refused, reset, HTTP failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered with an RPC-level error.
    #[error("node error {code}: {message}")]
    Node { code: String, message: String },

    /// The node lacks history for part of the searched range.
    #[error("ledger history not yet available")]
    MissingLedgerHistory,

    /// The searched range extends past the latest validated ledger.
    #[error("ledger version not yet reached")]
    PendingLedgerVersion,

    /// Transaction not found in a fully searched, fully validated range.
    #[error("transaction not found")]
    NotFound,

    /// The account does not exist on the ledger.
    #[error("account not found")]
    AccountNotFound,

    /// Response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LedgerError {
    /// Faults worth reconnecting and retrying for.
    pub fn is_transient(&self) -> bool {
        match self {
            LedgerError::Connection(_) | LedgerError::Timeout(_) => true,
            LedgerError::Node { code, .. } => TRANSIENT_NODE_CODES.contains(&code.as_str()),
            _ => false,
        }
    }

    /// The confirming ledger has not been validated or indexed yet.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(
            self,
            LedgerError::MissingLedgerHistory | LedgerError::PendingLedgerVersion
        )
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Preliminary result of handing a blob to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub result_code: String,
    #[serde(default)]
    pub result_message: String,
}

impl SubmitResult {
    pub fn new(result_code: impl Into<String>) -> Self {
        Self {
            result_code: result_code.into(),
            result_message: String::new(),
        }
    }

    /// Applied or queued: the node accepted the blob for consideration.
    pub fn is_accepted(&self) -> bool {
        self.result_code == TES_SUCCESS || self.result_code == TER_QUEUED
    }
}

/// Definitive result of a validated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub result: String,
    pub ledger_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_drops: Option<String>,
}

impl TxOutcome {
    pub fn is_success(&self) -> bool {
        self.result == TES_SUCCESS
    }
}

/// Account state relevant to queueing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    /// Next sequence number the ledger will accept.
    pub sequence: u32,
    pub balance_drops: u64,
    pub flags: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(LedgerError::Connection("reset".into()).is_transient());
        assert!(LedgerError::Timeout(10).is_transient());
        assert!(LedgerError::Node {
            code: "tooBusy".into(),
            message: String::new()
        }
        .is_transient());
        assert!(!LedgerError::Node {
            code: "invalidTransaction".into(),
            message: String::new()
        }
        .is_transient());
        assert!(!LedgerError::MissingLedgerHistory.is_transient());
        assert!(!LedgerError::NotFound.is_transient());
    }

    #[test]
    fn test_not_yet_available() {
        assert!(LedgerError::MissingLedgerHistory.is_not_yet_available());
        assert!(LedgerError::PendingLedgerVersion.is_not_yet_available());
        assert!(!LedgerError::NotFound.is_not_yet_available());
    }

    #[test]
    fn test_submit_result_acceptance() {
        assert!(SubmitResult::new(TES_SUCCESS).is_accepted());
        assert!(SubmitResult::new(TER_QUEUED).is_accepted());
        assert!(!SubmitResult::new("tecUNFUNDED_PAYMENT").is_accepted());
        assert!(!SubmitResult::new(TEF_PAST_SEQ).is_accepted());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Timeout(10);
        assert_eq!(err.to_string(), "RPC timeout after 10 seconds");
    }
}
