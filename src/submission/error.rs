//! Submission error taxonomy.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::tx::ConfirmationWindow;

/// Terminal failure of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The node refused the blob at submit time.
    #[error("submission rejected: {code}")]
    SubmissionRejected { code: String, message: String },

    /// The ledger validated the transaction with a failure result.
    #[error("transaction failed: {code} (ledger {ledger_version})")]
    TransactionFailed { code: String, ledger_version: u32 },

    /// No outcome was found before chain progress passed the window.
    #[error(
        "transaction unconfirmed after ledger {}",
        window.max_ledger_version
    )]
    ExpiredUnconfirmed { window: ConfirmationWindow },

    /// Transport fault while querying for the outcome.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// Transport faults on submit outlasted the retry policy.
    #[error("node unavailable after {attempts} attempts: {last}")]
    TransientNode { attempts: u32, last: LedgerError },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("submission cancelled")]
    Cancelled,

    /// Not submitted because an earlier transaction for the account failed.
    #[error("sequence {sequence} blocked by failure of sequence {blocked_by}")]
    Blocked { sequence: u32, blocked_by: u32 },
}

impl SubmitError {
    /// Short label for metrics and reports.
    pub fn label(&self) -> &'static str {
        match self {
            SubmitError::SubmissionRejected { .. } => "rejected",
            SubmitError::TransactionFailed { .. } => "failed",
            SubmitError::ExpiredUnconfirmed { .. } => "expired",
            SubmitError::ConnectionError(_) => "connection_error",
            SubmitError::TransientNode { .. } => "transient_exhausted",
            SubmitError::Precondition(_) => "precondition",
            SubmitError::Cancelled => "cancelled",
            SubmitError::Blocked { .. } => "blocked",
        }
    }

    /// Ledger result code, when the ledger produced one.
    pub fn result_code(&self) -> Option<&str> {
        match self {
            SubmitError::SubmissionRejected { code, .. }
            | SubmitError::TransactionFailed { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = SubmitError::SubmissionRejected {
            code: "tecUNFUNDED_PAYMENT".into(),
            message: String::new(),
        };
        assert_eq!(err.to_string(), "submission rejected: tecUNFUNDED_PAYMENT");
        assert_eq!(err.result_code(), Some("tecUNFUNDED_PAYMENT"));

        let expired = SubmitError::ExpiredUnconfirmed {
            window: ConfirmationWindow::from_base(100, 10),
        };
        assert_eq!(expired.to_string(), "transaction unconfirmed after ledger 110");
        assert_eq!(expired.result_code(), None);
        assert_eq!(expired.label(), "expired");
    }

    #[test]
    fn test_transient_exhaustion_display() {
        let err = SubmitError::TransientNode {
            attempts: 3,
            last: LedgerError::Timeout(10),
        };
        assert_eq!(
            err.to_string(),
            "node unavailable after 3 attempts: RPC timeout after 10 seconds"
        );
    }
}
