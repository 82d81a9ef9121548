//! Top-level error type for the command-line tool.

use thiserror::Error;

use crate::config::ConfigError;
use crate::config::validation::ValidationError;
use crate::ledger::LedgerError;
use crate::queue::QueueError;
use crate::report::ReportError;
use crate::submission::{FundingError, StreamError, SubmitError};
use crate::tx::OperationParseError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid option: {}", join(.0))]
    Options(Vec<ValidationError>),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Operation(#[from] OperationParseError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("funding failed: {0}")]
    Funding(#[from] FundingError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    /// Publication finished but not every transaction was confirmed.
    #[error("{failed} of {total} transaction(s) not confirmed")]
    Unconfirmed { failed: usize, total: usize },
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
