//! Submit-from-stream mode.
//!
//! Reads one JSON-encoded signed transaction per line and submits them in
//! line order, each reaching a terminal state before the next is read.
//! Bad input lines end up in [`StreamOutcome::errors`]; results of lines
//! already submitted are always kept.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::report::TransactionRecord;
use crate::submission::engine::SubmissionEngine;
use crate::submission::publisher::PublishResult;
use crate::tx::SignedTransaction;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid transaction: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything a stream run produced.
#[derive(Debug, Default)]
pub struct StreamOutcome {
    /// Transactions read from the stream, each with its result, in line order.
    pub results: Vec<(SignedTransaction, PublishResult)>,
    /// Input that could not be read or parsed.
    pub errors: Vec<StreamError>,
}

impl StreamOutcome {
    /// One output record per submitted transaction.
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.results
            .iter()
            .map(|(tx, result)| {
                let mut record = TransactionRecord::signed(tx.clone());
                record.record(result);
                record
            })
            .collect()
    }

    /// Failed transactions plus bad input lines.
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_err()).count() + self.errors.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures() == 0
    }
}

/// Submit every line of `reader` in order.
///
/// With `halt_on_failure`, reading stops after the first failed
/// transaction or unparsable line. A read error always stops the stream.
/// Blank lines are skipped.
pub async fn submit_stream<R>(
    engine: &SubmissionEngine,
    reader: R,
    halt_on_failure: bool,
) -> StreamOutcome
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut outcome = StreamOutcome::default();
    let mut line_no = 0usize;

    loop {
        line_no += 1;
        let raw = match lines.next_line().await {
            Ok(Some(raw)) => raw,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(line = line_no, error = %e, "Failed to read stream");
                outcome.errors.push(StreamError::Io(e));
                break;
            }
        };
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let tx: SignedTransaction = match serde_json::from_str(line) {
            Ok(tx) => tx,
            Err(source) => {
                let err = StreamError::Parse {
                    line: line_no,
                    source,
                };
                tracing::error!(error = %err, "Skipping unparsable line");
                outcome.errors.push(err);
                if halt_on_failure {
                    break;
                }
                continue;
            }
        };

        tracing::debug!(line = line_no, tx_id = %tx.id, "Read transaction from stream");
        let result = engine.submit_and_confirm(&tx).await;
        let failed = result.is_err();
        outcome.results.push((tx, result));
        if failed && halt_on_failure {
            tracing::warn!(line = line_no, "Stopping stream after failure");
            break;
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::SubmissionConfig;
    use crate::ledger::{MemoryConnector, MemoryLedger};

    fn engine() -> SubmissionEngine {
        SubmissionEngine::new(
            Arc::new(MemoryConnector::new(Arc::new(MemoryLedger::new(1)))),
            &SubmissionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_parse_error_reports_line() {
        let input: &[u8] = b"\nnot json\n";
        let outcome = submit_stream(&engine(), input, true).await;
        assert!(outcome.results.is_empty());
        assert!(matches!(outcome.errors[..], [StreamError::Parse { line: 2, .. }]));
        assert_eq!(outcome.failures(), 1);
    }

    #[tokio::test]
    async fn test_keeps_reading_past_bad_lines_without_halt() {
        let input: &[u8] = b"not json\n{\n";
        let outcome = submit_stream(&engine(), input, false).await;
        assert_eq!(outcome.errors.len(), 2);
        assert!(matches!(outcome.errors[1], StreamError::Parse { line: 2, .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_read_error() {
        let input: &[u8] = b"\xff\xfe\n";
        let outcome = submit_stream(&engine(), input, false).await;
        assert!(matches!(outcome.errors[..], [StreamError::Io(_)]));
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let input: &[u8] = b"";
        let outcome = submit_stream(&engine(), input, true).await;
        assert!(outcome.results.is_empty());
        assert!(outcome.is_complete());
    }
}
