//! Submit-and-confirm state machine.
//!
//! # Responsibilities
//! - Submit a signed blob and capture the confirmation window
//! - Poll for the validated outcome inside that window
//! - Reconnect and resubmit on transient node faults, within the retry policy
//! - Abort promptly on cancellation
//!
//! # States
//! ```text
//! connect → submit ──rejected──→ Failed(SubmissionRejected)
//!    ↑         │ transient
//!    └─backoff─┘
//!              │ applied / queued
//!              ↓
//!            poll ──not yet available──→ horizon check → sleep → poll
//!              ├── tesSUCCESS → Confirmed
//!              ├── other code → Failed(TransactionFailed)
//!              ├── not found / window passed → Failed(ExpiredUnconfirmed)
//!              └── transport fault → Failed(ConnectionError)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::config::SubmissionConfig;
use crate::ledger::types::{TEF_ALREADY, TEF_PAST_SEQ};
use crate::ledger::{Connector, LedgerClient, LedgerError, SubmitResult, TxOutcome};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::submission::error::SubmitError;
use crate::tx::{ConfirmationWindow, SignedTransaction};

/// A transaction validated with `tesSUCCESS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub id: String,
    pub sequence: u32,
    /// Preliminary result of the submit call that was accepted.
    pub submit_result: SubmitResult,
    pub outcome: TxOutcome,
    pub window: ConfirmationWindow,
    /// Submit attempts made, first one included.
    pub attempts: u32,
}

enum AttemptError {
    Transient(LedgerError),
    Fatal(SubmitError),
}

struct Submitted {
    client: Arc<dyn LedgerClient>,
    window: ConfirmationWindow,
    result: SubmitResult,
}

/// Drives one signed transaction to a terminal state.
pub struct SubmissionEngine {
    connector: Arc<dyn Connector>,
    horizon: u32,
    poll_interval: Duration,
    retry: RetryPolicy,
    signal: ShutdownSignal,
}

impl SubmissionEngine {
    pub fn new(connector: Arc<dyn Connector>, config: &SubmissionConfig) -> Self {
        Self {
            connector,
            horizon: config.horizon,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            retry: RetryPolicy::default(),
            signal: ShutdownSignal::never(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Abort submissions when `signal` fires.
    pub fn with_signal(mut self, signal: ShutdownSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_horizon(mut self, horizon: u32) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn horizon(&self) -> u32 {
        self.horizon
    }

    /// Open a connection through the engine's connector.
    pub async fn connect(&self) -> Result<Arc<dyn LedgerClient>, SubmitError> {
        self.cancellable(self.connector.connect())
            .await?
            .map_err(|e| SubmitError::ConnectionError(e.to_string()))
    }

    /// Submit `tx` and wait for its validated outcome.
    pub async fn submit_and_confirm(
        &self,
        tx: &SignedTransaction,
    ) -> Result<Confirmation, SubmitError> {
        let started = Instant::now();
        let span = tracing::info_span!("submit", tx_id = %tx.id, sequence = tx.sequence);
        let result = self.drive(tx, started).instrument(span).await;

        let label = match &result {
            Ok(_) => "confirmed",
            Err(e) => e.label(),
        };
        metrics::record_submission(label, started.elapsed());

        match &result {
            Ok(confirmation) => tracing::info!(
                tx_id = %tx.id,
                sequence = tx.sequence,
                ledger_version = confirmation.outcome.ledger_version,
                attempts = confirmation.attempts,
                "Transaction confirmed"
            ),
            Err(e) => tracing::warn!(
                tx_id = %tx.id,
                sequence = tx.sequence,
                error = %e,
                "Transaction not confirmed"
            ),
        }
        result
    }

    async fn drive(
        &self,
        tx: &SignedTransaction,
        started: Instant,
    ) -> Result<Confirmation, SubmitError> {
        if tx.signed_transaction.is_empty() {
            return Err(SubmitError::Precondition(
                "signed transaction blob is empty".to_string(),
            ));
        }

        let mut attempts = 0u32;
        let mut submit_sent = false;
        loop {
            attempts += 1;
            match self.submit_once(tx, &mut submit_sent).await {
                Ok(submitted) => {
                    let outcome = self
                        .poll(submitted.client.as_ref(), &tx.id, submitted.window)
                        .await?;
                    return Ok(Confirmation {
                        id: tx.id.clone(),
                        sequence: tx.sequence,
                        submit_result: submitted.result,
                        outcome,
                        window: submitted.window,
                        attempts,
                    });
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(AttemptError::Transient(err)) => {
                    if !self.retry.allows_retry(attempts, started.elapsed()) {
                        tracing::error!(
                            attempt = attempts,
                            error = %err,
                            "Retry policy exhausted"
                        );
                        return Err(SubmitError::TransientNode {
                            attempts,
                            last: err,
                        });
                    }
                    let delay = self.retry.delay(attempts);
                    tracing::warn!(
                        attempt = attempts,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Transient node error, reconnecting"
                    );
                    metrics::record_reconnect();
                    self.cancellable(tokio::time::sleep(delay)).await?;
                }
            }
        }
    }

    /// One connect + submit attempt on a fresh connection.
    ///
    /// `submit_sent` records whether any earlier attempt reached the submit
    /// call; only then can the node already hold the blob.
    async fn submit_once(
        &self,
        tx: &SignedTransaction,
        submit_sent: &mut bool,
    ) -> Result<Submitted, AttemptError> {
        let client = self
            .cancellable(self.connector.connect())
            .await
            .map_err(AttemptError::Fatal)?
            .map_err(AttemptError::Transient)?;

        let resubmission = *submit_sent;
        *submit_sent = true;

        // Ledger version and submit go out together so the window base
        // cannot trail the ledger the transaction lands in.
        let (base, result) = self
            .cancellable(async {
                tokio::try_join!(
                    async {
                        client
                            .get_ledger_version()
                            .await
                            .map_err(classify_ledger_query_fault)
                    },
                    async {
                        client
                            .submit(&tx.signed_transaction)
                            .await
                            .map_err(classify_submit_fault)
                    },
                )
            })
            .await
            .map_err(AttemptError::Fatal)??;

        if !result.is_accepted() {
            let already_held = resubmission
                && (result.result_code == TEF_ALREADY || result.result_code == TEF_PAST_SEQ);
            if !already_held {
                return Err(AttemptError::Fatal(SubmitError::SubmissionRejected {
                    code: result.result_code,
                    message: result.result_message,
                }));
            }
            tracing::debug!(
                result_code = %result.result_code,
                "Blob already accepted on an earlier attempt"
            );
        }

        let window = ConfirmationWindow::from_base(base, self.horizon);
        tracing::debug!(
            result_code = %result.result_code,
            min_ledger = window.min_ledger_version,
            max_ledger = window.max_ledger_version,
            "Submitted"
        );
        Ok(Submitted {
            client,
            window,
            result,
        })
    }

    async fn poll(
        &self,
        client: &dyn LedgerClient,
        id: &str,
        window: ConfirmationWindow,
    ) -> Result<TxOutcome, SubmitError> {
        let mut polls = 0u32;
        loop {
            polls += 1;
            metrics::record_status_poll();
            let status = self
                .cancellable(client.get_transaction_status(id, window))
                .await?;

            match status {
                Ok(outcome) if outcome.is_success() => return Ok(outcome),
                Ok(outcome) => {
                    return Err(SubmitError::TransactionFailed {
                        code: outcome.result,
                        ledger_version: outcome.ledger_version,
                    })
                }
                Err(LedgerError::NotFound) => {
                    return Err(SubmitError::ExpiredUnconfirmed { window })
                }
                Err(pending) if pending.is_not_yet_available() => {
                    let validated = self
                        .cancellable(client.get_ledger_version())
                        .await?
                        .map_err(|e| SubmitError::ConnectionError(e.to_string()))?;
                    if window.is_expired(validated) {
                        return Err(SubmitError::ExpiredUnconfirmed { window });
                    }
                    tracing::debug!(
                        poll = polls,
                        validated,
                        reason = %pending,
                        "Outcome not yet available"
                    );
                    self.cancellable(tokio::time::sleep(self.poll_interval))
                        .await?;
                }
                Err(other) => return Err(SubmitError::ConnectionError(other.to_string())),
            }
        }
    }

    /// Run `future` unless the engine's shutdown signal fires first.
    pub async fn cancellable<F: Future>(&self, future: F) -> Result<F::Output, SubmitError> {
        let mut signal = self.signal.clone();
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(SubmitError::Cancelled),
            output = future => Ok(output),
        }
    }
}

/// A failed ledger query says nothing about the submit, so it never
/// surfaces as a rejection.
fn classify_ledger_query_fault(err: LedgerError) -> AttemptError {
    if err.is_transient() {
        return AttemptError::Transient(err);
    }
    AttemptError::Fatal(SubmitError::ConnectionError(format!(
        "ledger version query failed: {err}"
    )))
}

fn classify_submit_fault(err: LedgerError) -> AttemptError {
    if err.is_transient() {
        return AttemptError::Transient(err);
    }
    match err {
        LedgerError::Node { code, message } => {
            AttemptError::Fatal(SubmitError::SubmissionRejected { code, message })
        }
        other => AttemptError::Fatal(SubmitError::ConnectionError(other.to_string())),
    }
}
