//! Account funding helper.
//!
//! Sends an XRP payment from a funding identity to an account that does
//! not exist on the ledger yet. Existing accounts are left alone.

use thiserror::Error;

use crate::ledger::{AccountInfo, LedgerError};
use crate::queue::Identity;
use crate::submission::engine::{Confirmation, SubmissionEngine};
use crate::submission::error::SubmitError;
use crate::tx::{Amount, Operation, PaymentParams, PrepareOptions};

/// Default funding amount, in XRP.
pub const DEFAULT_FUNDING_XRP: f64 = 50.0;

/// Headroom on the amount the funder is willing to spend.
pub const MAX_AMOUNT_FACTOR: f64 = 1.006;

#[derive(Debug, Clone, PartialEq)]
pub enum FundingOutcome {
    /// Target already exists; nothing was sent.
    AlreadyFunded(AccountInfo),
    Funded(Confirmation),
}

#[derive(Debug, Error)]
pub enum FundingError {
    #[error("wallet address not provided")]
    MissingTarget,

    #[error("funding amount must be positive, got {0}")]
    InvalidAmount(f64),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Funding payment parameters.
#[derive(Debug, Clone)]
pub struct FundingRequest {
    pub target: String,
    pub amount_xrp: f64,
    pub fee_drops: Option<u64>,
    pub max_ledger_version_offset: Option<u32>,
}

impl FundingRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            amount_xrp: DEFAULT_FUNDING_XRP,
            fee_drops: None,
            max_ledger_version_offset: None,
        }
    }

    fn payment(&self) -> PaymentParams {
        PaymentParams {
            destination: self.target.clone(),
            amount: Amount::xrp(self.amount_xrp),
            max_amount: Some(Amount::xrp(self.amount_xrp * MAX_AMOUNT_FACTOR)),
            destination_tag: None,
        }
    }
}

/// Fund `request.target` from `funder` unless the account already exists.
pub async fn fund(
    engine: &SubmissionEngine,
    funder: &Identity,
    request: &FundingRequest,
) -> Result<FundingOutcome, FundingError> {
    if request.target.is_empty() {
        return Err(FundingError::MissingTarget);
    }
    if request.amount_xrp.is_nan() || request.amount_xrp <= 0.0 {
        return Err(FundingError::InvalidAmount(request.amount_xrp));
    }

    let client = engine.connect().await?;
    match engine.cancellable(client.get_account_info(&request.target)).await? {
        Ok(info) => {
            tracing::info!(address = %request.target, "Account already funded");
            return Ok(FundingOutcome::AlreadyFunded(info));
        }
        Err(LedgerError::AccountNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    let funder_info = engine
        .cancellable(client.get_account_info(&funder.address))
        .await??;
    let options = PrepareOptions {
        sequence: funder_info.sequence,
        fee_drops: request.fee_drops,
        max_ledger_version_offset: request.max_ledger_version_offset,
    };
    let operation = Operation::from(request.payment());
    let unsigned = engine
        .cancellable(client.prepare(&funder.address, &operation, &options))
        .await??;
    let signed = engine
        .cancellable(client.sign(&unsigned, &funder.secret))
        .await??;

    tracing::info!(
        from = %funder.address,
        to = %request.target,
        amount_xrp = request.amount_xrp,
        sequence = funder_info.sequence,
        "Funding account"
    );
    let confirmation = engine.submit_and_confirm(&signed).await?;
    Ok(FundingOutcome::Funded(confirmation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::config::SubmissionConfig;
    use crate::ledger::{MemoryConnector, MemoryLedger};
    use crate::lifecycle::Shutdown;
    use crate::queue::Secret;
    use crate::tx::operation::DROPS_PER_XRP;

    fn bank() -> Identity {
        Identity::new("rBank", Secret::new("sBank"))
    }

    fn engine(ledger: Arc<MemoryLedger>) -> SubmissionEngine {
        SubmissionEngine::new(
            Arc::new(MemoryConnector::new(ledger)),
            &SubmissionConfig::default(),
        )
        .with_poll_interval(Duration::from_millis(1))
    }

    #[test]
    fn test_payment_headroom() {
        let payment = FundingRequest::new("rNew").payment();
        assert_eq!(payment.amount, Amount::Xrp { drops: 50 * DROPS_PER_XRP });
        assert_eq!(
            payment.max_amount,
            Some(Amount::Xrp { drops: 50_300_000 })
        );
    }

    #[tokio::test]
    async fn test_existing_account_untouched() {
        let ledger = Arc::new(
            MemoryLedger::new(10)
                .with_account(&bank(), 1, 1_000 * DROPS_PER_XRP)
                .with_account(&Identity::new("rOld", Secret::new("sOld")), 1, 7),
        );
        let outcome = fund(&engine(ledger.clone()), &bank(), &FundingRequest::new("rOld"))
            .await
            .unwrap();
        assert!(matches!(outcome, FundingOutcome::AlreadyFunded(info) if info.balance_drops == 7));
        assert_eq!(ledger.calls().submits, 0);
    }

    #[tokio::test]
    async fn test_funds_missing_account() {
        let ledger = Arc::new(
            MemoryLedger::new(10)
                .with_account(&bank(), 4, 1_000 * DROPS_PER_XRP)
                .with_auto_close(true),
        );
        let outcome = fund(&engine(ledger.clone()), &bank(), &FundingRequest::new("rNew"))
            .await
            .unwrap();
        assert!(matches!(outcome, FundingOutcome::Funded(ref c) if c.sequence == 4));
        assert_eq!(
            ledger.account("rNew").unwrap().balance_drops,
            50 * DROPS_PER_XRP
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_any_ledger_call() {
        let ledger =
            Arc::new(MemoryLedger::new(10).with_account(&bank(), 4, 1_000 * DROPS_PER_XRP));
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let engine = engine(ledger.clone()).with_signal(shutdown.subscribe());

        let err = fund(&engine, &bank(), &FundingRequest::new("rNew"))
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Submit(SubmitError::Cancelled)));
        assert_eq!(ledger.calls().prepares, 0);
        assert_eq!(ledger.calls().submits, 0);
    }

    #[tokio::test]
    async fn test_missing_target() {
        let ledger = Arc::new(MemoryLedger::new(10));
        let err = fund(&engine(ledger), &bank(), &FundingRequest::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::MissingTarget));
    }
}
