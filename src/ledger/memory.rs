//! In-memory ledger for tests and offline rehearsal.
//!
//! [`MemoryLedger`] simulates just enough of a ledger node to exercise the
//! queue and the submission engine: per-account sequence enforcement,
//! validated ledger progression, and `tx` lookups bounded by a window.
//! Faults can be injected per call (submit transport faults, forced engine
//! results, scripted status responses, connect failures) and every call is
//! recorded in a [`CallLog`].

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::ledger::client::{Connector, LedgerClient};
use crate::ledger::txjson::{build_tx_json, CommonFields};
use crate::ledger::types::{
    AccountInfo, LedgerError, LedgerResult, SubmitResult, TxOutcome, TEF_ALREADY, TEF_PAST_SEQ,
    TES_SUCCESS,
};
use crate::queue::wallet::{Identity, Secret};
use crate::tx::{
    ConfirmationWindow, Operation, PrepareOptions, SignedTransaction, UnsignedTransaction,
};

/// Fee charged when the caller does not override it.
pub const DEFAULT_FEE_DROPS: u64 = 12;

/// Record of every call made against a [`MemoryLedger`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallLog {
    pub prepares: u32,
    pub signs: u32,
    /// Submit calls, including those that hit an injected fault.
    pub submits: u32,
    /// Submits that applied a transaction to the ledger.
    pub applied: u32,
    /// Account sequences in the order they were applied.
    pub applied_sequences: Vec<u32>,
    /// Window of every status query, in call order.
    pub status_queries: Vec<ConfirmationWindow>,
    pub ledger_version_queries: u32,
}

#[derive(Debug, Clone)]
struct MemoryAccount {
    secret: Option<Secret>,
    sequence: u32,
    balance_drops: u64,
    flags: u32,
}

#[derive(Debug, Clone)]
struct AppliedTx {
    result: String,
    ledger_version: u32,
    fee_drops: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    validated: u32,
    auto_close: bool,
    accounts: HashMap<String, MemoryAccount>,
    transactions: HashMap<String, AppliedTx>,
    submit_faults: VecDeque<LedgerError>,
    ledger_version_faults: VecDeque<LedgerError>,
    forced_results: VecDeque<String>,
    status_script: VecDeque<LedgerError>,
    generated: u32,
    calls: CallLog,
}

/// Simulated ledger node.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

impl MemoryLedger {
    /// A ledger whose latest validated version is `validated`.
    pub fn new(validated: u32) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                validated,
                ..MemoryState::default()
            }),
        }
    }

    /// Register a funded account.
    pub fn with_account(self, identity: &Identity, sequence: u32, balance_drops: u64) -> Self {
        self.inspect().accounts.insert(
            identity.address.clone(),
            MemoryAccount {
                secret: Some(identity.secret.clone()),
                sequence,
                balance_drops,
                flags: 0,
            },
        );
        self
    }

    /// Advance the validated ledger by one on every status query.
    pub fn with_auto_close(self, enabled: bool) -> Self {
        self.inspect().auto_close = enabled;
        self
    }

    /// Fail the next `count` submit calls with `error`.
    pub fn fail_next_submits(&self, count: usize, error: LedgerError) {
        let mut state = self.inspect();
        state
            .submit_faults
            .extend(std::iter::repeat(error).take(count));
    }

    /// Fail the next `count` validated-ledger queries with `error`.
    pub fn fail_next_ledger_queries(&self, count: usize, error: LedgerError) {
        let mut state = self.inspect();
        state
            .ledger_version_faults
            .extend(std::iter::repeat(error).take(count));
    }

    /// Answer the next submit calls with these engine results, without
    /// applying anything.
    pub fn force_submit_results<I, S>(&self, results: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inspect()
            .forced_results
            .extend(results.into_iter().map(Into::into));
    }

    /// Answer the next status queries with these errors before consulting
    /// the ledger.
    pub fn script_status<I>(&self, responses: I)
    where
        I: IntoIterator<Item = LedgerError>,
    {
        self.inspect().status_script.extend(responses);
    }

    /// Validate one more ledger.
    pub fn close_ledger(&self) -> u32 {
        let mut state = self.inspect();
        state.validated += 1;
        state.validated
    }

    pub fn validated_version(&self) -> u32 {
        self.inspect().validated
    }

    pub fn calls(&self) -> CallLog {
        self.inspect().calls.clone()
    }

    pub fn account(&self, address: &str) -> Option<AccountInfo> {
        self.inspect().accounts.get(address).map(account_info)
    }

    /// Recorded result of an applied transaction.
    pub fn outcome(&self, id: &str) -> Option<String> {
        self.inspect()
            .transactions
            .get(id)
            .map(|tx| tx.result.clone())
    }

    fn inspect(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> LedgerResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::Connection(format!("lock poisoned: {e}")))
    }
}

fn account_info(account: &MemoryAccount) -> AccountInfo {
    AccountInfo {
        sequence: account.sequence,
        balance_drops: account.balance_drops,
        flags: account.flags,
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

fn decode_blob(blob: &str) -> LedgerResult<Value> {
    let invalid = |message: String| LedgerError::Node {
        code: "invalidTransaction".to_string(),
        message,
    };
    let bytes = hex::decode(blob).map_err(|e| invalid(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))
}

/// XRP payment amount in drops, if the transaction is one.
fn xrp_payment(tx: &Value) -> Option<(String, u64)> {
    if tx["TransactionType"] != "Payment" {
        return None;
    }
    let drops = tx["Amount"].as_str()?.parse().ok()?;
    Some((tx["Destination"].as_str()?.to_string(), drops))
}

impl MemoryState {
    /// Apply a decoded transaction; returns the engine result.
    fn apply(&mut self, id: String, tx: &Value) -> String {
        let account = tx["Account"].as_str().unwrap_or_default().to_string();
        let sequence = tx["Sequence"].as_u64().unwrap_or_default() as u32;
        let fee: u64 = tx["Fee"]
            .as_str()
            .and_then(|f| f.parse().ok())
            .unwrap_or(DEFAULT_FEE_DROPS);

        let next_ledger = self.validated + 1;
        let Some(source) = self.accounts.get_mut(&account) else {
            return "terNO_ACCOUNT".to_string();
        };
        if sequence < source.sequence {
            return TEF_PAST_SEQ.to_string();
        }
        if sequence > source.sequence {
            return "terPRE_SEQ".to_string();
        }
        if let Some(last) = tx["LastLedgerSequence"].as_u64() {
            if (last as u32) < next_ledger {
                return "tefMAX_LEDGER".to_string();
            }
        }

        source.sequence += 1;
        source.balance_drops = source.balance_drops.saturating_sub(fee);
        let mut result = TES_SUCCESS.to_string();

        if let Some((destination, drops)) = xrp_payment(tx) {
            if source.balance_drops < drops {
                result = "tecUNFUNDED_PAYMENT".to_string();
            } else {
                source.balance_drops -= drops;
                self.accounts
                    .entry(destination)
                    .or_insert(MemoryAccount {
                        secret: None,
                        sequence: next_ledger,
                        balance_drops: 0,
                        flags: 0,
                    })
                    .balance_drops += drops;
            }
        }

        self.calls.applied += 1;
        self.calls.applied_sequences.push(sequence);
        self.transactions.insert(
            id,
            AppliedTx {
                result: result.clone(),
                ledger_version: next_ledger,
                fee_drops: fee.to_string(),
            },
        );
        result
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn prepare(
        &self,
        account: &str,
        operation: &Operation,
        options: &PrepareOptions,
    ) -> LedgerResult<UnsignedTransaction> {
        let mut state = self.state()?;
        state.calls.prepares += 1;

        let last_ledger_sequence = options
            .max_ledger_version_offset
            .map(|offset| state.validated + offset);
        let tx_json = build_tx_json(
            operation,
            CommonFields {
                account,
                sequence: options.sequence,
                fee_drops: options.fee_drops.unwrap_or(DEFAULT_FEE_DROPS),
                last_ledger_sequence,
            },
        );

        Ok(UnsignedTransaction {
            kind: operation.kind(),
            account: account.to_string(),
            sequence: options.sequence,
            tx_json,
            max_ledger_version: last_ledger_sequence,
        })
    }

    async fn sign(
        &self,
        unsigned: &UnsignedTransaction,
        secret: &Secret,
    ) -> LedgerResult<SignedTransaction> {
        let mut state = self.state()?;
        state.calls.signs += 1;

        if let Some(account) = state.accounts.get(&unsigned.account) {
            if account.secret.as_ref().is_some_and(|s| s != secret) {
                return Err(LedgerError::Node {
                    code: "badSecret".to_string(),
                    message: "secret does not match account".to_string(),
                });
            }
        }

        let mut signed = unsigned.tx_json.clone();
        let body = serde_json::to_vec(&unsigned.tx_json)
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        let mut signature_input = secret.expose().as_bytes().to_vec();
        signature_input.extend_from_slice(&body);
        signed["TxnSignature"] = Value::String(digest_hex(&signature_input));

        let bytes = serde_json::to_vec(&signed).map_err(|e| LedgerError::Malformed(e.to_string()))?;
        Ok(SignedTransaction {
            id: digest_hex(&bytes),
            signed_transaction: hex::encode_upper(&bytes),
            account: unsigned.account.clone(),
            sequence: unsigned.sequence,
            kind: Some(unsigned.kind),
            max_ledger_version: unsigned.max_ledger_version,
        })
    }

    async fn submit(&self, signed_blob: &str) -> LedgerResult<SubmitResult> {
        let mut state = self.state()?;
        state.calls.submits += 1;

        if let Some(fault) = state.submit_faults.pop_front() {
            return Err(fault);
        }
        let tx = decode_blob(signed_blob)?;
        if let Some(forced) = state.forced_results.pop_front() {
            return Ok(SubmitResult::new(forced));
        }

        let bytes = hex::decode(signed_blob).map_err(|e| LedgerError::Malformed(e.to_string()))?;
        let id = digest_hex(&bytes);
        if state.transactions.contains_key(&id) {
            return Ok(SubmitResult::new(TEF_ALREADY));
        }

        Ok(SubmitResult::new(state.apply(id, &tx)))
    }

    async fn get_transaction_status(
        &self,
        id: &str,
        window: ConfirmationWindow,
    ) -> LedgerResult<TxOutcome> {
        let mut state = self.state()?;
        state.calls.status_queries.push(window);
        if state.auto_close {
            state.validated += 1;
        }
        if let Some(scripted) = state.status_script.pop_front() {
            return Err(scripted);
        }

        let validated = state.validated;
        match state.transactions.get(id) {
            Some(tx) if tx.ledger_version > validated => Err(LedgerError::PendingLedgerVersion),
            Some(tx) if window.contains(tx.ledger_version) => Ok(TxOutcome {
                result: tx.result.clone(),
                ledger_version: tx.ledger_version,
                fee_drops: Some(tx.fee_drops.clone()),
            }),
            _ if window.max_ledger_version > validated => Err(LedgerError::PendingLedgerVersion),
            _ => Err(LedgerError::NotFound),
        }
    }

    async fn get_ledger_version(&self) -> LedgerResult<u32> {
        let mut state = self.state()?;
        state.calls.ledger_version_queries += 1;
        if let Some(fault) = state.ledger_version_faults.pop_front() {
            return Err(fault);
        }
        Ok(state.validated)
    }

    async fn get_account_info(&self, address: &str) -> LedgerResult<AccountInfo> {
        let state = self.state()?;
        state
            .accounts
            .get(address)
            .map(account_info)
            .ok_or(LedgerError::AccountNotFound)
    }

    async fn generate_identity(&self) -> LedgerResult<Identity> {
        let mut state = self.state()?;
        state.generated += 1;
        let n = state.generated;
        Ok(Identity::new(
            format!("rGenerated{n}"),
            Secret::new(format!("sGenerated{n}")),
        ))
    }
}

/// Connector handing out the same [`MemoryLedger`], with injectable
/// connect failures.
#[derive(Debug)]
pub struct MemoryConnector {
    ledger: Arc<MemoryLedger>,
    connects: AtomicU32,
    connect_faults: Mutex<VecDeque<LedgerError>>,
}

impl MemoryConnector {
    pub fn new(ledger: Arc<MemoryLedger>) -> Self {
        Self {
            ledger,
            connects: AtomicU32::new(0),
            connect_faults: Mutex::new(VecDeque::new()),
        }
    }

    /// Fail the next `count` connects with `error`.
    pub fn fail_next_connects(&self, count: usize, error: LedgerError) {
        self.connect_faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(std::iter::repeat(error).take(count));
    }

    /// Number of connect calls so far.
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> LedgerResult<Arc<dyn LedgerClient>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let fault = self
            .connect_faults
            .lock()
            .map_err(|e| LedgerError::Connection(format!("lock poisoned: {e}")))?
            .pop_front();
        match fault {
            Some(err) => Err(err),
            None => Ok(self.ledger.clone() as Arc<dyn LedgerClient>),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::AccountSetting;

    fn alice() -> Identity {
        Identity::new("rAlice", Secret::new("sAlice"))
    }

    async fn signed(ledger: &MemoryLedger, sequence: u32) -> SignedTransaction {
        let unsigned = ledger
            .prepare(
                "rAlice",
                &Operation::from(AccountSetting::DefaultRipple(true)),
                &PrepareOptions {
                    sequence,
                    ..PrepareOptions::default()
                },
            )
            .await
            .unwrap();
        ledger.sign(&unsigned, &alice().secret).await.unwrap()
    }

    #[tokio::test]
    async fn test_applies_in_sequence() {
        let ledger = MemoryLedger::new(100).with_account(&alice(), 5, 100_000_000);

        let tx = signed(&ledger, 5).await;
        let result = ledger.submit(&tx.signed_transaction).await.unwrap();
        assert_eq!(result.result_code, TES_SUCCESS);
        assert_eq!(ledger.account("rAlice").unwrap().sequence, 6);

        // same blob again
        let again = ledger.submit(&tx.signed_transaction).await.unwrap();
        assert_eq!(again.result_code, TEF_ALREADY);
    }

    #[tokio::test]
    async fn test_sequence_gap_rejected() {
        let ledger = MemoryLedger::new(100).with_account(&alice(), 5, 100_000_000);
        let ahead = signed(&ledger, 7).await;
        let result = ledger.submit(&ahead.signed_transaction).await.unwrap();
        assert_eq!(result.result_code, "terPRE_SEQ");
        assert_eq!(ledger.calls().applied, 0);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let ledger = MemoryLedger::new(100).with_account(&alice(), 1, 0);
        let unsigned = ledger
            .prepare(
                "rAlice",
                &Operation::from(AccountSetting::DefaultRipple(true)),
                &PrepareOptions::default(),
            )
            .await
            .unwrap();
        let err = ledger.sign(&unsigned, &Secret::new("sMallory")).await.unwrap_err();
        assert!(matches!(err, LedgerError::Node { ref code, .. } if code == "badSecret"));
    }

    #[tokio::test]
    async fn test_status_visible_once_validated() {
        let ledger = MemoryLedger::new(100).with_account(&alice(), 1, 100_000_000);
        let tx = signed(&ledger, 1).await;
        ledger.submit(&tx.signed_transaction).await.unwrap();

        let window = ConfirmationWindow::from_base(100, 10);
        assert_eq!(
            ledger.get_transaction_status(&tx.id, window).await,
            Err(LedgerError::PendingLedgerVersion)
        );
        ledger.close_ledger();
        let outcome = ledger.get_transaction_status(&tx.id, window).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.ledger_version, 101);
    }

    #[tokio::test]
    async fn test_unknown_tx_not_found_after_window() {
        let ledger = MemoryLedger::new(120);
        let window = ConfirmationWindow::from_base(100, 10);
        assert_eq!(
            ledger.get_transaction_status("DEADBEEF", window).await,
            Err(LedgerError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_connector_faults() {
        let connector = MemoryConnector::new(Arc::new(MemoryLedger::new(1)));
        connector.fail_next_connects(1, LedgerError::Connection("refused".into()));
        assert!(connector.connect().await.is_err());
        assert!(connector.connect().await.is_ok());
        assert_eq!(connector.connects(), 2);
    }
}
