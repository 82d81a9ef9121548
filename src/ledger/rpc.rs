//! JSON-RPC ledger client with timeout and failover.
//!
//! # Responsibilities
//! - Talk to a ledger node's JSON-RPC HTTP endpoint
//! - Try the primary endpoint first, then failovers, each with a timeout
//! - Translate node error codes into `LedgerError`
//! - Classify "not found" lookups against the confirmation window

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::timeout;
use url::Url;

use crate::config::LedgerConfig;
use crate::ledger::client::{Connector, LedgerClient};
use crate::ledger::txjson::{build_tx_json, CommonFields};
use crate::ledger::types::{AccountInfo, LedgerError, LedgerResult, SubmitResult, TxOutcome};
use crate::observability::metrics;
use crate::queue::wallet::{Identity, Secret};
use crate::tx::{
    ConfirmationWindow, Operation, PrepareOptions, SignedTransaction, UnsignedTransaction,
};

/// JSON-RPC client for a ledger node.
#[derive(Clone)]
pub struct RippledClient {
    /// Primary endpoint followed by failovers.
    endpoints: Vec<Url>,
    http: reqwest::Client,
    config: LedgerConfig,
    timeout_duration: Duration,
}

impl RippledClient {
    /// Create a new client. Does not touch the network.
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        let primary: Url = config.rpc_url.parse().map_err(|e| {
            LedgerError::Connection(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let mut endpoints = vec![primary];

        for url_str in &config.failover_urls {
            match url_str.parse() {
                Ok(url) => endpoints.push(url),
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LedgerError::Connection(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            endpoints,
            http,
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            config,
        })
    }

    /// Issue a call and return the raw `result` object, node errors included.
    async fn call_raw(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let body = json!({ "method": method, "params": [params] });
        let mut last_error = LedgerError::Connection("no RPC endpoints configured".to_string());

        for (i, url) in self.endpoints.iter().enumerate() {
            let request = async {
                let response = self.http.post(url.clone()).json(&body).send().await?;
                response.error_for_status()?.json::<Value>().await
            };

            match timeout(self.timeout_duration, request).await {
                Ok(Ok(mut envelope)) => {
                    let result = envelope
                        .get_mut("result")
                        .map(Value::take)
                        .ok_or_else(|| LedgerError::Malformed(format!("{} response has no result", method)))?;

                    match node_error(&result) {
                        Some(err) if err.is_transient() => {
                            tracing::warn!(endpoint_idx = i, method, error = %err, "Node busy, trying next endpoint");
                            last_error = err;
                        }
                        _ => return Ok(result),
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(endpoint_idx = i, method, error = %e, "RPC error, trying next endpoint");
                    last_error = LedgerError::Connection(e.to_string());
                }
                Err(_) => {
                    tracing::warn!(endpoint_idx = i, method, "RPC timeout, trying next endpoint");
                    last_error = LedgerError::Timeout(self.config.rpc_timeout_secs);
                }
            }
        }

        Err(last_error)
    }

    /// Issue a call, turning node errors into `Err`.
    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let result = self.call_raw(method, params).await?;
        match node_error(&result) {
            Some(err) => Err(err),
            None => Ok(result),
        }
    }

    /// Liveness probe.
    pub async fn ping(&self) -> LedgerResult<()> {
        let healthy = self.call("ping", json!({})).await;
        metrics::record_node_health(healthy.is_ok());
        healthy.map(|_| ())
    }

    /// Open-ledger fee in drops, capped at the configured maximum.
    pub async fn fee_drops(&self) -> LedgerResult<u64> {
        let result = self.call("fee", json!({})).await?;
        let fee = result["drops"]["open_ledger_fee"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| LedgerError::Malformed("fee response lacks drops.open_ledger_fee".into()))?;

        if fee > self.config.max_fee_drops {
            tracing::warn!(
                fee_drops = fee,
                max_fee_drops = self.config.max_fee_drops,
                "Open ledger fee above maximum, capping"
            );
        }
        Ok(fee.min(self.config.max_fee_drops))
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }
}

/// Extract a node-level error from a `result` object.
fn node_error(result: &Value) -> Option<LedgerError> {
    let is_error = result["status"] == "error" || result.get("error").is_some();
    if !is_error {
        return None;
    }
    let code = result["error"].as_str().unwrap_or("unknown").to_string();
    let message = result["error_message"]
        .as_str()
        .or_else(|| result["error_exception"].as_str())
        .unwrap_or_default()
        .to_string();

    Some(match code.as_str() {
        "actNotFound" => LedgerError::AccountNotFound,
        _ => LedgerError::Node { code, message },
    })
}

fn field_u32(value: &Value, name: &str) -> LedgerResult<u32> {
    value[name]
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| LedgerError::Malformed(format!("missing or invalid '{}'", name)))
}

fn field_str<'a>(value: &'a Value, name: &str) -> LedgerResult<&'a str> {
    value[name]
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("missing or invalid '{}'", name)))
}

/// Outcome of a `tx` lookup that found the transaction.
fn parse_outcome(result: &Value) -> LedgerResult<TxOutcome> {
    if result["validated"] != Value::Bool(true) {
        return Err(LedgerError::PendingLedgerVersion);
    }
    let meta = &result["meta"];
    Ok(TxOutcome {
        result: field_str(meta, "TransactionResult")?.to_string(),
        ledger_version: field_u32(result, "ledger_index")?,
        fee_drops: result["Fee"].as_str().map(str::to_string),
    })
}

/// Why a transaction was not found inside `window`.
fn classify_not_found(result: &Value, window: ConfirmationWindow, validated: u32) -> LedgerError {
    if window.max_ledger_version > validated {
        LedgerError::PendingLedgerVersion
    } else if result["searched_all"] != Value::Bool(true) {
        LedgerError::MissingLedgerHistory
    } else {
        LedgerError::NotFound
    }
}

#[async_trait]
impl LedgerClient for RippledClient {
    async fn prepare(
        &self,
        account: &str,
        operation: &Operation,
        options: &PrepareOptions,
    ) -> LedgerResult<UnsignedTransaction> {
        let fee_drops = match options.fee_drops {
            Some(fee) => fee,
            None => self.fee_drops().await?,
        };
        let last_ledger_sequence = match options.max_ledger_version_offset {
            Some(offset) => Some(self.get_ledger_version().await?.saturating_add(offset)),
            None => None,
        };

        let tx_json = build_tx_json(
            operation,
            CommonFields {
                account,
                sequence: options.sequence,
                fee_drops,
                last_ledger_sequence,
            },
        );

        tracing::debug!(
            account,
            kind = %operation.kind(),
            sequence = options.sequence,
            fee_drops,
            "Transaction prepared"
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
        let result = self
            .call(
                "sign",
                json!({
                    "tx_json": unsigned.tx_json,
                    "secret": secret.expose(),
                    "offline": true,
                }),
            )
            .await?;

        Ok(SignedTransaction {
            id: field_str(&result["tx_json"], "hash")?.to_string(),
            signed_transaction: field_str(&result, "tx_blob")?.to_string(),
            account: unsigned.account.clone(),
            sequence: unsigned.sequence,
            kind: Some(unsigned.kind),
            max_ledger_version: unsigned.max_ledger_version,
        })
    }

    async fn submit(&self, signed_blob: &str) -> LedgerResult<SubmitResult> {
        let result = self.call("submit", json!({ "tx_blob": signed_blob })).await?;
        Ok(SubmitResult {
            result_code: field_str(&result, "engine_result")?.to_string(),
            result_message: result["engine_result_message"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        })
    }

    async fn get_transaction_status(
        &self,
        id: &str,
        window: ConfirmationWindow,
    ) -> LedgerResult<TxOutcome> {
        let result = self
            .call_raw(
                "tx",
                json!({
                    "transaction": id,
                    "binary": false,
                    "min_ledger": window.min_ledger_version,
                    "max_ledger": window.max_ledger_version,
                }),
            )
            .await?;

        match node_error(&result) {
            None => parse_outcome(&result),
            Some(LedgerError::Node { code, .. }) if code == "txnNotFound" => {
                let validated = self.get_ledger_version().await?;
                Err(classify_not_found(&result, window, validated))
            }
            Some(err) => Err(err),
        }
    }

    async fn get_ledger_version(&self) -> LedgerResult<u32> {
        let result = self
            .call("ledger", json!({ "ledger_index": "validated" }))
            .await?;
        field_u32(&result, "ledger_index")
    }

    async fn get_account_info(&self, address: &str) -> LedgerResult<AccountInfo> {
        let result = self
            .call(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await?;
        let data = &result["account_data"];
        Ok(AccountInfo {
            sequence: field_u32(data, "Sequence")?,
            balance_drops: field_str(data, "Balance")?
                .parse()
                .map_err(|_| LedgerError::Malformed("account Balance is not a number".into()))?,
            flags: data["Flags"].as_u64().unwrap_or(0) as u32,
        })
    }

    async fn generate_identity(&self) -> LedgerResult<Identity> {
        let result = self.call("wallet_propose", json!({})).await?;
        Ok(Identity::new(
            field_str(&result, "account_id")?,
            Secret::new(field_str(&result, "master_seed")?),
        ))
    }
}

impl std::fmt::Debug for RippledClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RippledClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("endpoints", &self.endpoints.len())
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}

/// Builds a fresh `RippledClient` per connection and probes it.
#[derive(Debug, Clone)]
pub struct RippledConnector {
    config: LedgerConfig,
}

impl RippledConnector {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for RippledConnector {
    async fn connect(&self) -> LedgerResult<Arc<dyn LedgerClient>> {
        let client = RippledClient::new(self.config.clone())?;
        client.ping().await?;
        tracing::debug!(rpc_url = %self.config.rpc_url, "Ledger connection established");
        Ok(Arc::new(client))
    }
}
