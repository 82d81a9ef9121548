//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use ripple_txq::config::{BackoffStrategy, SubmissionConfig};
use ripple_txq::ledger::{MemoryConnector, MemoryLedger};
use ripple_txq::queue::{Identity, Secret, TxQueue, Wallet};
use ripple_txq::resilience::RetryPolicy;
use ripple_txq::submission::SubmissionEngine;
use ripple_txq::tx::{Operation, SignedTransaction};

pub const BASE_LEDGER: u32 = 100;
pub const FUNDED_DROPS: u64 = 1_000_000_000;

#[allow(dead_code)]
pub fn alice() -> Identity {
    Identity::new("rAlice", Secret::new("sAlice"))
}

#[allow(dead_code)]
pub fn bob() -> Identity {
    Identity::new("rBob", Secret::new("sBob"))
}

/// Connector over a fresh ledger at `BASE_LEDGER` with the given funded
/// accounts, each at its starting sequence.
#[allow(dead_code)]
pub fn memory_connector(accounts: &[(Identity, u32)]) -> Arc<MemoryConnector> {
    let ledger = accounts
        .iter()
        .fold(MemoryLedger::new(BASE_LEDGER), |ledger, (identity, sequence)| {
            ledger.with_account(identity, *sequence, FUNDED_DROPS)
        });
    Arc::new(MemoryConnector::new(Arc::new(ledger)))
}

/// Like [`memory_connector`], but every status query closes a ledger.
#[allow(dead_code)]
pub fn auto_close_connector(accounts: &[(Identity, u32)]) -> Arc<MemoryConnector> {
    let ledger = accounts
        .iter()
        .fold(MemoryLedger::new(BASE_LEDGER), |ledger, (identity, sequence)| {
            ledger.with_account(identity, *sequence, FUNDED_DROPS)
        })
        .with_auto_close(true);
    Arc::new(MemoryConnector::new(Arc::new(ledger)))
}

/// Engine with millisecond poll and retry delays.
#[allow(dead_code)]
pub fn fast_engine(connector: Arc<MemoryConnector>) -> SubmissionEngine {
    SubmissionEngine::new(connector, &SubmissionConfig::default())
        .with_poll_interval(Duration::from_millis(1))
        .with_retry_policy(RetryPolicy::bounded(10).with_backoff(
            BackoffStrategy::Fixed,
            Duration::from_millis(1),
            Duration::from_millis(1),
        ))
}

/// Queue `operations` for `identity` starting at `sequence`, then sign them.
#[allow(dead_code)]
pub async fn sign_operations(
    ledger: &MemoryLedger,
    identity: Identity,
    sequence: u32,
    operations: Vec<Operation>,
) -> Vec<SignedTransaction> {
    let queue = TxQueue::new(Wallet::with_identity(identity));
    queue.set_sequence(sequence).unwrap();
    for operation in operations {
        queue.enqueue(operation).unwrap();
    }
    queue.materialize(ledger).await.unwrap()
}

/// Start a JSON-RPC node stub on an ephemeral port.
///
/// `handler` gets the method name and the first params object and returns
/// the `result` object.
#[allow(dead_code)]
pub async fn start_mock_node<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Value> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_json_body(&mut socket).await else {
                            return;
                        };
                        let method = request["method"].as_str().unwrap_or_default().to_string();
                        let params = request["params"][0].clone();
                        let result = handler(method, params).await;

                        let body = serde_json::json!({ "result": result }).to_string();
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_json_body(socket: &mut tokio::net::TcpStream) -> Option<Value> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body_start = header_end + 4;
        if buf.len() >= body_start + length {
            return serde_json::from_slice(&buf[body_start..body_start + length]).ok();
        }
    }
}
