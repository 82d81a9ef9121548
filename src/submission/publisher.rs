//! Batch publication.
//!
//! # Policies
//! - `Sequential`: one lane per account. Inside a lane, transaction N+1 is
//!   submitted only after N reached a terminal state; lanes for different
//!   accounts run concurrently. A failure halts its lane and the rest of
//!   that lane is reported as `Blocked`.
//! - `Parallel`: every transaction submitted at once. Later sequences may
//!   be rejected if an earlier one fails or lags.
//!
//! Results always come back in input order.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{SubmissionConfig, SubmissionPolicy};
use crate::submission::engine::{Confirmation, SubmissionEngine};
use crate::submission::error::SubmitError;
use crate::tx::SignedTransaction;

pub type PublishResult = Result<Confirmation, SubmitError>;

/// Publishes batches of signed transactions through one engine.
pub struct Publisher {
    engine: Arc<SubmissionEngine>,
    policy: SubmissionPolicy,
    halt_on_failure: bool,
    /// Serializes concurrent batches touching the same account.
    lanes: DashMap<String, Arc<Mutex<()>>>,
}

impl Publisher {
    pub fn new(engine: Arc<SubmissionEngine>, config: &SubmissionConfig) -> Self {
        Self {
            engine,
            policy: config.policy,
            halt_on_failure: config.halt_on_failure,
            lanes: DashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: SubmissionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> SubmissionPolicy {
        self.policy
    }

    pub fn engine(&self) -> &Arc<SubmissionEngine> {
        &self.engine
    }

    /// Submit and confirm every transaction; one result per input, in order.
    pub async fn publish_all(&self, transactions: Vec<SignedTransaction>) -> Vec<PublishResult> {
        let batch = Uuid::new_v4();
        let span = tracing::info_span!(
            "publish",
            batch = %batch,
            count = transactions.len(),
            policy = ?self.policy
        );

        async {
            tracing::info!("Publishing batch");
            let results = match self.policy {
                SubmissionPolicy::Parallel => {
                    join_all(
                        transactions
                            .iter()
                            .map(|tx| self.engine.submit_and_confirm(tx)),
                    )
                    .await
                }
                SubmissionPolicy::Sequential => self.publish_sequential(&transactions).await,
            };
            let confirmed = results.iter().filter(|r| r.is_ok()).count();
            tracing::info!(confirmed, failed = results.len() - confirmed, "Batch finished");
            results
        }
        .instrument(span)
        .await
    }

    async fn publish_sequential(&self, transactions: &[SignedTransaction]) -> Vec<PublishResult> {
        let mut lanes: Vec<(&str, Vec<usize>)> = Vec::new();
        let mut lane_of: HashMap<&str, usize> = HashMap::new();
        for (index, tx) in transactions.iter().enumerate() {
            let lane = *lane_of.entry(tx.account.as_str()).or_insert_with(|| {
                lanes.push((tx.account.as_str(), Vec::new()));
                lanes.len() - 1
            });
            lanes[lane].1.push(index);
        }

        let runs = lanes
            .into_iter()
            .map(|(account, indices)| self.run_lane(account, indices, transactions));
        let mut indexed: Vec<(usize, PublishResult)> =
            join_all(runs).await.into_iter().flatten().collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    async fn run_lane(
        &self,
        account: &str,
        indices: Vec<usize>,
        transactions: &[SignedTransaction],
    ) -> Vec<(usize, PublishResult)> {
        let lock = self.lanes.entry(account.to_string()).or_default().clone();
        let _guard = lock.lock().await;

        let mut halted_by: Option<u32> = None;
        let mut results = Vec::with_capacity(indices.len());
        for index in indices {
            let tx = &transactions[index];
            if let Some(blocked_by) = halted_by {
                results.push((
                    index,
                    Err(SubmitError::Blocked {
                        sequence: tx.sequence,
                        blocked_by,
                    }),
                ));
                continue;
            }

            let result = self.engine.submit_and_confirm(tx).await;
            if result.is_err() && self.halt_on_failure {
                tracing::warn!(
                    account,
                    sequence = tx.sequence,
                    "Lane halted, later transactions blocked"
                );
                halted_by = Some(tx.sequence);
            }
            results.push((index, result));
        }
        results
    }
}
