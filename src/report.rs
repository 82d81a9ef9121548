//! Wallet reports: what was queued, signed and published.
//!
//! A report is printed to stdout (pretty JSON or line-delimited JSON) and
//! can be saved to disk and loaded back later for publication.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::{Identity, Secret};
use crate::submission::PublishResult;
use crate::tx::{SignedTransaction, TxStatus};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid report JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output layout on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One pretty-printed JSON document.
    #[default]
    Json,
    /// Wallet header line, then one JSON record per transaction.
    Lines,
}

/// One transaction and, once published, how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub transaction: SignedTransaction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TxStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransactionRecord {
    pub fn signed(transaction: SignedTransaction) -> Self {
        Self {
            transaction,
            result_code: None,
            outcome: Some(TxStatus::Signed),
            ledger_version: None,
            error: None,
        }
    }

    /// Fold a publication result into the record.
    pub fn record(&mut self, result: &PublishResult) {
        match result {
            Ok(confirmation) => {
                self.result_code = Some(confirmation.outcome.result.clone());
                self.outcome = Some(TxStatus::Confirmed);
                self.ledger_version = Some(confirmation.outcome.ledger_version);
                self.error = None;
            }
            Err(e) => {
                self.result_code = e.result_code().map(str::to_string);
                self.outcome = Some(TxStatus::Failed);
                self.error = Some(e.to_string());
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReport {
    /// Next unused sequence number.
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<Secret>,
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Serialize)]
struct ReportHeader<'a> {
    sequence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a Secret>,
}

impl WalletReport {
    pub fn new(identity: Option<&Identity>, sequence: u32, signed: Vec<SignedTransaction>) -> Self {
        Self {
            sequence,
            address: identity.map(|i| i.address.clone()),
            secret: identity.map(|i| i.secret.clone()),
            transactions: signed.into_iter().map(TransactionRecord::signed).collect(),
        }
    }

    pub fn signed_transactions(&self) -> Vec<SignedTransaction> {
        self.transactions
            .iter()
            .map(|record| record.transaction.clone())
            .collect()
    }

    /// Apply results positionally; `results` is in transaction order.
    pub fn record_results(&mut self, results: &[PublishResult]) {
        for (record, result) in self.transactions.iter_mut().zip(results) {
            record.record(result);
        }
    }

    /// Whether every transaction ended confirmed.
    pub fn all_confirmed(&self) -> bool {
        self.transactions
            .iter()
            .all(|record| record.outcome == Some(TxStatus::Confirmed))
    }

    pub fn failures(&self) -> usize {
        self.transactions
            .iter()
            .filter(|record| record.outcome == Some(TxStatus::Failed))
            .count()
    }
}

pub fn write_report<W: Write>(
    writer: &mut W,
    report: &WalletReport,
    format: OutputFormat,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *writer, report)?;
            writeln!(writer)?;
        }
        OutputFormat::Lines => {
            let header = ReportHeader {
                sequence: report.sequence,
                address: report.address.as_deref(),
                secret: report.secret.as_ref(),
            };
            serde_json::to_writer(&mut *writer, &header)?;
            writeln!(writer)?;
            for record in &report.transactions {
                write_record(writer, record)?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write one record as a single JSON line.
pub fn write_record<W: Write>(writer: &mut W, record: &TransactionRecord) -> Result<(), ReportError> {
    serde_json::to_writer(&mut *writer, record)?;
    writeln!(writer)?;
    Ok(())
}

/// Write `report` as JSON to `path`, replacing any existing file.
pub fn save_report(path: &Path, report: &WalletReport) -> Result<(), ReportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, report)?;
    writer.flush()?;
    tracing::info!(
        path = %path.display(),
        transactions = report.transactions.len(),
        "Report saved"
    );
    Ok(())
}

pub fn load_report(path: &Path) -> Result<WalletReport, ReportError> {
    let file = File::open(path)?;
    let report: WalletReport = serde_json::from_reader(BufReader::new(file))?;
    tracing::info!(
        path = %path.display(),
        transactions = report.transactions.len(),
        "Report loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SubmitError;

    fn signed(id: &str, sequence: u32) -> SignedTransaction {
        SignedTransaction {
            id: id.to_string(),
            signed_transaction: format!("BLOB{sequence}"),
            account: "rAlice".to_string(),
            sequence,
            kind: None,
            max_ledger_version: None,
        }
    }

    fn report() -> WalletReport {
        let identity = Identity::new("rAlice", Secret::new("sAlice"));
        WalletReport::new(Some(&identity), 7, vec![signed("A", 5), signed("B", 6)])
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");

        save_report(&path, &report()).unwrap();
        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded, report());
        assert_eq!(loaded.signed_transactions()[1].sequence, 6);
    }

    #[test]
    fn test_loads_minimal_transactions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.json");
        std::fs::write(
            &path,
            r#"{"sequence":3,"address":"rAlice","secret":"sAlice",
                "transactions":[{"id":"AA","signedTransaction":"1200","txJSON":"{}"}]}"#,
        )
        .unwrap();

        let loaded = load_report(&path).unwrap();
        assert_eq!(loaded.transactions.len(), 1);
        assert_eq!(loaded.transactions[0].transaction.id, "AA");
        assert_eq!(loaded.secret.as_ref().map(Secret::expose), Some("sAlice"));
    }

    #[test]
    fn test_lines_format() {
        let mut out = Vec::new();
        write_report(&mut out, &report(), OutputFormat::Lines).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("\"address\":\"rAlice\""));
        assert!(lines[2].contains("\"id\":\"B\""));
    }

    #[test]
    fn test_record_results() {
        let mut report = report();
        report.record_results(&[
            Err(SubmitError::SubmissionRejected {
                code: "terPRE_SEQ".into(),
                message: String::new(),
            }),
            Err(SubmitError::Blocked {
                sequence: 6,
                blocked_by: 5,
            }),
        ]);
        assert_eq!(report.failures(), 2);
        assert!(!report.all_confirmed());
        assert_eq!(report.transactions[0].result_code.as_deref(), Some("terPRE_SEQ"));
        assert_eq!(report.transactions[1].result_code, None);
    }
}
