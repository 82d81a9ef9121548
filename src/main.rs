//! ripple-txq: queue, sign and submit Ripple account transactions.
//!
//! # Flow
//!
//! ```text
//!   --generate / --address + --secret
//!        │
//!        ▼
//!   ┌──────────┐  --fund   ┌──────────────┐
//!   │  wallet  │──────────▶│   funding    │
//!   └────┬─────┘           └──────────────┘
//!        │ --sequence or ledger sync
//!        ▼
//!   ┌──────────┐  --flags / --fee / --trust
//!   │  queue   │◀──────────────────────────
//!   └────┬─────┘
//!        │ materialize (prepare + sign, in order)
//!        ▼
//!   ┌──────────┐  --save    ┌──────────────┐
//!   │  report  │───────────▶│  JSON file   │
//!   └────┬─────┘            └──────────────┘
//!        │ --publish
//!        ▼
//!   ┌──────────┐
//!   │publisher │──▶ submission engine ──▶ ledger node
//!   └──────────┘
//! ```
//!
//! Reports go to stdout, logs to stderr. Any failure prints one
//! diagnostic line and exits non-zero.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use ripple_txq::config::validation::validate_config;
use ripple_txq::config::{load_or_default, SubmissionPolicy, TxqConfig};
use ripple_txq::error::AppError;
use ripple_txq::ledger::{Connector, LedgerError, RippledConnector};
use ripple_txq::lifecycle::signals::spawn_ctrl_c_handler;
use ripple_txq::lifecycle::Shutdown;
use ripple_txq::observability::{logging, metrics};
use ripple_txq::queue::{Identity, QueueError, Secret, TxQueue, Wallet};
use ripple_txq::report::{self, OutputFormat, WalletReport};
use ripple_txq::resilience::RetryPolicy;
use ripple_txq::submission::funding::DEFAULT_FUNDING_XRP;
use ripple_txq::submission::{
    fund, submit_stream, FundingOutcome, FundingRequest, Publisher, SubmissionEngine,
};
use ripple_txq::tx::{AccountSetting, TrustlineParams};

#[derive(Debug, Parser)]
#[command(name = "ripple-txq", version)]
#[command(about = "Queue, sign and submit Ripple account transactions", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON-RPC endpoint (overrides the config file)
    #[arg(long, value_name = "URL")]
    rpc_url: Option<String>,

    /// Ripple address
    #[arg(long, help_heading = "Wallet")]
    address: Option<String>,

    /// Ripple secret
    #[arg(long, env = "RIPPLE_TXQ_SECRET", hide_env_values = true, help_heading = "Wallet")]
    secret: Option<String>,

    /// Generate a new wallet on the ledger node
    #[arg(long, conflicts_with = "address", help_heading = "Wallet")]
    generate: bool,

    /// Sequence of the first queued transaction (default: synced from the ledger)
    #[arg(long, help_heading = "Wallet")]
    sequence: Option<u32>,

    /// Print the account's next sequence and exit
    #[arg(long, requires = "address", help_heading = "Wallet")]
    get_sequence: bool,

    /// Account flags to set (defaultRipple, disallowIncomingXRP, requireDestinationTag)
    #[arg(long, num_args = 1.., value_name = "FLAG", help_heading = "Operations")]
    flags: Vec<String>,

    /// Trust line, e.g. currency=USD,counterparty=r...,limit=1000
    #[arg(long, value_name = "SPEC", help_heading = "Operations")]
    trust: Option<TrustlineParams>,

    /// Transfer rate charged on issued currencies, e.g. 1.002
    #[arg(long, value_name = "RATE", help_heading = "Operations")]
    fee: Option<f64>,

    /// Network fee per transaction in drops (default: queried from the node)
    #[arg(long, value_name = "DROPS", help_heading = "Operations")]
    tx_fee: Option<u64>,

    /// Submit the queued (or loaded) transactions
    #[arg(long, help_heading = "Output")]
    publish: bool,

    /// Save the signed transactions to a file
    #[arg(long, value_name = "PATH", help_heading = "Output")]
    save: Option<PathBuf>,

    /// Publish transactions from a saved file
    #[arg(long, value_name = "PATH", help_heading = "Output")]
    load: Option<PathBuf>,

    /// Sign and print, never submit
    #[arg(long, conflicts_with = "publish", help_heading = "Output")]
    export_only: bool,

    /// Submit signed transactions read from stdin, one JSON object per line
    #[arg(long, conflicts_with_all = ["load", "generate"], help_heading = "Output")]
    submit_stream: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json, help_heading = "Output")]
    format: OutputFormat,

    /// Fund the wallet if its account does not exist yet
    #[arg(long, requires_all = ["funding_address", "funding_secret"], help_heading = "Funding")]
    fund: bool,

    /// Funding ripple address
    #[arg(long, help_heading = "Funding")]
    funding_address: Option<String>,

    /// Funding ripple secret
    #[arg(long, env = "RIPPLE_TXQ_FUNDING_SECRET", hide_env_values = true, help_heading = "Funding")]
    funding_secret: Option<String>,

    /// Funding amount in XRP
    #[arg(long, default_value_t = DEFAULT_FUNDING_XRP, help_heading = "Funding")]
    funding_amount: f64,

    /// Submit all transactions at once instead of one at a time per account
    #[arg(long, help_heading = "Submission")]
    parallel: bool,

    /// Confirmation window width in ledgers
    #[arg(long, help_heading = "Submission")]
    horizon: Option<u32>,

    /// Reconnect attempts after transient node errors
    #[arg(long, conflicts_with = "unbounded_reconnect", help_heading = "Submission")]
    max_reconnects: Option<u32>,

    /// Reconnect after transient node errors without limit
    #[arg(long, help_heading = "Submission")]
    unbounded_reconnect: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // logging may not be initialized yet; stderr always works
            let _ = write_diagnostic(&mut std::io::stderr().lock(), &e);
            ExitCode::FAILURE
        }
    }
}

/// The one line printed for a failed run.
fn write_diagnostic<W: Write>(out: &mut W, e: &AppError) -> std::io::Result<()> {
    writeln!(out, "error: {e}")
}

/// File config, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<TxqConfig, AppError> {
    let mut config = load_or_default(cli.config.as_deref())?;

    if let Some(url) = &cli.rpc_url {
        config.ledger.rpc_url = url.clone();
    }
    if let Some(horizon) = cli.horizon {
        config.submission.horizon = horizon;
    }
    if cli.parallel {
        config.submission.policy = SubmissionPolicy::Parallel;
    }
    if let Some(reconnects) = cli.max_reconnects {
        config.reconnect.unbounded = false;
        config.reconnect.max_attempts = reconnects.saturating_add(1);
    }
    if cli.unbounded_reconnect {
        config.reconnect.unbounded = true;
    }

    validate_config(&config).map_err(AppError::Options)?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = resolve_config(&cli)?;
    logging::init_logging(&config.observability, cli.verbose);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        rpc_url = %config.ledger.rpc_url,
        horizon = config.submission.horizon,
        policy = ?config.submission.policy,
        "ripple-txq starting"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let shutdown = Arc::new(Shutdown::new());
    spawn_ctrl_c_handler(shutdown.clone());

    let connector: Arc<dyn Connector> = Arc::new(RippledConnector::new(config.ledger.clone()));
    let engine = Arc::new(
        SubmissionEngine::new(connector, &config.submission)
            .with_retry_policy(RetryPolicy::from_config(&config.reconnect))
            .with_signal(shutdown.subscribe()),
    );

    if cli.submit_stream {
        return publish_stream(&engine, &config).await;
    }
    if let Some(path) = &cli.load {
        return publish_saved(path, engine, &config, &cli).await;
    }

    if cli.get_sequence {
        let address = cli.address.as_deref().ok_or(QueueError::MissingWallet)?;
        let client = engine.connect().await?;
        let info = engine.cancellable(client.get_account_info(address)).await??;
        println!("{}", info.sequence);
        return Ok(());
    }

    let queue = TxQueue::new(Wallet::new())
        .with_fee_drops(cli.tx_fee)
        .with_max_ledger_version_offset(config.ledger.max_ledger_version_offset);

    if cli.generate {
        let client = engine.connect().await?;
        engine
            .cancellable(queue.generate_identity(client.as_ref()))
            .await??;
    } else if let Some(address) = &cli.address {
        let secret = cli.secret.clone().ok_or_else(|| {
            QueueError::Precondition("secret not provided (--secret or RIPPLE_TXQ_SECRET)".into())
        })?;
        queue.import_identity(Identity::new(address.clone(), Secret::new(secret)))?;
    }
    let identity = queue.identity().ok_or(QueueError::MissingWallet)?;

    if cli.fund {
        fund_wallet(&engine, &cli, &config, &identity.address).await?;
    }

    let mut settings = cli
        .flags
        .iter()
        .map(|flag| AccountSetting::enable_flag(flag))
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(rate) = cli.fee {
        settings.push(AccountSetting::TransferRate(rate));
    }
    let has_operations = !settings.is_empty() || cli.trust.is_some();

    if let Some(sequence) = cli.sequence {
        queue.set_sequence(sequence)?;
    } else if has_operations {
        let client = engine.connect().await?;
        match engine.cancellable(queue.sync_sequence(client.as_ref())).await? {
            Ok(sequence) => tracing::info!(sequence, "Sequence synced from ledger"),
            Err(QueueError::Ledger(LedgerError::AccountNotFound)) => tracing::warn!(
                sequence = queue.sequence(),
                "Account not on ledger yet, keeping local sequence"
            ),
            Err(e) => return Err(e.into()),
        }
    }

    queue.set_options(settings)?;
    if let Some(trust) = cli.trust.clone() {
        queue.set_trustline(trust)?;
    }

    let signed = if queue.is_empty() {
        Vec::new()
    } else {
        let client = engine.connect().await?;
        engine
            .cancellable(queue.materialize(client.as_ref()))
            .await??
    };
    let mut wallet_report = WalletReport::new(Some(&identity), queue.sequence(), signed);

    if let Some(path) = &cli.save {
        report::save_report(path, &wallet_report)?;
    }
    if cli.publish && !wallet_report.transactions.is_empty() {
        let publisher = Publisher::new(engine, &config.submission);
        let results = publisher
            .publish_all(wallet_report.signed_transactions())
            .await;
        wallet_report.record_results(&results);
    }

    report::write_report(&mut std::io::stdout().lock(), &wallet_report, cli.format)?;
    ensure_confirmed(&wallet_report)
}

async fn fund_wallet(
    engine: &SubmissionEngine,
    cli: &Cli,
    config: &TxqConfig,
    target: &str,
) -> Result<(), AppError> {
    let (Some(address), Some(secret)) = (&cli.funding_address, &cli.funding_secret) else {
        return Err(QueueError::Precondition("funding address and secret required".into()).into());
    };
    let funder = Identity::new(address.clone(), Secret::new(secret.clone()));
    let request = FundingRequest {
        target: target.to_string(),
        amount_xrp: cli.funding_amount,
        fee_drops: cli.tx_fee,
        max_ledger_version_offset: config.ledger.max_ledger_version_offset,
    };

    match fund(engine, &funder, &request).await? {
        FundingOutcome::AlreadyFunded(info) => tracing::info!(
            address = %target,
            balance_drops = info.balance_drops,
            "Wallet already funded"
        ),
        FundingOutcome::Funded(confirmation) => tracing::info!(
            address = %target,
            tx_id = %confirmation.id,
            ledger_version = confirmation.outcome.ledger_version,
            "Wallet funded"
        ),
    }
    Ok(())
}

async fn publish_saved(
    path: &Path,
    engine: Arc<SubmissionEngine>,
    config: &TxqConfig,
    cli: &Cli,
) -> Result<(), AppError> {
    let mut wallet_report = report::load_report(path)?;
    if !cli.export_only {
        let publisher = Publisher::new(engine, &config.submission);
        let results = publisher
            .publish_all(wallet_report.signed_transactions())
            .await;
        wallet_report.record_results(&results);
    }
    report::write_report(&mut std::io::stdout().lock(), &wallet_report, cli.format)?;
    ensure_confirmed(&wallet_report)
}

async fn publish_stream(engine: &SubmissionEngine, config: &TxqConfig) -> Result<(), AppError> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let outcome = submit_stream(engine, stdin, config.submission.halt_on_failure).await;

    // records of submitted lines go out even when the input went bad later
    let mut out = std::io::stdout().lock();
    for record in outcome.records() {
        report::write_record(&mut out, &record)?;
    }
    out.flush().map_err(report::ReportError::from)?;

    let failed = outcome.failures();
    let total = outcome.results.len();
    if let Some(err) = outcome.errors.into_iter().next() {
        return Err(err.into());
    }
    if failed > 0 {
        return Err(AppError::Unconfirmed { failed, total });
    }
    Ok(())
}

fn ensure_confirmed(wallet_report: &WalletReport) -> Result<(), AppError> {
    let failed = wallet_report.failures();
    if failed > 0 {
        return Err(AppError::Unconfirmed {
            failed,
            total: wallet_report.transactions.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_prints_one_line() {
        let mut out = Vec::new();
        write_diagnostic(&mut out, &AppError::Unconfirmed { failed: 1, total: 3 }).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "error: 1 of 3 transaction(s) not confirmed\n");
    }

    #[test]
    fn test_stream_and_load_conflict() {
        let parsed = Cli::try_parse_from(["ripple-txq", "--submit-stream", "--load", "w.json"]);
        assert!(parsed.is_err());
    }
}
