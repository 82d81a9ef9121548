//! Metrics collection and exposition.
//!
//! # Metrics
//! - `txq_submissions_total` (counter): submit outcomes by result
//! - `txq_reconnects_total` (counter): reconnect-and-resubmit attempts
//! - `txq_status_polls_total` (counter): confirmation status queries
//! - `txq_confirmation_seconds` (histogram): submit-to-terminal latency
//! - `txq_ledger_node_health` (gauge): 1=reachable, 0=unreachable
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the terminal result of one `submit_and_confirm`.
pub fn record_submission(result: &'static str, elapsed: Duration) {
    metrics::counter!("txq_submissions_total", "result" => result).increment(1);
    metrics::histogram!("txq_confirmation_seconds", "result" => result)
        .record(elapsed.as_secs_f64());
}

pub fn record_reconnect() {
    metrics::counter!("txq_reconnects_total").increment(1);
}

pub fn record_status_poll() {
    metrics::counter!("txq_status_polls_total").increment(1);
}

pub fn record_node_health(healthy: bool) {
    metrics::gauge!("txq_ledger_node_health").set(if healthy { 1.0 } else { 0.0 });
}
