//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! queue / submission / ledger produce:
//!     → logging.rs (structured log events, stderr)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → terminal or log aggregation
//!     → Prometheus scrape (optional)
//! ```

pub mod logging;
pub mod metrics;
