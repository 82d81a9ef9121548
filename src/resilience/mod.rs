//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Submit attempt fails with a transient node error:
//!     → retries.rs (attempt / deadline budget left?)
//!     → backoff.rs (fixed or exponential + jitter delay)
//!     → submission engine reconnects and resubmits
//! ```
//!
//! # Design Decisions
//! - Only transport-level submit faults are retried
//! - Bounded by default; unbounded retry must be requested explicitly

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
