//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT → Shutdown::trigger
//!
//! Cancellation (shutdown.rs):
//!     Shutdown → ShutdownSignal per submission engine
//!     → backoff sleeps, polls and in-flight calls abort with Cancelled
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
