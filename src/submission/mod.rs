//! Submission subsystem.
//!
//! # Data Flow
//! ```text
//! Vec<SignedTransaction> (queue materialize, saved report, or stdin stream)
//!     → publisher.rs (per-account lanes or parallel)
//!     → engine.rs submit_and_confirm (fresh connection per attempt)
//!         ├── submit + ledger version → confirmation window
//!         ├── transient fault → backoff → reconnect → resubmit
//!         └── poll status within window → Confirmed | SubmitError
//!     → report.rs records
//! ```

pub mod engine;
pub mod error;
pub mod funding;
pub mod publisher;
pub mod stream;

pub use engine::{Confirmation, SubmissionEngine};
pub use error::SubmitError;
pub use funding::{fund, FundingError, FundingOutcome, FundingRequest};
pub use publisher::{PublishResult, Publisher};
pub use stream::{submit_stream, StreamError, StreamOutcome};
