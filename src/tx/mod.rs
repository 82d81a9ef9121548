//! Transaction model.
//!
//! # Lifecycle
//! ```text
//! Drafted (Operation + sequence)
//!     → Prepared (UnsignedTransaction, carries expiration ledger)
//!     → Signed (SignedTransaction)
//!     → Submitted
//!     → Confirmed | Failed
//! ```

pub mod operation;
pub mod types;

pub use operation::{
    AccountSetting, Amount, Operation, OperationKind, OperationParseError, PaymentParams,
    SettingsParams, TrustlineParams,
};
pub use types::{
    ConfirmationWindow, DraftTransaction, PrepareOptions, SignedTransaction, TxStatus,
    UnsignedTransaction,
};
