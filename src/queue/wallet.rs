//! Wallet identity and sequence counter.
//!
//! # Security
//! - Secrets can be loaded from an environment variable
//! - Secrets are never logged: `Secret` has a redacting `Debug`
//! - Secrets only leave the process in an explicit wallet report

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::queue::QueueError;

/// Environment variable name for the wallet secret.
pub const SECRET_ENV_VAR: &str = "RIPPLE_TXQ_SECRET";

/// Opaque signing credential (a family seed).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Raw secret, for signing and explicit export only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Account address plus the secret that signs for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub address: String,
    pub secret: Secret,
}

impl Identity {
    pub fn new(address: impl Into<String>, secret: Secret) -> Self {
        Self {
            address: address.into(),
            secret,
        }
    }

    /// Build an identity with the secret read from `RIPPLE_TXQ_SECRET`.
    pub fn from_env(address: impl Into<String>) -> Result<Self, QueueError> {
        let secret = std::env::var(SECRET_ENV_VAR).map_err(|_| {
            QueueError::Precondition(format!("environment variable {} not set", SECRET_ENV_VAR))
        })?;
        Ok(Self::new(address, Secret::new(secret)))
    }
}

/// The unit transactions are queued against: identity plus the next
/// sequence number to hand out.
#[derive(Debug, Clone)]
pub struct Wallet {
    identity: Option<Identity>,
    sequence: u32,
}

impl Wallet {
    /// Wallet without identity, sequence starting at 1.
    pub fn new() -> Self {
        Self {
            identity: None,
            sequence: 1,
        }
    }

    pub fn with_identity(identity: Identity) -> Self {
        tracing::info!(address = %identity.address, "Wallet imported");
        Self {
            identity: Some(identity),
            sequence: 1,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The identity, or a precondition error when none is set.
    pub fn require_identity(&self) -> Result<&Identity, QueueError> {
        self.identity.as_ref().ok_or(QueueError::MissingWallet)
    }

    pub fn address(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.address.as_str())
    }

    /// Next sequence number that will be handed out.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Hand out the current sequence and advance the counter.
    pub(crate) fn take_sequence(&mut self) -> Result<u32, QueueError> {
        let sequence = self.sequence;
        self.sequence = sequence
            .checked_add(1)
            .ok_or(QueueError::SequenceExhausted)?;
        Ok(sequence)
    }

    pub(crate) fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }

    pub(crate) fn set_identity(&mut self, identity: Identity) {
        self.identity = Some(identity);
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_is_redacted() {
        let identity = Identity::new("rAddress", Secret::new("sSuperSecret"));
        let printed = format!("{:?}", identity);
        assert!(printed.contains("rAddress"));
        assert!(!printed.contains("sSuperSecret"));
    }

    #[test]
    fn test_sequence_management() {
        let mut wallet = Wallet::new();
        assert_eq!(wallet.sequence(), 1);
        assert_eq!(wallet.take_sequence().unwrap(), 1);
        assert_eq!(wallet.take_sequence().unwrap(), 2);
        assert_eq!(wallet.sequence(), 3);

        wallet.set_sequence(100);
        assert_eq!(wallet.sequence(), 100);

        wallet.set_sequence(u32::MAX);
        assert!(matches!(
            wallet.take_sequence(),
            Err(QueueError::SequenceExhausted)
        ));
    }

    #[test]
    fn test_missing_identity() {
        let wallet = Wallet::new();
        assert!(matches!(
            wallet.require_identity(),
            Err(QueueError::MissingWallet)
        ));
    }

    #[test]
    fn test_secret_serializes_transparently() {
        let json = serde_json::to_string(&Secret::new("sAbc")).unwrap();
        assert_eq!(json, "\"sAbc\"");
    }
}
