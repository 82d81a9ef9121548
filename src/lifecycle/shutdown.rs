//! Cancellation coordination.

use tokio::sync::watch;

/// Coordinator for cancelling in-flight submissions.
///
/// Level-triggered: a signal subscribed after `trigger` still observes it.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Get the number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been triggered.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|triggered| *triggered).await.is_err() {
            // coordinator dropped without triggering
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_late_subscriber_sees_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut signal = shutdown.subscribe();
        assert!(signal.is_cancelled());
        tokio::time::timeout(Duration::from_millis(100), signal.cancelled())
            .await
            .expect("already triggered");
    }

    #[tokio::test]
    async fn test_untriggered_signal_pends() {
        let shutdown = Shutdown::new();
        let mut signal = shutdown.subscribe();
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
        assert_eq!(shutdown.receiver_count(), 1);
    }

    #[tokio::test]
    async fn test_never_signal() {
        let mut signal = ShutdownSignal::never();
        assert!(!signal.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), signal.cancelled()).await;
        assert!(waited.is_err());
    }
}
