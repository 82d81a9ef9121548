//! OS signal handling.
//!
//! # Responsibilities
//! - Listen for Ctrl-C / SIGINT
//! - Trigger cancellation of in-flight submissions

use std::sync::Arc;

use crate::lifecycle::shutdown::Shutdown;

/// Trigger `shutdown` on the first Ctrl-C.
pub fn spawn_ctrl_c_handler(shutdown: Arc<Shutdown>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("Interrupt received, cancelling in-flight submissions");
                shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt signal"),
        }
    })
}
