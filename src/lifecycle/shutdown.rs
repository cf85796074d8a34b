//! Shutdown coordination for the agent.

use std::sync::Arc;

use tokio::sync::watch;

use crate::observability::metrics;

/// Coordinator for graceful shutdown.
///
/// A gate that starts open and closes at most once. Clones share the same
/// gate; hand one to every task that must stop when the process shuts down.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Gate state: `true` once closed.
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create a new, open shutdown gate.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Close the gate.
    ///
    /// Returns `true` for the one call that performed the transition; every
    /// later call is a no-op returning `false`.
    pub fn trigger(&self) -> bool {
        let closed_now = self.tx.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });

        if closed_now {
            metrics::record_shutdown_triggered();
            tracing::debug!("Shutdown gate closed");
        }
        closed_now
    }

    /// Whether the gate is closed.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the gate closes. Returns immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
