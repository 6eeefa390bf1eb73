//! Shutdown control flag
//!
//! A clonable bi-valued signal shared between the supervisor and in-flight
//! workers: set means "keep running", cleared means "drain and exit".
//! Workers check [`ControlFlag::is_set`] before acquiring new work and race
//! [`ControlFlag::cleared`] against in-flight requests.

use std::sync::Arc;

use tokio::sync::watch;

/// Cancellable run/drain signal
#[derive(Debug, Clone)]
pub struct ControlFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl ControlFlag {
    /// Create a flag in the set ("keep running") state
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        Self { tx: Arc::new(tx) }
    }

    /// Whether workers should keep running
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Signal all observers to drain and exit
    pub fn clear(&self) {
        let _ = self.tx.send(false);
    }

    /// Resolve once the flag has been cleared
    ///
    /// Returns immediately if the flag is already cleared.
    pub async fn cleared(&self) {
        let mut rx = self.tx.subscribe();
        while *rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for ControlFlag {
    fn default() -> Self {
        Self::new()
    }
}
