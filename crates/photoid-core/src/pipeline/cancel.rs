//! Broadcast-once cancellation shared by every pipeline stage.

use std::sync::Arc;
use tokio::sync::watch;

/// A cloneable "stop" flag observed cooperatively by the walker and workers.
///
/// Triggering is idempotent: the flag flips from `false` to `true` once and
/// stays there. Every clone observes the same flag.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl CancellationSignal {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trigger the signal.
    ///
    /// Returns `true` if this call flipped the flag, `false` if it was already set.
    pub fn cancel(&self) -> bool {
        self.tx.send_if_modified(|cancelled| {
            if *cancelled {
                false
            } else {
                *cancelled = true;
                true
            }
        })
    }

    /// Check the flag without blocking.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait until the signal is triggered.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so `wait_for` only returns once the flag is set.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }

    /// Guard that triggers this signal when dropped.
    pub fn drop_guard(&self) -> CancelOnDrop {
        CancelOnDrop {
            signal: self.clone(),
        }
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Triggers the wrapped [`CancellationSignal`] on drop, whatever the exit path.
#[derive(Debug)]
pub struct CancelOnDrop {
    signal: CancellationSignal,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.signal.cancel() {
            tracing::trace!("Cancellation signal triggered on teardown");
        }
    }
}
