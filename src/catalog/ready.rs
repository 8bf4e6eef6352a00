//! One-shot readiness latch
//!
//! Backed by a `watch` channel holding a single flag. Firing flips the flag
//! once; any number of readers can poll or await it without consuming it,
//! including readers that arrive after it fired.

use tokio::sync::watch;

#[derive(Debug)]
pub struct ReadySignal {
    tx: watch::Sender<bool>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Marks the catalog ready
    ///
    /// Returns `true` only for the call that actually fired the signal;
    /// later calls are no-ops and return `false`.
    pub fn fire(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// Waits until the signal has fired; returns immediately if it already has
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
