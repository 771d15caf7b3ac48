//! Cancellable single-slot delayed execution.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds at most one pending delayed action. Scheduling a new action
/// unconditionally cancels and discards the previous pending one, so the
/// owner can never have two delayed callbacks in flight.
///
/// Not safe for concurrent scheduling from multiple owners; the `&mut self`
/// receivers make each worker single-owner by construction.
#[derive(Debug, Default)]
pub struct AfterWorker {
    pending: Option<JoinHandle<()>>,
}

impl AfterWorker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending action, then run `action` after `delay` on the
    /// tokio timer. Must be called from within a runtime.
    pub fn schedule<F>(&mut self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Discard the pending action if present; no-op otherwise.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for AfterWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}
