//! Coalescing recompose signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Notify;

/// Requests a recomposition from the recompose worker.
///
/// Requests made while a pass is running collapse into a single follow-up
/// pass.
#[derive(Clone, Debug, Default)]
pub struct RecomposeTrigger {
    notify: Arc<Notify>,
    requests: Arc<AtomicU64>,
}

impl RecomposeTrigger {
    /// Create a trigger with no pending request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a recomposition.
    pub fn request(&self) {
        let _ = self.requests.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }

    /// Total requests made so far.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Wait until at least one request is pending.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}
