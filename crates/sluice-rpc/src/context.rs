//! RPC dependency-injection context and the modification tracker.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use sluice_history::ComposerHistory;
use sluice_rules::RulesService;

/// Shared context passed to every RPC handler.
#[derive(Clone)]
pub struct RpcContext {
    /// Rules, values and properties.
    pub rules: Arc<RulesService>,
    /// Composer request history.
    pub history: ComposerHistory,
    /// Modification tracker polled by UI clients.
    pub changes: Arc<ChangeTracker>,
    /// When the service started.
    pub start_time: Instant,
}

/// The last recorded modification.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Modification {
    /// Incremented on every recorded change.
    pub version: u64,
    /// Client that made the last change, if it identified itself.
    pub client_id: Option<String>,
    /// Whether the last change touched rules.
    pub rules_changed: bool,
    /// When the last change was recorded (ms since epoch, 0 if never).
    pub mtime: i64,
}

/// Tracks modifications so clients can tell whether to reload.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    state: Mutex<Modification>,
}

impl ChangeTracker {
    /// Create a tracker with no recorded changes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a modification.
    pub fn record(&self, client_id: Option<String>, rules_changed: bool) {
        let mut state = self.state.lock();
        state.version += 1;
        state.client_id = client_id;
        state.rules_changed = rules_changed;
        state.mtime = chrono::Utc::now().timestamp_millis();
    }

    /// Current state.
    pub fn snapshot(&self) -> Modification {
        self.state.lock().clone()
    }
}
