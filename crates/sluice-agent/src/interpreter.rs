//! Snapshot interpreter: keeps the last composed rule set and mirrors it to disk.

use std::sync::Arc;

use parking_lot::Mutex;
use sluice_rules::{InlineValueMap, RuleInterpreter};
use sluice_store::Storage;
use tracing::{debug, warn};

/// Raw file holding the composed text.
pub const COMPOSED_FILE: &str = "composed";
/// Raw file holding the inline values as a JSON object.
pub const VALUES_FILE: &str = "values";

/// One composition hand-off.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Composed text.
    pub text: String,
    /// Inline values of the same pass.
    pub values: InlineValueMap,
}

/// Keeps the latest composition in memory and writes it under `storage`.
pub struct SnapshotInterpreter {
    storage: Arc<dyn Storage>,
    last: Mutex<Option<Snapshot>>,
}

impl SnapshotInterpreter {
    /// Create an interpreter writing into `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            last: Mutex::new(None),
        }
    }

    /// The most recent hand-off.
    pub fn last(&self) -> Option<Snapshot> {
        self.last.lock().clone()
    }
}

impl RuleInterpreter for SnapshotInterpreter {
    fn load(&self, text: &str, values: &InlineValueMap) {
        if let Err(e) = self.storage.write_raw(COMPOSED_FILE, text) {
            warn!(error = %e, "failed to write composed rules");
        }
        match serde_json::to_string_pretty(values) {
            Ok(json) => {
                if let Err(e) = self.storage.write_raw(VALUES_FILE, &json) {
                    warn!(error = %e, "failed to write inline values");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize inline values"),
        }
        debug!(bytes = text.len(), values = values.len(), "composed rules loaded");
        *self.last.lock() = Some(Snapshot {
            text: text.to_string(),
            values: values.clone(),
        });
    }
}
