//! The history list and its debounced persistence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use sluice_core::constants::{HISTORY_FILE_NAME, MAX_HISTORY_LEN};
use sluice_store::Storage;
use tracing::{debug, warn};

use crate::entry::HistoryEntry;

struct Inner {
    storage: Arc<dyn Storage>,
    entries: Mutex<Vec<HistoryEntry>>,
    pending: AtomicBool,
    delay: Duration,
}

/// Bounded, de-duplicated, newest-first composer history.
#[derive(Clone)]
pub struct ComposerHistory {
    inner: Arc<Inner>,
}

impl ComposerHistory {
    /// Load the history kept in `storage`.
    ///
    /// A missing, unreadable or non-array file yields an empty history;
    /// malformed entries are dropped.
    pub fn load(storage: Arc<dyn Storage>, delay: Duration) -> Self {
        let entries = read_entries(storage.as_ref());
        debug!(entries = entries.len(), "composer history loaded");
        Self {
            inner: Arc::new(Inner {
                storage,
                entries: Mutex::new(entries),
                pending: AtomicBool::new(false),
                delay,
            }),
        }
    }

    /// Current entries, newest first.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.inner.entries.lock().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Record a composed request. Returns whether it was accepted.
    pub fn add(&self, data: &Value) -> bool {
        let Some(entry) = HistoryEntry::from_request(data, chrono::Utc::now().timestamp_millis())
        else {
            return false;
        };
        {
            let mut entries = self.inner.entries.lock();
            if let Some(idx) = entries.iter().position(|e| e.same_request(&entry)) {
                let _ = entries.remove(idx);
            }
            entries.insert(0, entry);
            entries.truncate(MAX_HISTORY_LEN);
        }
        self.schedule_persist();
        true
    }

    /// Write the current entries now.
    pub fn flush(&self) {
        let snapshot = self.entries();
        self.inner.persist(&snapshot);
    }

    /// Whether a debounced write is pending.
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::SeqCst)
    }

    fn schedule_persist(&self) {
        if self.inner.pending.swap(true, Ordering::SeqCst) {
            return;
        }
        let snapshot = self.entries();
        let inner = Arc::clone(&self.inner);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let _ = handle.spawn(async move {
                    tokio::time::sleep(inner.delay).await;
                    inner.persist(&snapshot);
                    inner.pending.store(false, Ordering::SeqCst);
                });
            }
            Err(_) => {
                inner.persist(&snapshot);
                inner.pending.store(false, Ordering::SeqCst);
            }
        }
    }
}

impl Inner {
    fn persist(&self, entries: &[HistoryEntry]) {
        let json = match serde_json::to_string(entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize composer history");
                return;
            }
        };
        if let Err(e) = self.storage.write_raw(HISTORY_FILE_NAME, &json) {
            warn!(error = %e, "failed to persist composer history");
        }
    }
}

fn read_entries(storage: &dyn Storage) -> Vec<HistoryEntry> {
    let text = match storage.read_raw(HISTORY_FILE_NAME) {
        Ok(Some(text)) => text,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "failed to read composer history");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(HistoryEntry::from_stored)
            .take(MAX_HISTORY_LEN)
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "composer history is not valid JSON");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sluice_store::MemoryStorage;

    const DELAY: Duration = Duration::from_millis(40);

    fn request(url: &str) -> Value {
        json!({
            "needResponse": true,
            "url": url,
            "method": "GET",
            "headers": "",
            "body": "",
        })
    }

    fn history() -> (Arc<MemoryStorage>, ComposerHistory) {
        let storage = Arc::new(MemoryStorage::new());
        let history = ComposerHistory::load(storage.clone(), DELAY);
        (storage, history)
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_moves_to_front() {
        let (_, h) = history();
        assert!(h.add(&request("https://a.test/")));
        assert!(h.add(&request("https://b.test/")));
        let first_date = h.entries()[1].date;
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(h.add(&request("https://a.test/")));
        let entries = h.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://a.test/");
        assert!(entries[0].date >= first_date);
    }

    #[tokio::test(start_paused = true)]
    async fn capped_at_capacity() {
        let (_, h) = history();
        for i in 0..50 {
            assert!(h.add(&request(&format!("https://a.test/{i}"))));
        }
        let entries = h.entries();
        assert_eq!(entries.len(), MAX_HISTORY_LEN);
        assert_eq!(entries[0].url, "https://a.test/49");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_entries_are_not_recorded() {
        let (_, h) = history();
        let mut data = request("https://a.test/");
        data["needResponse"] = json!(0);
        assert!(!h.add(&data));
        assert!(h.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn writes_are_debounced() {
        let (storage, h) = history();
        assert!(h.add(&request("https://a.test/")));
        assert!(h.is_pending());
        assert!(h.add(&request("https://b.test/")));
        assert!(storage.read_raw(HISTORY_FILE_NAME).unwrap().is_none());

        tokio::time::sleep(DELAY * 3).await;
        assert!(!h.is_pending());
        let stored: Vec<HistoryEntry> =
            serde_json::from_str(&storage.read_raw(HISTORY_FILE_NAME).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].url, "https://a.test/");

        h.flush();
        let stored: Vec<HistoryEntry> =
            serde_json::from_str(&storage.read_raw(HISTORY_FILE_NAME).unwrap().unwrap()).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_resets_pending() {
        let (storage, h) = history();
        storage.set_fail_writes(true);
        assert!(h.add(&request("https://a.test/")));
        tokio::time::sleep(DELAY * 3).await;
        assert!(!h.is_pending());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn load_filters_malformed() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .write_raw(
                HISTORY_FILE_NAME,
                r#"[{"url":"u","method":"GET","headers":"","body":""},{"url":1},"x"]"#,
            )
            .unwrap();
        let h = ComposerHistory::load(storage, DELAY);
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn load_resets_non_array() {
        let storage = Arc::new(MemoryStorage::new());
        storage.write_raw(HISTORY_FILE_NAME, r#"{"a":1}"#).unwrap();
        assert!(ComposerHistory::load(storage.clone(), DELAY).is_empty());
        storage.write_raw(HISTORY_FILE_NAME, "not json").unwrap();
        assert!(ComposerHistory::load(storage, DELAY).is_empty());
    }

    #[test]
    fn persists_without_runtime() {
        let (storage, h) = history();
        assert!(h.add(&request("https://a.test/")));
        assert!(!h.is_pending());
        assert!(storage.read_raw(HISTORY_FILE_NAME).unwrap().is_some());
    }
}
