//! The remote include cache.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sluice_rules::RemoteFetcher;
use sluice_settings::RemoteSettings;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{RemoteError, Result};

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct CacheEntry {
    text: String,
    loading: bool,
}

struct Inner {
    client: reqwest::Client,
    settings: RemoteSettings,
    entries: Mutex<HashMap<String, CacheEntry>>,
    changes: broadcast::Sender<String>,
    runtime: Handle,
}

/// Caches remote include text and reloads it in the background.
///
/// [`fetch`](RemoteFetcher::fetch) never waits on I/O: the first request for
/// a key returns empty text and starts a load. When a load yields different
/// text, the key is published on the [`subscribe`](Self::subscribe) channel
/// so the caller can recompose.
///
/// Entries live as long as the latest composition pass references them;
/// [`retain`](RemoteFetcher::retain) and
/// [`purge_unused`](RemoteFetcher::purge_unused) drop the rest.
#[derive(Clone)]
pub struct RemoteRulesCache {
    inner: Arc<Inner>,
}

impl RemoteRulesCache {
    /// Create a cache bound to the current Tokio runtime.
    pub fn new(settings: RemoteSettings) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| RemoteError::NoRuntime)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .user_agent(concat!("sluice/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(Inner {
                client,
                settings,
                entries: Mutex::new(HashMap::new()),
                changes,
                runtime,
            }),
        })
    }

    /// Receive the keys whose text changed.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inner.changes.subscribe()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.inner.entries.lock().len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.lock().is_empty()
    }

    /// Reload every cached entry not already loading.
    pub fn refresh(&self) {
        let reload: Vec<String> = {
            let mut entries = self.inner.entries.lock();
            entries
                .iter_mut()
                .filter(|(_, entry)| !entry.loading)
                .map(|(key, entry)| {
                    entry.loading = true;
                    key.clone()
                })
                .collect()
        };
        for key in reload {
            self.inner.spawn_load(key);
        }
    }

    /// Start the periodic refresher.
    pub fn spawn_refresher(&self) -> JoinHandle<()> {
        let cache = self.clone();
        let period = Duration::from_millis(self.inner.settings.refresh_interval_ms.max(1));
        self.inner.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            let _ = ticker.tick().await;
            loop {
                let _ = ticker.tick().await;
                cache.refresh();
            }
        })
    }
}

impl RemoteFetcher for RemoteRulesCache {
    fn fetch(&self, key: &str) -> String {
        let (text, start_load) = {
            let mut entries = self.inner.entries.lock();
            match entries.get(key) {
                Some(entry) => (entry.text.clone(), false),
                None => {
                    let _ = entries.insert(
                        key.to_string(),
                        CacheEntry {
                            text: String::new(),
                            loading: true,
                        },
                    );
                    (String::new(), true)
                }
            }
        };
        if start_load {
            self.inner.spawn_load(key.to_string());
        }
        text
    }

    fn purge_unused(&self) {
        let mut entries = self.inner.entries.lock();
        if !entries.is_empty() {
            debug!(entries = entries.len(), "purging unused remote includes");
            entries.clear();
        }
    }

    fn retain(&self, keys: &BTreeSet<String>) {
        let mut entries = self.inner.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| keys.contains(key));
        let dropped = before - entries.len();
        if dropped > 0 {
            debug!(dropped, kept = entries.len(), "dropped unreferenced remote includes");
        }
    }
}

impl Inner {
    fn spawn_load(self: &Arc<Self>, key: String) {
        let inner = Arc::clone(self);
        let _ = self.runtime.spawn(async move {
            let result = inner.load_text(&key).await;
            inner.finish_load(key, result);
        });
    }

    async fn load_text(&self, key: &str) -> Result<String> {
        let text = if is_http(key) {
            self.client
                .get(key)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?
        } else {
            let bytes = tokio::fs::read(key).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        };
        Ok(truncate(text, self.settings.max_body_bytes))
    }

    fn finish_load(&self, key: String, result: Result<String>) {
        let changed = {
            let mut entries = self.entries.lock();
            // Purged while in flight.
            let Some(entry) = entries.get_mut(&key) else {
                return;
            };
            entry.loading = false;
            match result {
                Ok(text) if text != entry.text => {
                    entry.text = text;
                    true
                }
                Ok(_) => false,
                Err(e) => {
                    warn!(key = %key, error = %e, "failed to load remote include");
                    false
                }
            }
        };
        if changed {
            debug!(key = %key, "remote include changed");
            let _ = self.changes.send(key);
        }
    }
}

fn is_http(key: &str) -> bool {
    let lower = key.get(..8).unwrap_or(key).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}
