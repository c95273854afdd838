//! Collaborators the composition pipeline hands work to.
//!
//! The pipeline never performs network or interpreter work itself. The agent
//! wires concrete implementations; tests use in-memory doubles.

use std::collections::{BTreeMap, BTreeSet};

/// Key → text map produced by one composition pass.
///
/// Created fresh for every pass and dropped after the interpreter hand-off.
pub type InlineValueMap = BTreeMap<String, String>;

/// Fetches remote rule fragments for include directives.
///
/// Implementations own caching, background refresh and change notification.
/// `fetch` must not block on the network: it returns the cached text (empty
/// when nothing is cached yet) and schedules a load in the background.
pub trait RemoteFetcher: Send + Sync {
    /// Current text for `key` (a URL or filesystem path).
    fn fetch(&self, key: &str) -> String;

    /// Drop cached entries no longer referenced by any composition.
    fn purge_unused(&self);

    /// Keep only the entries for `keys`, the set the latest pass fetched.
    fn retain(&self, _keys: &BTreeSet<String>) {}
}

/// Consumes the composed rule text.
pub trait RuleInterpreter: Send + Sync {
    /// Load `text` with the pass's inline values.
    fn load(&self, text: &str, values: &InlineValueMap);
}

/// Access to the system hosts file.
pub trait SystemHosts: Send + Sync {
    /// Read the managed hosts text.
    fn get_hosts(&self) -> std::io::Result<String>;

    /// Replace the managed hosts text.
    fn set_hosts(&self, text: &str) -> std::io::Result<()>;
}

/// A fetcher that never has remote content.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRemote;

impl RemoteFetcher for NoRemote {
    fn fetch(&self, _key: &str) -> String {
        String::new()
    }

    fn purge_unused(&self) {}
}
