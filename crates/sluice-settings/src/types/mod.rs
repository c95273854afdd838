//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and `#[serde(default)]`
//! so a partial settings file only needs the keys it overrides.

mod rules;
mod service;

pub use rules::*;
pub use service::*;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "rules": { "shadowRules": "example.com 127.0.0.1" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SluiceSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Where the rules, values and properties namespaces live.
    pub storage: StorageSettings,
    /// Rule composition behavior.
    pub rules: RulesSettings,
    /// Composer history persistence.
    pub history: HistorySettings,
    /// Remote include fetching.
    pub remote: RemoteSettings,
    /// System hosts file synchronization.
    pub hosts: HostsSettings,
    /// Command surface HTTP server.
    pub server: ServerSettings,
    /// Latest-version polling.
    pub update: UpdateSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl Default for SluiceSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "sluice".to_string(),
            storage: StorageSettings::default(),
            rules: RulesSettings::default(),
            history: HistorySettings::default(),
            remote: RemoteSettings::default(),
            hosts: HostsSettings::default(),
            server: ServerSettings::default(),
            update: UpdateSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}
