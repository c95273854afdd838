//! Storage, hosts, server, update and logging settings.
//!
//! Grouped here because they are small and only read by the agent binary
//! when wiring the service together.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Storage locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Root data directory. A leading `~/` expands to the home directory.
    pub data_dir: String,
    /// Rules namespace directory (relative to `data_dir`).
    pub rules_dir: String,
    /// Values namespace directory (relative to `data_dir`).
    pub values_dir: String,
    /// Properties namespace directory (relative to `data_dir`).
    pub properties_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.sluice".to_string(),
            rules_dir: "rules".to_string(),
            values_dir: "values".to_string(),
            properties_dir: "properties".to_string(),
        }
    }
}

impl StorageSettings {
    /// Resolve the data directory against `home`.
    pub fn data_path(&self, home: &Path) -> PathBuf {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => home.join(rest),
            None if self.data_dir == "~" => home.to_path_buf(),
            None => PathBuf::from(&self.data_dir),
        }
    }

    /// Rules namespace directory.
    pub fn rules_path(&self, home: &Path) -> PathBuf {
        self.data_path(home).join(&self.rules_dir)
    }

    /// Values namespace directory.
    pub fn values_path(&self, home: &Path) -> PathBuf {
        self.data_path(home).join(&self.values_dir)
    }

    /// Properties namespace directory.
    pub fn properties_path(&self, home: &Path) -> PathBuf {
        self.data_path(home).join(&self.properties_dir)
    }
}

/// System hosts file synchronization.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostsSettings {
    /// Hosts file that receives the managed block.
    pub path: String,
}

impl Default for HostsSettings {
    fn default() -> Self {
        Self {
            path: "/etc/hosts".to_string(),
        }
    }
}

/// Command surface HTTP server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8899,
        }
    }
}

/// Latest-version polling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSettings {
    /// Whether the version check runs at all.
    pub enabled: bool,
    /// URL returning a JSON object with a `version` string.
    pub registry_url: String,
    /// Delay before the first check in milliseconds.
    pub initial_delay_ms: u64,
    /// Interval between checks in seconds.
    pub interval_secs: u64,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            registry_url: "https://registry.npmjs.org/sluice/latest".to_string(),
            initial_delay_ms: 1000,
            interval_secs: 3600,
        }
    }
}

/// Log output.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// `compact` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}
