//! Rule composition, remote include, and history settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Rule composition behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RulesSettings {
    /// File-based selection is disabled and controlled externally.
    pub multi_env: bool,
    /// Operator-mandated rules, always part of the composed text.
    pub shadow_rules: String,
    /// Whether "disable all rules" also drops the shadow rules.
    pub allow_disable_shadow_rules: bool,
    /// Base URL that internal `sluice.<name>` include tokens resolve against.
    pub internal_base_url: String,
    /// Variables substituted into backtick-wrapped include keys as `${name}`.
    pub config_vars: BTreeMap<String, String>,
}

impl Default for RulesSettings {
    fn default() -> Self {
        Self {
            multi_env: false,
            shadow_rules: String::new(),
            allow_disable_shadow_rules: false,
            internal_base_url: "http://127.0.0.1:8899".to_string(),
            config_vars: BTreeMap::new(),
        }
    }
}

/// Composer history persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistorySettings {
    /// Debounce window for history writes in milliseconds.
    pub persist_delay_ms: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            persist_delay_ms: 2000,
        }
    }
}

/// Remote include fetching.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteSettings {
    /// How often cached includes are reloaded, in milliseconds.
    pub refresh_interval_ms: u64,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Fetched bodies are truncated to this many bytes.
    pub max_body_bytes: usize,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 30_000,
            timeout_ms: 15_000,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}
