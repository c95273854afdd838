//! Settings loading with deep merge and environment variable overrides.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::SluiceSettings;

/// Home directory from `HOME`, falling back to `/tmp`.
pub fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

/// Resolve the path to the settings file (`~/.sluice/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join(".sluice").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SluiceSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SluiceSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Load defaults merged with the file at `path`, without env overrides.
pub fn read_settings_file(path: &Path) -> Result<SluiceSettings> {
    let schema = |source| SettingsError::Schema {
        path: path.to_path_buf(),
        source,
    };
    let defaults = serde_json::to_value(SluiceSettings::default()).map_err(schema)?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    serde_json::from_value(merged).map_err(schema)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SLUICE_*` environment variable overrides.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut SluiceSettings) {
    if let Some(v) = read_env_string("SLUICE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_parsed("SLUICE_PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("SLUICE_DATA_DIR") {
        settings.storage.data_dir = v;
    }
    if let Some(v) = read_env_parsed("SLUICE_MULTI_ENV", parse_bool) {
        settings.rules.multi_env = v;
    }
    if let Some(v) = read_env_string("SLUICE_SHADOW_RULES") {
        settings.rules.shadow_rules = v;
    }
    if let Some(v) = read_env_parsed("SLUICE_ALLOW_DISABLE_SHADOW_RULES", parse_bool) {
        settings.rules.allow_disable_shadow_rules = v;
    }
    if let Some(v) = read_env_string("SLUICE_INTERNAL_BASE_URL") {
        settings.rules.internal_base_url = v;
    }
    if let Some(v) = read_env_string("SLUICE_HOSTS_PATH") {
        settings.hosts.path = v;
    }
    if let Some(v) = read_env_parsed("SLUICE_REMOTE_REFRESH_MS", |s| {
        parse_u64_range(s, 1000, 86_400_000)
    }) {
        settings.remote.refresh_interval_ms = v;
    }
    if let Some(v) = read_env_string("SLUICE_REGISTRY_URL") {
        settings.update.registry_url = v;
    }
    if let Some(v) = read_env_parsed("SLUICE_UPDATE_CHECK", parse_bool) {
        settings.update.enabled = v;
    }
    if let Some(v) = read_env_string("SLUICE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_env_string("SLUICE_LOG_FORMAT") {
        settings.logging.format = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a boolean: `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u16` within an inclusive range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_parsed<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let val = std::env::var(name).ok()?;
    let result = parse(&val);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
