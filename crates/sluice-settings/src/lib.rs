//! # sluice-settings
//!
//! Configuration for the Sluice rule composition service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SluiceSettings::default()`]
//! 2. **User file**: `~/.sluice/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SLUICE_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use sluice_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("listening on {}:{}", settings.server.host, settings.server.port);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, home_dir, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = SluiceSettings::default();
        let _path = settings_path();
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = SluiceSettings::default();
        assert_eq!(settings.name, "sluice");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 8899);
        assert!(!settings.rules.multi_env);
        assert!(settings.rules.shadow_rules.is_empty());
        assert_eq!(settings.history.persist_delay_ms, 2000);
        assert_eq!(settings.update.interval_secs, 3600);
        assert_eq!(settings.hosts.path, "/etc/hosts");
    }
}
