//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why a settings file was rejected. Every variant names the file so the
/// agent can point the operator at it.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        /// Settings file.
        path: PathBuf,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// The file is not JSON.
    #[error("{} is not valid JSON: {source}", .path.display())]
    Parse {
        /// Settings file.
        path: PathBuf,
        /// Parser error with line and column.
        source: serde_json::Error,
    },
    /// The file is JSON but a value has the wrong type or range
    /// (e.g. `"server": {"port": 70000}`).
    #[error("{} does not fit the settings layout: {source}", .path.display())]
    Schema {
        /// Settings file.
        path: PathBuf,
        /// Field-level deserialization error.
        source: serde_json::Error,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/sluice/settings.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("/etc/sluice/settings.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn parse_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("settings.json"),
            source,
        };
        assert!(err.to_string().starts_with("settings.json is not valid JSON"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
