//! The storage seam.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;

/// Maximum accepted entry name length in bytes.
const MAX_NAME_LEN: usize = 256;

/// One named entry with its text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Unique entry name.
    pub name: String,
    /// Entry text.
    pub data: String,
}

/// A namespace of ordered named text entries plus a property bag.
///
/// Mutators return `Ok(true)` when something changed and `Ok(false)` for
/// no-ops (absent names, invalid names, identical content). Errors are
/// reserved for backend failures.
pub trait Storage: Send + Sync {
    /// Whether an entry named `name` exists.
    fn exists(&self, name: &str) -> bool;

    /// Read an entry's text.
    fn read(&self, name: &str) -> Option<String>;

    /// Create or overwrite an entry. New entries go to the end of the order.
    fn write(&self, name: &str, data: &str) -> Result<bool>;

    /// Delete an entry.
    fn remove(&self, name: &str) -> Result<bool>;

    /// Rename an entry in place. Fails softly if `to` is taken.
    fn rename(&self, from: &str, to: &str) -> Result<bool>;

    /// Move `from` to the position currently held by `to`.
    fn move_to(&self, from: &str, to: &str) -> Result<bool>;

    /// All entries in order.
    fn list(&self) -> Vec<StoredFile>;

    /// Read a property.
    fn property(&self, key: &str) -> Option<Value>;

    /// Set a property.
    fn set_property(&self, key: &str, value: Value) -> Result<()>;

    /// Set several properties at once.
    fn set_properties(&self, values: Map<String, Value>) -> Result<()>;

    /// Remove a property.
    fn remove_property(&self, key: &str) -> Result<()>;

    /// Read an auxiliary file that lives beside the entries.
    fn read_raw(&self, file: &str) -> Result<Option<String>>;

    /// Replace an auxiliary file that lives beside the entries.
    fn write_raw(&self, file: &str, data: &str) -> Result<()>;
}

/// Whether `name` is acceptable as an entry name.
///
/// Names must be non-empty, at most 256 bytes, and free of control
/// characters.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_NAME_LEN && !name.chars().any(char::is_control)
}
