//! Values registry.
//!
//! Named value files referenced by rules. Same CRUD surface as the rules
//! registry, but at most one file is selected (`selectedFile` property) and
//! nothing here affects composition.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sluice_core::constants::PROP_SELECTED_FILE;
use sluice_store::Storage;
use sluice_store::props::string_value;
use tracing::warn;

use crate::registry::logged;

/// A value file annotated with its selection state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValueFileEntry {
    /// File name.
    pub name: String,
    /// File content.
    pub data: String,
    /// Whether this is the selected file.
    pub selected: bool,
}

/// Registry of named value files.
pub struct ValuesRegistry {
    values: Arc<dyn Storage>,
}

impl ValuesRegistry {
    /// Create a registry over the values namespace.
    pub fn new(values: Arc<dyn Storage>) -> Self {
        Self { values }
    }

    /// All files in order with their selection flag.
    pub fn list(&self) -> Vec<ValueFileEntry> {
        let selected = string_value(self.values.property(PROP_SELECTED_FILE).as_ref());
        self.values
            .list()
            .into_iter()
            .map(|file| ValueFileEntry {
                selected: selected.as_deref() == Some(file.name.as_str()),
                name: file.name,
                data: file.data,
            })
            .collect()
    }

    /// Read a file.
    pub fn get(&self, name: &str) -> Option<String> {
        self.values.read(name)
    }

    /// Whether a file exists.
    pub fn exists(&self, name: &str) -> bool {
        self.values.exists(name)
    }

    /// Create or overwrite a file.
    pub fn add(&self, name: &str, data: &str) -> bool {
        logged("add", name, self.values.write(name, data))
    }

    /// Delete a file.
    pub fn remove(&self, name: &str) -> bool {
        logged("remove", name, self.values.remove(name))
    }

    /// Rename a file.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        logged("rename", from, self.values.rename(from, to))
    }

    /// Move `from` into the position held by `to`.
    pub fn move_to(&self, from: &str, to: &str) -> bool {
        logged("move", from, self.values.move_to(from, to))
    }

    /// Record `name` as the selected file.
    pub fn select(&self, name: &str) {
        if let Err(e) = self
            .values
            .set_property(PROP_SELECTED_FILE, Value::String(name.to_string()))
        {
            warn!(name, error = %e, "failed to persist value selection");
        }
    }

    /// Clear the selected file.
    pub fn unselect(&self) {
        if let Err(e) = self.values.remove_property(PROP_SELECTED_FILE) {
            warn!(error = %e, "failed to clear value selection");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_store::MemoryStorage;

    fn registry() -> ValuesRegistry {
        let registry = ValuesRegistry::new(Arc::new(MemoryStorage::new()));
        assert!(registry.add("one.json", "{}"));
        assert!(registry.add("two.txt", "hello"));
        registry
    }

    #[test]
    fn single_selection() {
        let r = registry();
        r.select("two.txt");
        let flags: Vec<_> = r.list().into_iter().map(|e| e.selected).collect();
        assert_eq!(flags, vec![false, true]);
        r.select("one.json");
        let flags: Vec<_> = r.list().into_iter().map(|e| e.selected).collect();
        assert_eq!(flags, vec![true, false]);
        r.unselect();
        assert!(r.list().iter().all(|e| !e.selected));
    }

    #[test]
    fn crud() {
        let r = registry();
        assert_eq!(r.get("two.txt").as_deref(), Some("hello"));
        assert!(r.rename("two.txt", "three.txt"));
        assert!(r.move_to("three.txt", "one.json"));
        let names: Vec<_> = r.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["three.txt", "one.json"]);
        assert!(r.remove("one.json"));
        assert!(!r.remove("one.json"));
    }
}
