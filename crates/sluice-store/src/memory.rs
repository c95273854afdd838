//! In-memory storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::catalog::Catalog;
use crate::errors::{Result, StoreError};
use crate::storage::{Storage, StoredFile, is_valid_name};

/// A storage namespace that lives only in memory.
///
/// Writes can be made to fail with [`MemoryStorage::set_fail_writes`] to
/// exercise error paths.
#[derive(Default)]
pub struct MemoryStorage {
    catalog: Mutex<Catalog>,
    raw: Mutex<HashMap<String, String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    /// Create an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent mutation fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, name: &str) -> bool {
        self.catalog.lock().exists(name)
    }

    fn read(&self, name: &str) -> Option<String> {
        self.catalog.lock().read(name).map(str::to_string)
    }

    fn write(&self, name: &str, data: &str) -> Result<bool> {
        self.check_writable()?;
        if !is_valid_name(name) {
            return Ok(false);
        }
        let mut catalog = self.catalog.lock();
        if !catalog.differs(name, data) {
            return Ok(false);
        }
        catalog.write(name, data);
        Ok(true)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        self.check_writable()?;
        Ok(self.catalog.lock().remove(name))
    }

    fn rename(&self, from: &str, to: &str) -> Result<bool> {
        self.check_writable()?;
        if !is_valid_name(to) {
            return Ok(false);
        }
        Ok(self.catalog.lock().rename(from, to))
    }

    fn move_to(&self, from: &str, to: &str) -> Result<bool> {
        self.check_writable()?;
        let mut catalog = self.catalog.lock();
        match catalog.moved_order(from, to) {
            Some(order) => {
                catalog.order = order;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list(&self) -> Vec<StoredFile> {
        self.catalog.lock().list()
    }

    fn property(&self, key: &str) -> Option<Value> {
        self.catalog.lock().properties.get(key).cloned()
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        let _ = self
            .catalog
            .lock()
            .properties
            .insert(key.to_string(), value);
        Ok(())
    }

    fn set_properties(&self, values: Map<String, Value>) -> Result<()> {
        self.check_writable()?;
        self.catalog.lock().properties.extend(values);
        Ok(())
    }

    fn remove_property(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        let _ = self.catalog.lock().properties.remove(key);
        Ok(())
    }

    fn read_raw(&self, file: &str) -> Result<Option<String>> {
        Ok(self.raw.lock().get(file).cloned())
    }

    fn write_raw(&self, file: &str, data: &str) -> Result<()> {
        self.check_writable()?;
        let _ = self.raw.lock().insert(file.to_string(), data.to_string());
        Ok(())
    }
}
