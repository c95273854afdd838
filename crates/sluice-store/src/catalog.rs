//! In-memory ordered catalog shared by both backends.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::storage::StoredFile;

#[derive(Debug, Default)]
pub(crate) struct Catalog {
    pub(crate) order: Vec<String>,
    contents: HashMap<String, String>,
    pub(crate) properties: Map<String, Value>,
}

impl Catalog {
    pub(crate) fn new(
        order: Vec<String>,
        contents: HashMap<String, String>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            order,
            contents,
            properties,
        }
    }

    pub(crate) fn exists(&self, name: &str) -> bool {
        self.contents.contains_key(name)
    }

    pub(crate) fn read(&self, name: &str) -> Option<&str> {
        self.contents.get(name).map(String::as_str)
    }

    /// Whether a write of `data` to `name` would change anything.
    pub(crate) fn differs(&self, name: &str, data: &str) -> bool {
        self.read(name) != Some(data)
    }

    pub(crate) fn write(&mut self, name: &str, data: &str) {
        if !self.exists(name) {
            self.order.push(name.to_string());
        }
        let _ = self.contents.insert(name.to_string(), data.to_string());
    }

    pub(crate) fn remove(&mut self, name: &str) -> bool {
        if self.contents.remove(name).is_none() {
            return false;
        }
        self.order.retain(|n| n != name);
        true
    }

    pub(crate) fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to || self.exists(to) {
            return false;
        }
        let Some(data) = self.contents.remove(from) else {
            return false;
        };
        let _ = self.contents.insert(to.to_string(), data);
        if let Some(slot) = self.order.iter_mut().find(|n| *n == from) {
            *slot = to.to_string();
        }
        true
    }

    /// Order after moving `from` into the slot held by `to`, if both exist.
    pub(crate) fn moved_order(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if from == to {
            return None;
        }
        let from_idx = self.order.iter().position(|n| n == from)?;
        let to_idx = self.order.iter().position(|n| n == to)?;
        let mut order = self.order.clone();
        let item = order.remove(from_idx);
        order.insert(to_idx, item);
        Some(order)
    }

    pub(crate) fn list(&self) -> Vec<StoredFile> {
        self.order
            .iter()
            .filter_map(|name| {
                self.contents.get(name).map(|data| StoredFile {
                    name: name.clone(),
                    data: data.clone(),
                })
            })
            .collect()
    }
}
