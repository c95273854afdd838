//! Directory-backed storage.
//!
//! Layout under the namespace directory:
//!
//! ```text
//! <dir>/manifest.json        {"order": [...], "properties": {...}}
//! <dir>/files/<encoded name> entry text
//! <dir>/<raw file>           auxiliary files (e.g. composer history)
//! ```
//!
//! Entry names are percent-encoded into file names. Every file is written to
//! a sibling temp file first and renamed into place. A missing or corrupt
//! manifest loads as empty; entries whose blob is missing are dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::errors::Result;
use crate::storage::{Storage, StoredFile, is_valid_name};

const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// Characters left unencoded in blob file names.
const NAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_');

#[derive(Default, Deserialize)]
#[serde(default)]
struct Manifest {
    order: Vec<String>,
    properties: Map<String, Value>,
}

#[derive(Serialize)]
struct ManifestRef<'a> {
    order: &'a [String],
    properties: &'a Map<String, Value>,
}

/// A storage namespace kept in one directory.
pub struct FileStorage {
    dir: PathBuf,
    catalog: Mutex<Catalog>,
}

impl FileStorage {
    /// Open (creating if needed) the namespace at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(dir.join(FILES_DIR))?;
        let catalog = load_catalog(&dir);
        debug!(dir = %dir.display(), entries = catalog.order.len(), "storage opened");
        Ok(Self {
            dir,
            catalog: Mutex::new(catalog),
        })
    }

    /// Namespace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        blob_path(&self.dir, name)
    }

    fn save_manifest(&self, order: &[String], properties: &Map<String, Value>) -> Result<()> {
        let json = serde_json::to_string_pretty(&ManifestRef { order, properties })?;
        write_atomic(&self.dir.join(MANIFEST_FILE), &json)
    }
}

impl Storage for FileStorage {
    fn exists(&self, name: &str) -> bool {
        self.catalog.lock().exists(name)
    }

    fn read(&self, name: &str) -> Option<String> {
        self.catalog.lock().read(name).map(str::to_string)
    }

    fn write(&self, name: &str, data: &str) -> Result<bool> {
        if !is_valid_name(name) {
            return Ok(false);
        }
        let mut catalog = self.catalog.lock();
        if !catalog.differs(name, data) {
            return Ok(false);
        }
        write_atomic(&self.blob_path(name), data)?;
        if !catalog.exists(name) {
            let mut order = catalog.order.clone();
            order.push(name.to_string());
            self.save_manifest(&order, &catalog.properties)?;
        }
        catalog.write(name, data);
        Ok(true)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        let mut catalog = self.catalog.lock();
        if !catalog.exists(name) {
            return Ok(false);
        }
        let order: Vec<String> = catalog.order.iter().filter(|n| *n != name).cloned().collect();
        self.save_manifest(&order, &catalog.properties)?;
        match std::fs::remove_file(self.blob_path(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(name, error = %e, "failed to delete blob"),
        }
        Ok(catalog.remove(name))
    }

    fn rename(&self, from: &str, to: &str) -> Result<bool> {
        if !is_valid_name(to) {
            return Ok(false);
        }
        let mut catalog = self.catalog.lock();
        if from == to || !catalog.exists(from) || catalog.exists(to) {
            return Ok(false);
        }
        let (old_blob, new_blob) = (self.blob_path(from), self.blob_path(to));
        std::fs::rename(&old_blob, &new_blob)?;
        let order: Vec<String> = catalog
            .order
            .iter()
            .map(|n| if n == from { to.to_string() } else { n.clone() })
            .collect();
        if let Err(e) = self.save_manifest(&order, &catalog.properties) {
            // Blob and manifest must agree on the name.
            if let Err(undo) = std::fs::rename(&new_blob, &old_blob) {
                warn!(from, to, error = %undo, "failed to restore blob after rename");
            }
            return Err(e);
        }
        Ok(catalog.rename(from, to))
    }

    fn move_to(&self, from: &str, to: &str) -> Result<bool> {
        let mut catalog = self.catalog.lock();
        let Some(order) = catalog.moved_order(from, to) else {
            return Ok(false);
        };
        self.save_manifest(&order, &catalog.properties)?;
        catalog.order = order;
        Ok(true)
    }

    fn list(&self) -> Vec<StoredFile> {
        self.catalog.lock().list()
    }

    fn property(&self, key: &str) -> Option<Value> {
        self.catalog.lock().properties.get(key).cloned()
    }

    fn set_property(&self, key: &str, value: Value) -> Result<()> {
        let mut values = Map::new();
        let _ = values.insert(key.to_string(), value);
        self.set_properties(values)
    }

    fn set_properties(&self, values: Map<String, Value>) -> Result<()> {
        let mut catalog = self.catalog.lock();
        let mut properties = catalog.properties.clone();
        properties.extend(values);
        self.save_manifest(&catalog.order, &properties)?;
        catalog.properties = properties;
        Ok(())
    }

    fn remove_property(&self, key: &str) -> Result<()> {
        let mut catalog = self.catalog.lock();
        if !catalog.properties.contains_key(key) {
            return Ok(());
        }
        let mut properties = catalog.properties.clone();
        let _ = properties.remove(key);
        self.save_manifest(&catalog.order, &properties)?;
        catalog.properties = properties;
        Ok(())
    }

    fn read_raw(&self, file: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.dir.join(encode_name(file))) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_raw(&self, file: &str, data: &str) -> Result<()> {
        write_atomic(&self.dir.join(encode_name(file)), data)
    }
}

fn encode_name(name: &str) -> String {
    utf8_percent_encode(name, NAME_ENCODE_SET).to_string()
}

fn decode_name(file: &str) -> Option<String> {
    percent_decode_str(file)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

fn blob_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(FILES_DIR).join(encode_name(name))
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn load_manifest(dir: &Path) -> Manifest {
    let path = dir.join(MANIFEST_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Manifest::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read manifest");
            return Manifest::default();
        }
    };
    serde_json::from_str(&data).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "corrupt manifest, starting empty");
        Manifest::default()
    })
}

fn load_catalog(dir: &Path) -> Catalog {
    let manifest = load_manifest(dir);
    let mut order = Vec::with_capacity(manifest.order.len());
    let mut contents = HashMap::new();

    for name in manifest.order {
        if contents.contains_key(&name) {
            continue;
        }
        match std::fs::read_to_string(blob_path(dir, &name)) {
            Ok(data) => {
                let _ = contents.insert(name.clone(), data);
                order.push(name);
            }
            Err(e) => warn!(name = %name, error = %e, "dropping entry with unreadable blob"),
        }
    }

    // Blobs written before their manifest update landed.
    let mut orphans: Vec<(String, String)> = std::fs::read_dir(dir.join(FILES_DIR))
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| {
            let file = entry.file_name().into_string().ok()?;
            if file.ends_with(".tmp") {
                return None;
            }
            let name = decode_name(&file)?;
            if contents.contains_key(&name) || !is_valid_name(&name) {
                return None;
            }
            let data = std::fs::read_to_string(entry.path()).ok()?;
            Some((name, data))
        })
        .collect();
    orphans.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, data) in orphans {
        debug!(name = %name, "recovered orphan blob");
        order.push(name.clone());
        let _ = contents.insert(name, data);
    }

    Catalog::new(order, contents, manifest.properties)
}
