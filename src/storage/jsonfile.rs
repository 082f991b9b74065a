//! JSON file backend.
//!
//! The whole store is one JSON object on disk. Writes go to a sibling temp
//! file which is then renamed over the original.

use super::KeyValueStore;
use crate::base::consenterror::ConsentError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key-value store persisted to a JSON file.
#[derive(Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Arc<DashMap<String, String>>,
    // Serializes writes so two writers cannot interleave temp files.
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing entries.
    ///
    /// A missing file is an empty store. A corrupt file is logged and
    /// treated as empty; it is overwritten on the next write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConsentError> {
        let path = path.as_ref().to_path_buf();
        let entries = DashMap::new();

        match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<BTreeMap<String, String>>(&json) {
                Ok(map) => {
                    for (k, v) in map {
                        entries.insert(k, v);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "corrupt storage file, starting empty");
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConsentError::StorageRead {
                    key: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        }

        Ok(Self {
            path,
            entries: Arc::new(entries),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current entries with `change` applied, then commit it.
    ///
    /// Memory is only updated once the file is on disk, so a failed write
    /// leaves both sides at the previous state.
    fn write_through(&self, key: &str, change: Option<&str>) -> Result<(), ConsentError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        match change {
            Some(value) => snapshot.insert(key.to_string(), value.to_string()),
            None => snapshot.remove(key),
        };

        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| write_error(key, e))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json).map_err(|e| write_error(key, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| write_error(key, e))?;

        match change {
            Some(value) => {
                self.entries.insert(key.to_string(), value.to_string());
            }
            None => {
                self.entries.remove(key);
            }
        }
        Ok(())
    }
}

fn write_error(key: &str, err: impl std::fmt::Display) -> ConsentError {
    ConsentError::StorageWrite {
        key: key.to_string(),
        message: err.to_string(),
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ConsentError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ConsentError> {
        self.write_through(key, Some(value))
    }

    fn remove(&self, key: &str) -> Result<(), ConsentError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        self.write_through(key, None)
    }
}
