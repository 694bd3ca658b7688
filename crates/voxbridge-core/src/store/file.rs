// ── JSON file-backed key-value store ──
//
// The whole map lives in memory and is rewritten to disk on every write
// that changes it, via a synced temp file + rename, so a crash leaves either
// the old or the new file, never a torn one.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::StoredValue;
use crate::ports::{KeyValueStore, StoreError};

/// A persistent [`KeyValueStore`] kept in a single JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, StoredValue>>,
}

impl JsonFileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                StoreError(format!("corrupt store file {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store file missing, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                return Err(StoreError(format!(
                    "cannot read store file {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredValue>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, key: &str, pick: impl FnOnce(&StoredValue) -> Option<T>) -> Option<T> {
        self.lock().get(key).and_then(pick)
    }

    fn put(&self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if entries.get(key) == Some(&value) {
            return Ok(());
        }
        let previous = entries.insert(key.to_owned(), value);
        if let Err(e) = self.flush(&entries) {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
            warn!(key, error = %e, "store write failed");
            return Err(e);
        }
        Ok(())
    }

    fn flush(&self, entries: &BTreeMap<String, StoredValue>) -> Result<(), StoreError> {
        let io_err = |e: io::Error| StoreError(format!("{}: {e}", self.path.display()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError(format!("serialize store: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(json.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.read(key, StoredValue::as_int).unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.read(key, |v| v.as_str().map(str::to_owned))
            .unwrap_or_else(|| default.to_owned())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.read(key, StoredValue::as_bool).unwrap_or(default)
    }

    fn put_int(&self, key: &str, value: i32) -> Result<(), StoreError> {
        self.put(key, StoredValue::Int(value))
    }

    fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.put(key, StoredValue::Str(value.to_owned()))
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        self.put(key, StoredValue::Bool(value))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        let Some(old) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_owned(), old);
            return Err(e);
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}
