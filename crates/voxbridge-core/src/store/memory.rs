// ── In-memory key-value store ──
//
// Lock-free concurrent storage with the same typed get/put surface as
// the node's NVS partition.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};

use super::StoredValue;
use crate::ports::{KeyValueStore, StoreError};

/// A volatile [`KeyValueStore`].
///
/// Survives a simulated reboot as long as the same instance is handed to
/// the new registry. [`set_read_only`](Self::set_read_only) makes every
/// write fail, which is how a worn-out or write-protected partition shows
/// up on the node.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
    read_only: AtomicBool,
    /// Keys whose next write fails once.
    failing: DashSet<String>,
    /// Write counter, bumped on every successful put/remove.
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Make the next write to `key` fail, as a flash write that is cut off
    /// partway through a save.
    pub fn fail_next_write(&self, key: impl Into<String>) {
        self.failing.insert(key.into());
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Raw access, for inspecting or corrupting stored state.
    pub fn get(&self, key: &str) -> Option<StoredValue> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: StoredValue) {
        self.entries.insert(key.into(), value);
    }

    /// Ordered copy of every entry.
    pub fn snapshot(&self) -> BTreeMap<String, StoredValue> {
        self.entries
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn put(&self, key: &str, value: StoredValue) -> Result<(), StoreError> {
        self.check_writable(key)?;
        self.entries.insert(key.to_owned(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn check_writable(&self, key: &str) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError(format!("store is read-only, cannot write '{key}'")));
        }
        if self.failing.remove(key).is_some() {
            return Err(StoreError(format!("write to '{key}' failed")));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.entries
            .get(key)
            .and_then(|r| r.value().as_int())
            .unwrap_or(default)
    }

    fn get_string(&self, key: &str, default: &str) -> String {
        self.entries
            .get(key)
            .and_then(|r| r.value().as_str().map(str::to_owned))
            .unwrap_or_else(|| default.to_owned())
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.entries
            .get(key)
            .and_then(|r| r.value().as_bool())
            .unwrap_or(default)
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
        self.check_writable(key)?;
        if self.entries.remove(key).is_some() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}
