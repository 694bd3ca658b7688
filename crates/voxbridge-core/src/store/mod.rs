// ── Key-value store implementations ──
//
// `MemoryStore` backs tests and simulation; `JsonFileStore` gives host
// tools a persistent store with the same per-key semantics as the node's
// NVS partition.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

/// A single stored value. Reads with the wrong accessor fall back to the
/// caller's default, mirroring NVS typed getters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Bool(bool),
    Int(i32),
    Str(String),
}

impl StoredValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }
}
