// ── Device domain types ──

use serde::{Deserialize, Serialize};
use std::fmt;

use super::identity::StableId;

/// What a device does when a voice command reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTarget {
    /// Pulse this pin on the default actuator.
    Pin(u8),
    /// GET an arbitrary HTTP endpoint.
    Url(String),
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin(pin) => write!(f, "pin {pin} (pulsePin)"),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}

/// One configured actuator.
///
/// Name matching is case-insensitive everywhere; the original casing is kept
/// for display and for the name announced to the voice assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub target: DeviceTarget,
    pub stable_id: StableId,
}

impl Device {
    pub fn new(name: impl Into<String>, target: DeviceTarget, stable_id: StableId) -> Self {
        Self {
            name: name.into(),
            target,
            stable_id,
        }
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.name.to_lowercase() == name.to_lowercase()
    }
}
