// ── Core error types ──
//
// Errors surfaced to the operator layer (CLI / serial menu). Nothing here is
// fatal to the process: every variant is recoverable by a later user action.
// Dispatch-path failures are logged and dropped, never returned through the
// discovery callback.

use thiserror::Error;

use crate::ports::StoreError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Registry errors ──────────────────────────────────────────────
    #[error("Device registry is full ({capacity} devices)")]
    Capacity { capacity: usize },

    #[error("A device named '{name}' already exists")]
    DuplicateName { name: String },

    #[error("Device not found: {name}")]
    NotFound { name: String },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    // ── Provisioning errors ──────────────────────────────────────────
    #[error("Network scan failed (driver code {code})")]
    ScanFailed { code: i32 },

    #[error("No Wi-Fi networks found")]
    NoNetworksFound,

    #[error("Could not associate with '{ssid}' after {attempts} polls")]
    ConnectFailed { ssid: String, attempts: u32 },

    #[error("Invalid selection '{input}': choose 1-{max} or 0 to cancel")]
    InvalidSelection { input: String, max: usize },

    #[error("Password must not be empty")]
    EmptyCredential,

    #[error("No network configuration in progress")]
    NotConfiguring,

    #[error("Network configuration is not waiting for {expected}")]
    UnexpectedInput { expected: &'static str },

    // ── Persistence ──────────────────────────────────────────────────
    #[error("Storage error on key '{key}': {message}")]
    Storage { key: String, message: String },

    // ── Actuation ────────────────────────────────────────────────────
    #[error("Actuator call failed: {0}")]
    Actuator(#[from] voxbridge_api::Error),
}

impl CoreError {
    /// Returns `true` if this error always ends a provisioning session.
    ///
    /// `InvalidSelection` and `EmptyCredential` keep the session alive and
    /// re-prompt. `ConnectFailed` depends on the phase (it re-prompts for a
    /// password but ends an open-network attempt), so it is not listed.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::ScanFailed { .. } | Self::NoNetworksFound | Self::Storage { .. }
        )
    }

    /// Returns `true` for registry lookups that missed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

/// Map a store write failure onto [`CoreError::Storage`] for `key`.
pub(crate) fn persist(result: Result<(), StoreError>, key: &str) -> Result<(), CoreError> {
    result.map_err(|e| CoreError::Storage {
        key: key.to_owned(),
        message: e.0,
    })
}
