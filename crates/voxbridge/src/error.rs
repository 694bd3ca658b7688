//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code per failure class.

use miette::Diagnostic;
use thiserror::Error;

use voxbridge_config::ConfigError;
use voxbridge_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Registry ─────────────────────────────────────────────────────

    #[error("Device '{name}' not found")]
    #[diagnostic(
        code(voxbridge::not_found),
        help("Run: voxbridge devices list to see configured devices")
    )]
    NotFound { name: String },

    #[error("A device named '{name}' already exists")]
    #[diagnostic(
        code(voxbridge::conflict),
        help("Device names are case-insensitive. Remove the existing one first.")
    )]
    Conflict { name: String },

    #[error("Device registry is full ({capacity} devices)")]
    #[diagnostic(
        code(voxbridge::capacity),
        help("Remove an unused device with: voxbridge devices remove <NAME>")
    )]
    Capacity { capacity: usize },

    // ── Actuation ────────────────────────────────────────────────────

    #[error("Could not reach {url}")]
    #[diagnostic(
        code(voxbridge::connection_failed),
        help(
            "Check that the actuator is powered and on the same network.\n\
             Actuator host comes from [dispatch] actuator_host in the config."
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: voxbridge_api::Error,
    },

    #[error("Actuator call timed out after {timeout_ms} ms")]
    #[diagnostic(
        code(voxbridge::timeout),
        help("Raise [dispatch] http_timeout_ms or check the actuator.")
    )]
    Timeout { timeout_ms: u64 },

    #[error("Actuator answered HTTP {status}")]
    #[diagnostic(code(voxbridge::actuator_status), help("Response body: {body}"))]
    ActuatorStatus { status: u16, body: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(voxbridge::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(voxbridge::confirmation_required),
        help("Use --yes (-y) to confirm.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file already exists")]
    #[diagnostic(
        code(voxbridge::config_exists),
        help(
            "Use --force to overwrite it.\n\
             Path: {path}"
        )
    )]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(voxbridge::config))]
    Config(Box<figment::Error>),

    #[error("{0}")]
    #[diagnostic(code(voxbridge::storage))]
    Storage(String),

    // ── Core passthrough ─────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(voxbridge::core))]
    Core(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(voxbridge::json))]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } | Self::Capacity { .. } | Self::ConfigExists { .. } => {
                exit_code::CONFLICT
            }
            Self::ConnectionFailed { .. } | Self::ActuatorStatus { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { name } => Self::NotFound { name },
            CoreError::DuplicateName { name } => Self::Conflict { name },
            CoreError::Capacity { capacity } => Self::Capacity { capacity },
            CoreError::InvalidInput { field, reason } => Self::Validation {
                field: field.into(),
                reason,
            },
            CoreError::Storage { key, message } => {
                Self::Storage(format!("Storage error on key '{key}': {message}"))
            }
            CoreError::Actuator(source) => Self::from(source),
            other => Self::Core(other),
        }
    }
}

impl From<voxbridge_api::Error> for CliError {
    fn from(err: voxbridge_api::Error) -> Self {
        match err {
            voxbridge_api::Error::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            voxbridge_api::Error::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            voxbridge_api::Error::UnsupportedScheme { scheme } => Self::Validation {
                field: "url".into(),
                reason: format!("unsupported scheme '{scheme}'"),
            },
            source => Self::ConnectionFailed {
                url: "actuator".into(),
                source,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Figment(e) => Self::Config(e),
            ConfigError::Io(e) => Self::Io(e),
            ConfigError::Serialization(e) => Self::Storage(format!("Could not write config: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_errors_map_to_distinct_exit_codes() {
        let not_found = CliError::from(CoreError::NotFound { name: "Lamp".into() });
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let dup = CliError::from(CoreError::DuplicateName { name: "Lamp".into() });
        assert_eq!(dup.exit_code(), exit_code::CONFLICT);

        let invalid = CliError::from(CoreError::InvalidInput {
            field: "pin",
            reason: "out of range".into(),
        });
        assert_eq!(invalid.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn actuator_timeout_keeps_its_duration() {
        let err = CliError::from(CoreError::Actuator(voxbridge_api::Error::Timeout {
            timeout_ms: 5000,
        }));
        assert!(matches!(err, CliError::Timeout { timeout_ms: 5000 }));
        assert_eq!(err.exit_code(), exit_code::TIMEOUT);
    }

    #[test]
    fn config_validation_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "node.mac".into(),
            reason: "bad".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
