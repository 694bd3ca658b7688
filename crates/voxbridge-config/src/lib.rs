//! Shared configuration for voxbridge tools.
//!
//! One TOML file, layered under `VOXBRIDGE_*` environment variables, and
//! translation into `voxbridge_core::BridgeConfig`. Nested keys use a double
//! underscore in the environment: `VOXBRIDGE_DISPATCH__ACTUATOR_HOST`
//! overrides `[dispatch] actuator_host`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use voxbridge_core::{
    BridgeConfig, DispatchConfig, MacAddress, RegistryLimits, WifiConfig,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeSection,

    #[serde(default)]
    pub registry: RegistrySection,

    #[serde(default)]
    pub wifi: WifiSection,

    #[serde(default)]
    pub dispatch: DispatchSection,

    /// CLI presentation defaults.
    #[serde(default)]
    pub defaults: Defaults,
}

/// Identity and storage of the node being managed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeSection {
    /// Radio MAC; seeds every device's stable identifier.
    #[serde(default = "default_mac")]
    pub mac: String,

    /// Key-value store file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,
}

impl Default for NodeSection {
    fn default() -> Self {
        Self {
            mac: default_mac(),
            store: None,
        }
    }
}

fn default_mac() -> String {
    // Locally administered, never assigned to real hardware.
    "02:00:00:00:00:01".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistrySection {
    pub max_name_len: usize,
    pub max_url_len: usize,
    pub min_pin: u8,
    pub max_pin: u8,
}

impl Default for RegistrySection {
    fn default() -> Self {
        let limits = RegistryLimits::default();
        Self {
            max_name_len: limits.max_name_len,
            max_url_len: limits.max_url_len,
            min_pin: limits.min_pin,
            max_pin: limits.max_pin,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WifiSection {
    pub connect_attempts: u32,
    pub saved_attempts: u32,
    pub reconnect_attempts: u32,
    pub poll_interval_ms: u64,
    pub scan_settle_ms: u64,
    pub check_interval_secs: u64,
}

impl Default for WifiSection {
    fn default() -> Self {
        let wifi = WifiConfig::default();
        Self {
            connect_attempts: wifi.connect_attempts,
            saved_attempts: wifi.saved_attempts,
            reconnect_attempts: wifi.reconnect_attempts,
            poll_interval_ms: millis(wifi.poll_interval),
            scan_settle_ms: millis(wifi.scan_settle),
            check_interval_secs: wifi.check_interval.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchSection {
    /// Host or base URL of the pin-pulse actuator.
    pub actuator_host: String,
    pub responder_port: u16,
    pub http_timeout_ms: u64,
    pub response_preview_len: usize,
    pub callback_settle_ms: u64,
    pub restart_delay_ms: u64,
}

impl Default for DispatchSection {
    fn default() -> Self {
        let dispatch = DispatchConfig::default();
        Self {
            actuator_host: dispatch.actuator_host,
            responder_port: dispatch.responder_port,
            http_timeout_ms: millis(dispatch.http_timeout),
            response_preview_len: dispatch.response_preview_len,
            callback_settle_ms: millis(dispatch.callback_settle),
            restart_delay_ms: millis(dispatch.restart_delay),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    pub fn node_mac(&self) -> Result<MacAddress, ConfigError> {
        self.node
            .mac
            .parse()
            .map_err(|e: voxbridge_core::model::InvalidMac| invalid("node.mac", e.to_string()))
    }

    /// Where the node's key-value store lives.
    pub fn store_path(&self) -> PathBuf {
        self.node.store.clone().unwrap_or_else(default_store_path)
    }

    /// Check every value that the core would otherwise trust blindly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.node_mac()?;

        let r = &self.registry;
        if r.max_name_len == 0 {
            return Err(invalid("registry.max_name_len", "must be at least 1"));
        }
        if r.max_url_len == 0 {
            return Err(invalid("registry.max_url_len", "must be at least 1"));
        }
        if r.min_pin == 0 || r.min_pin > r.max_pin {
            return Err(invalid(
                "registry.min_pin",
                format!("pin range {}-{} is empty or starts at 0", r.min_pin, r.max_pin),
            ));
        }

        let w = &self.wifi;
        for (field, value) in [
            ("wifi.connect_attempts", w.connect_attempts),
            ("wifi.saved_attempts", w.saved_attempts),
            ("wifi.reconnect_attempts", w.reconnect_attempts),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be at least 1"));
            }
        }
        if w.poll_interval_ms == 0 {
            return Err(invalid("wifi.poll_interval_ms", "must be at least 1"));
        }

        let d = &self.dispatch;
        voxbridge_api::actuator_base_url(&d.actuator_host)
            .map_err(|e| invalid("dispatch.actuator_host", e.to_string()))?;
        if d.responder_port == 0 {
            return Err(invalid("dispatch.responder_port", "must not be 0"));
        }
        if d.http_timeout_ms == 0 {
            return Err(invalid("dispatch.http_timeout_ms", "must be at least 1"));
        }
        Ok(())
    }

    /// Validate and build the core configuration.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        self.validate()?;
        let (r, w, d) = (&self.registry, &self.wifi, &self.dispatch);
        Ok(BridgeConfig {
            limits: RegistryLimits {
                max_name_len: r.max_name_len,
                max_url_len: r.max_url_len,
                min_pin: r.min_pin,
                max_pin: r.max_pin,
            },
            wifi: WifiConfig {
                connect_attempts: w.connect_attempts,
                saved_attempts: w.saved_attempts,
                reconnect_attempts: w.reconnect_attempts,
                poll_interval: Duration::from_millis(w.poll_interval_ms),
                scan_settle: Duration::from_millis(w.scan_settle_ms),
                check_interval: Duration::from_secs(w.check_interval_secs),
            },
            dispatch: DispatchConfig {
                actuator_host: d.actuator_host.clone(),
                responder_port: d.responder_port,
                http_timeout: Duration::from_millis(d.http_timeout_ms),
                response_preview_len: d.response_preview_len,
                callback_settle: Duration::from_millis(d.callback_settle_ms),
                restart_delay: Duration::from_millis(d.restart_delay_ms),
            },
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "voxbridge", "voxbridge")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default location of the node's key-value store file.
pub fn default_store_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("nvs.json"),
        |dirs| dirs.data_dir().join("nvs.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("voxbridge");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `VOXBRIDGE_*`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("VOXBRIDGE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
