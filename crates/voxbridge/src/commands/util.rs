//! Shared helpers for command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use voxbridge_config::Config;
use voxbridge_core::{BridgeConfig, DeviceRegistry, JsonFileStore};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::OutputOpts;

/// Everything a registry or dispatch command needs, resolved once.
pub struct NodeContext {
    pub config: Config,
    pub bridge: BridgeConfig,
    pub out: OutputOpts,
    pub store_path: PathBuf,
}

impl NodeContext {
    /// Load and validate config, then apply `--store` / output overrides.
    pub fn load(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = load_config(global)?;
        let bridge = config.to_bridge_config()?;
        let out = OutputOpts::resolve(global, &config.defaults)?;
        let store_path = global.store.clone().unwrap_or_else(|| config.store_path());
        Ok(Self {
            config,
            bridge,
            out,
            store_path,
        })
    }

    /// Open the node's persisted registry.
    pub fn open_registry(&self) -> Result<DeviceRegistry<JsonFileStore>, CliError> {
        tracing::debug!(path = %self.store_path.display(), "opening store");
        let store = JsonFileStore::open(&self.store_path).map_err(|e| CliError::Storage(e.0))?;
        let registry = DeviceRegistry::open(
            Arc::new(store),
            self.config.node_mac()?,
            self.bridge.limits.clone(),
        )?;
        Ok(registry)
    }
}

/// Config from `--config` when given, otherwise the platform default path.
pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let cfg = match &global.config {
        Some(path) => voxbridge_config::load_config_from(path)?,
        None => voxbridge_config::load_config()?,
    };
    Ok(cfg)
}

/// Config file path honoring `--config`.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(voxbridge_config::config_path)
}

/// Refuse a destructive action unless `--yes` was passed.
pub fn require_yes(action: &str, yes_flag: bool) -> Result<(), CliError> {
    if yes_flag {
        Ok(())
    } else {
        Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        })
    }
}
