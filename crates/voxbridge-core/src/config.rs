// ── Runtime node configuration ──
//
// Tunables for the registry, the Wi-Fi manager and the dispatch controller.
// Defaults match what the node ships with; `voxbridge-config` builds a
// `BridgeConfig` from TOML + environment and hands it in. Core never reads
// config files.

use std::time::Duration;

/// Hard upper bound on configured devices. The registry storage is
/// allocated inline at this size.
pub const MAX_DEVICES: usize = 100;

/// Validation limits applied to registry input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryLimits {
    pub max_name_len: usize,
    pub max_url_len: usize,
    pub min_pin: u8,
    pub max_pin: u8,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self {
            max_name_len: 50,
            max_url_len: 200,
            min_pin: 1,
            max_pin: 39,
        }
    }
}

/// Wi-Fi connection and provisioning timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiConfig {
    /// Association polls for a network chosen during provisioning.
    pub connect_attempts: u32,
    /// Association polls when joining the saved network at boot.
    pub saved_attempts: u32,
    /// Association polls for an automatic reconnect.
    pub reconnect_attempts: u32,
    /// Delay between association polls.
    pub poll_interval: Duration,
    /// Pause between dropping the current association and scanning.
    pub scan_settle: Duration,
    /// Minimum spacing of `check_connection` calls.
    pub check_interval: Duration,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 20,
            saved_attempts: 15,
            reconnect_attempts: 10,
            poll_interval: Duration::from_millis(500),
            scan_settle: Duration::from_millis(100),
            check_interval: Duration::from_secs(30),
        }
    }
}

/// Discovery responder and actuator call settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Host (or base URL) of the default pin-pulse actuator.
    pub actuator_host: String,
    /// Port the discovery responder listens on.
    pub responder_port: u16,
    /// Timeout for a single actuator call.
    pub http_timeout: Duration,
    /// Response bodies longer than this are not echoed to the log.
    pub response_preview_len: usize,
    /// Wait between clearing the callback flag and disabling the responder.
    pub callback_settle: Duration,
    /// Pause between shutdown and re-initialisation on restart.
    pub restart_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            actuator_host: "192.168.1.100".into(),
            responder_port: 80,
            http_timeout: Duration::from_millis(5000),
            response_preview_len: 200,
            callback_settle: Duration::from_millis(100),
            restart_delay: Duration::from_millis(500),
        }
    }
}

/// Full configuration for a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    pub limits: RegistryLimits,
    pub wifi: WifiConfig,
    pub dispatch: DispatchConfig,
}
