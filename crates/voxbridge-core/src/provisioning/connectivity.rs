// ── Wi-Fi connection manager ──
//
// Owns the radio and the saved credentials. Every association attempt is a
// bounded poll: at most `attempts` waits of `poll_interval` each.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::WifiConfig;
use crate::error::{CoreError, persist};
use crate::model::{NetworkInfo, NetworkStatus};
use crate::ports::{KeyValueStore, Radio};

pub(crate) const SSID_KEY: &str = "wifi_ssid";
pub(crate) const PASSWORD_KEY: &str = "wifi_pass";

/// Radio plus credential storage.
pub struct Connectivity<R: Radio, S: KeyValueStore> {
    radio: R,
    store: Arc<S>,
    config: WifiConfig,
    last_check: Option<Instant>,
    was_connected: bool,
}

impl<R: Radio, S: KeyValueStore> Connectivity<R, S> {
    pub fn new(radio: R, store: Arc<S>, config: WifiConfig) -> Self {
        Self {
            radio,
            store,
            config,
            last_check: None,
            was_connected: false,
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn config(&self) -> &WifiConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.radio.association_status().is_connected()
    }

    /// Start associating with `ssid` and poll until connected or out of
    /// attempts. On failure the radio is told to stop trying.
    pub async fn connect(
        &mut self,
        ssid: &str,
        password: &SecretString,
        attempts: u32,
    ) -> Result<(), CoreError> {
        info!(ssid, attempts, "connecting to Wi-Fi");
        self.radio.connect(ssid, password.expose_secret());

        let mut polls = 0;
        while !self.radio.association_status().is_connected() {
            if polls >= attempts {
                warn!(ssid, polls, status = ?self.radio.association_status(), "Wi-Fi connection failed");
                self.radio.disconnect();
                self.was_connected = false;
                return Err(CoreError::ConnectFailed {
                    ssid: ssid.to_owned(),
                    attempts,
                });
            }
            sleep(self.config.poll_interval).await;
            polls += 1;
        }

        self.was_connected = true;
        info!(
            ssid,
            ip = ?self.radio.local_ip(),
            rssi = ?self.radio.current_rssi(),
            polls,
            "Wi-Fi connected"
        );
        Ok(())
    }

    /// Join the saved network, if there is one.
    ///
    /// Returns `Ok(false)` when no credentials are stored.
    pub async fn connect_to_saved(&mut self) -> Result<bool, CoreError> {
        self.connect_saved_with(self.config.saved_attempts).await
    }

    /// Rejoin the saved network unless already associated.
    pub async fn auto_reconnect(&mut self) -> Result<bool, CoreError> {
        if self.is_connected() {
            return Ok(true);
        }
        info!("attempting automatic Wi-Fi reconnection");
        self.connect_saved_with(self.config.reconnect_attempts).await
    }

    /// Refresh the association state, at most once per `check_interval`.
    ///
    /// Returns `None` when the call was rate limited, otherwise whether the
    /// radio is associated. A transition from connected to disconnected is
    /// logged once.
    pub fn check_connection(&mut self, now: Instant) -> Option<bool> {
        if let Some(last) = self.last_check {
            if now.saturating_duration_since(last) < self.config.check_interval {
                return None;
            }
        }
        self.last_check = Some(now);

        let connected = self.is_connected();
        if self.was_connected && !connected {
            warn!(status = ?self.radio.association_status(), "Wi-Fi connection lost");
        }
        self.was_connected = connected;
        Some(connected)
    }

    pub fn disconnect(&mut self) {
        self.radio.disconnect();
        self.was_connected = false;
        debug!("Wi-Fi disconnected");
    }

    pub fn status(&self) -> NetworkStatus {
        let connected = self.is_connected();
        NetworkStatus {
            connected,
            ssid: connected.then(|| self.radio.connected_ssid()).flatten(),
            ip: connected.then(|| self.radio.local_ip()).flatten(),
            rssi: connected.then(|| self.radio.current_rssi()).flatten(),
            mac: self.radio.mac_address(),
        }
    }

    /// Scan and collect every network the radio can describe.
    ///
    /// Entries the driver cannot name are skipped.
    pub(crate) fn scan(&mut self) -> Result<Vec<NetworkInfo>, CoreError> {
        let count = self
            .radio
            .scan()
            .map_err(|e| CoreError::ScanFailed { code: e.code })?;

        let networks = (0..count)
            .filter_map(|i| {
                let ssid = self.radio.ssid(i)?;
                Some(NetworkInfo {
                    ssid,
                    rssi: self.radio.rssi(i).unwrap_or(i32::MIN),
                    open: self.radio.is_open(i).unwrap_or(false),
                })
            })
            .collect::<Vec<_>>();
        debug!(reported = count, usable = networks.len(), "scan complete");
        Ok(networks)
    }

    pub(crate) fn release_scan(&mut self) {
        self.radio.clear_scan_results();
        debug!("scan results released");
    }

    // ── Saved credentials ────────────────────────────────────────────

    pub fn saved_ssid(&self) -> Option<String> {
        let ssid = self.store.get_string(SSID_KEY, "");
        (!ssid.is_empty()).then_some(ssid)
    }

    pub fn save_credentials(&self, ssid: &str, password: &SecretString) -> Result<(), CoreError> {
        persist(self.store.put_string(SSID_KEY, ssid), SSID_KEY)?;
        persist(
            self.store.put_string(PASSWORD_KEY, password.expose_secret()),
            PASSWORD_KEY,
        )?;
        info!(ssid, "Wi-Fi credentials saved");
        Ok(())
    }

    pub fn forget_credentials(&self) -> Result<(), CoreError> {
        persist(self.store.remove(SSID_KEY), SSID_KEY)?;
        persist(self.store.remove(PASSWORD_KEY), PASSWORD_KEY)?;
        info!("Wi-Fi credentials removed");
        Ok(())
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn connect_saved_with(&mut self, attempts: u32) -> Result<bool, CoreError> {
        let Some(ssid) = self.saved_ssid() else {
            debug!("no saved Wi-Fi credentials");
            return Ok(false);
        };
        let password = SecretString::from(self.store.get_string(PASSWORD_KEY, ""));
        self.connect(&ssid, &password, attempts).await?;
        Ok(true)
    }
}
