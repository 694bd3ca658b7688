#![allow(dead_code, clippy::unwrap_used)]
// Hand-written fakes for the port traits.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use voxbridge_api::HttpResponse;
use voxbridge_core::{
    AssociationStatus, CommandCallback, DeviceHandle, DiscoveryResponder, HttpClient, MacAddress,
    NetworkInfo, Radio, RadioError,
};

pub const NODE_MAC: MacAddress = MacAddress::new([0x24, 0x6f, 0x28, 0xaa, 0xbb, 0xcc]);

// ── Radio ───────────────────────────────────────────────────────────

/// Scripted radio. Association succeeds immediately when the password
/// matches (or the network is open) and never succeeds otherwise.
#[derive(Debug, Default)]
pub struct FakeRadio {
    pub networks: Vec<NetworkInfo>,
    pub scan_error: Option<i32>,
    pub passwords: HashMap<String, String>,
    pub status: Option<AssociationStatus>,
    pub joined: Option<String>,
    pub connect_attempts: Vec<(String, String)>,
    pub scans: usize,
    pub scan_results_cleared: usize,
    pub disconnects: usize,
    scan_cache: Vec<NetworkInfo>,
}

impl FakeRadio {
    pub fn with_networks(networks: Vec<NetworkInfo>) -> Self {
        Self {
            networks,
            ..Self::default()
        }
    }

    pub fn secured(mut self, ssid: &str, password: &str) -> Self {
        self.passwords.insert(ssid.into(), password.into());
        self
    }

    /// Start out associated with `ssid`.
    pub fn joined_to(mut self, ssid: &str) -> Self {
        self.status = Some(AssociationStatus::Connected);
        self.joined = Some(ssid.into());
        self
    }

    pub fn drop_connection(&mut self) {
        self.status = Some(AssociationStatus::ConnectionLost);
        self.joined = None;
    }

    pub fn has_scan_results(&self) -> bool {
        !self.scan_cache.is_empty()
    }
}

pub fn network(ssid: &str, rssi: i32, open: bool) -> NetworkInfo {
    NetworkInfo {
        ssid: ssid.into(),
        rssi,
        open,
    }
}

impl Radio for FakeRadio {
    fn mac_address(&self) -> MacAddress {
        NODE_MAC
    }

    fn scan(&mut self) -> Result<usize, RadioError> {
        self.scans += 1;
        if let Some(code) = self.scan_error {
            return Err(RadioError { code });
        }
        self.scan_cache.clone_from(&self.networks);
        Ok(self.scan_cache.len())
    }

    fn ssid(&self, index: usize) -> Option<String> {
        self.scan_cache.get(index).map(|n| n.ssid.clone())
    }

    fn rssi(&self, index: usize) -> Option<i32> {
        self.scan_cache.get(index).map(|n| n.rssi)
    }

    fn is_open(&self, index: usize) -> Option<bool> {
        self.scan_cache.get(index).map(|n| n.open)
    }

    fn clear_scan_results(&mut self) {
        self.scan_cache.clear();
        self.scan_results_cleared += 1;
    }

    fn connect(&mut self, ssid: &str, password: &str) {
        self.connect_attempts.push((ssid.into(), password.into()));
        let known = self.networks.iter().find(|n| n.ssid == ssid);
        let accepted = match known {
            Some(n) if n.open => true,
            Some(_) => self.passwords.get(ssid).is_some_and(|p| p == password),
            None => false,
        };
        if accepted {
            self.status = Some(AssociationStatus::Connected);
            self.joined = Some(ssid.into());
        } else {
            self.status = Some(AssociationStatus::ConnectFailed);
            self.joined = None;
        }
    }

    fn association_status(&self) -> AssociationStatus {
        self.status.unwrap_or(AssociationStatus::Idle)
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.status = Some(AssociationStatus::Disconnected);
        self.joined = None;
    }

    fn connected_ssid(&self) -> Option<String> {
        self.joined.clone()
    }

    fn local_ip(&self) -> Option<IpAddr> {
        self.joined
            .as_ref()
            .map(|_| IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42)))
    }

    fn current_rssi(&self) -> Option<i32> {
        self.joined.as_ref().map(|_| -55)
    }
}

// ── Discovery responder ─────────────────────────────────────────────

/// Records the device table and delivers queued voice commands through the
/// registered callback on `service()`.
#[derive(Debug, Default)]
pub struct FakeResponder {
    pub port: Option<u16>,
    pub starts: usize,
    pub table: Vec<(String, String)>,
    pub enabled: bool,
    pub callback: Option<CommandCallback>,
    pub pending: VecDeque<(String, bool)>,
    pub services: usize,
    /// Fired through the previously registered callback from inside
    /// `register`, the way a real responder can interleave a callback with
    /// table rebuilding.
    pub fire_during_register: Option<(String, bool)>,
}

impl FakeResponder {
    pub fn say(&mut self, device: &str, state: bool) {
        self.pending.push_back((device.into(), state));
    }

    pub fn names(&self) -> Vec<&str> {
        self.table.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn handle_of(&self, name: &str) -> DeviceHandle {
        self.table
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|i| u8::try_from(i).ok())
            .unwrap_or(u8::MAX)
    }
}

impl DiscoveryResponder for FakeResponder {
    fn start(&mut self, port: u16) {
        self.port = Some(port);
        self.starts += 1;
    }

    fn register(&mut self, name: &str) -> DeviceHandle {
        if let (Some(callback), Some((device, state))) =
            (self.callback, self.fire_during_register.take())
        {
            callback(0, &device, state, 255);
        }
        self.table.push((name.into(), String::new()));
        u8::try_from(self.table.len() - 1).unwrap()
    }

    fn set_external_id(&mut self, handle: DeviceHandle, id: &str) {
        if let Some(entry) = self.table.get_mut(usize::from(handle)) {
            entry.1 = id.into();
        }
    }

    fn unregister_all(&mut self) {
        self.table.clear();
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn on_command(&mut self, callback: CommandCallback) {
        self.callback = Some(callback);
    }

    fn service(&mut self) {
        self.services += 1;
        let Some(callback) = self.callback else {
            return;
        };
        while let Some((device, state)) = self.pending.pop_front() {
            let handle = self.handle_of(&device);
            callback(handle, &device, state, if state { 255 } else { 0 });
        }
    }
}

// ── HTTP client ─────────────────────────────────────────────────────

/// Records every requested URL and answers with a fixed status.
#[derive(Debug)]
pub struct RecordingHttp {
    pub calls: RefCell<Vec<String>>,
    pub status: u16,
    pub body: String,
    pub fail: bool,
}

impl Default for RecordingHttp {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            status: 200,
            body: "OK".into(),
            fail: false,
        }
    }
}

impl RecordingHttp {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl HttpClient for RecordingHttp {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, voxbridge_api::Error> {
        self.calls.borrow_mut().push(url.to_owned());
        if self.fail {
            return Err(voxbridge_api::Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            });
        }
        Ok(HttpResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}
