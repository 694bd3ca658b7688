//! Port traits for the collaborators the node does not own.
//!
//! ```text
//!   radio driver ─┐
//!   NVS / flash  ─┼──▶ port trait ──▶ Registry / Provisioning / Dispatch
//!   responder    ─┤
//!   HTTP client  ─┘
//! ```
//!
//! Firmware builds implement these over the real drivers; tests and host
//! tools use the stores in [`crate::store`] and hand-written fakes.

use std::net::IpAddr;
use std::time::Duration;

use voxbridge_api::{ActuatorClient, HttpResponse};

use crate::model::{AssociationStatus, MacAddress};

// ───────────────────────────────────────────────────────────────
// Key-value store (NVS / preferences)
// ───────────────────────────────────────────────────────────────

/// Failure reported by a [`KeyValueStore`] write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Non-volatile key-value storage.
///
/// Reads never fail: a missing key, or a key holding a value of another
/// type, yields `default`. Each write is atomic per key; there is no
/// multi-key transaction.
pub trait KeyValueStore {
    fn get_int(&self, key: &str, default: i32) -> i32;
    fn get_string(&self, key: &str, default: &str) -> String;
    fn get_bool(&self, key: &str, default: bool) -> bool;

    fn put_int(&self, key: &str, value: i32) -> Result<(), StoreError>;
    fn put_string(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn put_bool(&self, key: &str, value: bool) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn contains(&self, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Radio driver
// ───────────────────────────────────────────────────────────────

/// Negative status code returned by a failed scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioError {
    pub code: i32,
}

/// Station-mode Wi-Fi radio.
///
/// `scan` blocks for at most the driver's own scan timeout. Results stay
/// addressable by index until [`clear_scan_results`](Self::clear_scan_results).
pub trait Radio {
    fn mac_address(&self) -> MacAddress;

    /// Run a scan and return the number of networks found.
    fn scan(&mut self) -> Result<usize, RadioError>;
    fn ssid(&self, index: usize) -> Option<String>;
    fn rssi(&self, index: usize) -> Option<i32>;
    fn is_open(&self, index: usize) -> Option<bool>;
    fn clear_scan_results(&mut self);

    /// Start associating. Completion is observed via
    /// [`association_status`](Self::association_status).
    fn connect(&mut self, ssid: &str, password: &str);
    fn association_status(&self) -> AssociationStatus;
    fn disconnect(&mut self);

    fn connected_ssid(&self) -> Option<String>;
    fn local_ip(&self) -> Option<IpAddr>;
    fn current_rssi(&self) -> Option<i32>;
}

// ───────────────────────────────────────────────────────────────
// Discovery responder (voice-assistant device emulation)
// ───────────────────────────────────────────────────────────────

/// Handle the responder assigns to a registered device.
pub type DeviceHandle = u8;

/// Callback the responder invokes when a voice command sets a device state.
///
/// A bare function pointer: the responder carries no user context, so the
/// receiving side has to find its controller on its own (see
/// [`crate::dispatch::guard`]).
pub type CommandCallback = fn(handle: DeviceHandle, device_name: &str, state: bool, value: u8);

/// Emulated smart-home hub answering discovery and command requests.
pub trait DiscoveryResponder {
    /// Bind the control server on `port`.
    fn start(&mut self, port: u16);
    fn register(&mut self, name: &str) -> DeviceHandle;
    fn set_external_id(&mut self, handle: DeviceHandle, id: &str);
    /// Drop every registered device.
    fn unregister_all(&mut self);
    fn enable(&mut self, enabled: bool);
    fn on_command(&mut self, callback: CommandCallback);
    /// Process pending network traffic. May call the command callback
    /// synchronously before returning.
    fn service(&mut self);
}

// ───────────────────────────────────────────────────────────────
// HTTP client
// ───────────────────────────────────────────────────────────────

/// Outbound HTTP used to actuate devices.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    async fn get(&self, url: &str, timeout: Duration)
    -> Result<HttpResponse, voxbridge_api::Error>;
}

impl HttpClient for ActuatorClient {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<HttpResponse, voxbridge_api::Error> {
        ActuatorClient::get(self, url, timeout).await
    }
}
