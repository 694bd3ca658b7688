// ── Wi-Fi domain types ──
//
// Scan candidates, association state, and the connection summary shown on
// the status screen.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use super::identity::MacAddress;

/// One network seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub ssid: String,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// `true` when the network needs no password.
    pub open: bool,
}

impl NetworkInfo {
    pub fn signal(&self) -> SignalQuality {
        SignalQuality::from_rssi(self.rssi)
    }
}

/// Coarse signal bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Weak,
}

impl SignalQuality {
    pub fn from_rssi(dbm: i32) -> Self {
        if dbm > -50 {
            Self::Excellent
        } else if dbm > -60 {
            Self::Good
        } else if dbm > -70 {
            Self::Fair
        } else {
            Self::Weak
        }
    }
}

/// Association state reported by the radio driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationStatus {
    Idle,
    Connecting,
    Connected,
    NoSsidAvailable,
    ConnectFailed,
    ConnectionLost,
    Disconnected,
}

impl AssociationStatus {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Snapshot of the node's Wi-Fi connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub connected: bool,
    pub ssid: Option<String>,
    pub ip: Option<IpAddr>,
    pub rssi: Option<i32>,
    pub mac: MacAddress,
}
