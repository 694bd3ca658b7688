// ── Domain model ──
//
// Plain value types shared by the registry, provisioning and dispatch.

pub mod device;
pub mod identity;
pub mod network;

// ── Re-exports ──────────────────────────────────────────────────────

pub use device::{Device, DeviceTarget};
pub use identity::{InvalidMac, MacAddress, StableId};
pub use network::{AssociationStatus, NetworkInfo, NetworkStatus, SignalQuality};
