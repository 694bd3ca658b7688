//! Core logic of a voice-assistant bridge node.
//!
//! The node pretends to be a set of smart-home devices for a voice
//! assistant and turns each voice command into one HTTP call against a
//! real actuator. This crate owns everything between the radio and the
//! HTTP client:
//!
//! - **[`DeviceRegistry`]**: fixed-capacity set of named devices with
//!   stable external identifiers, persisted through a [`KeyValueStore`]
//!   after every change.
//!
//! - **[`Provisioner`]**: line-by-line Wi-Fi setup state machine over a
//!   single scan snapshot, plus the [`Connectivity`] manager that joins and
//!   rejoins the saved network.
//!
//! - **[`DispatchController`]**: discovery-responder lifecycle and the
//!   callback guard ([`dispatch::guard`]) that keeps voice commands out
//!   while the device table is being rebuilt.
//!
//! - **[`Bridge`]**: facade wiring the three together for an operator
//!   layer (serial menu, CLI).
//!
//! Hardware and network collaborators are reached only through the traits
//! in [`ports`]. The callback guard is process-wide: one controller at a
//! time receives voice commands.

pub mod bridge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod ports;
pub mod provisioning;
pub mod registry;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use config::{BridgeConfig, DispatchConfig, MAX_DEVICES, RegistryLimits, WifiConfig};
pub use dispatch::{
    DeviceCommand, DispatchController, DispatchOutcome, DispatchReport, callbacks_enabled,
    command_trampoline, dispatch_command,
};
pub use error::CoreError;
pub use ports::{
    CommandCallback, DeviceHandle, DiscoveryResponder, HttpClient, KeyValueStore, Radio,
    RadioError, StoreError,
};
pub use provisioning::{Connectivity, Outcome, Phase, Prompt, Provisioner, Step};
pub use registry::{DeviceRegistry, LoadReport};
pub use store::{JsonFileStore, MemoryStore, StoredValue};

pub use model::{
    AssociationStatus, Device, DeviceTarget, MacAddress, NetworkInfo, NetworkStatus,
    SignalQuality, StableId,
};
