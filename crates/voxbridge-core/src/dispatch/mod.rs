// ── Guarded command dispatch ──
//
// Voice commands arrive through the discovery responder's callback, are
// queued by the guard trampoline, and are dispatched to actuators on the
// next service tick.

mod controller;
pub mod guard;

pub use controller::{DispatchController, DispatchOutcome, DispatchReport, dispatch_command};
pub use guard::{DeviceCommand, callbacks_enabled, command_trampoline};
