//! HTTP side of the voxbridge node.
//!
//! Voice commands end up as a single GET against either the default
//! actuator's `/pulsePin` endpoint or a user-supplied URL. This crate owns
//! that call: URL construction, per-request timeouts, and mapping transport
//! failures into [`Error`].

pub mod actuator;
pub mod error;
pub mod transport;

pub use actuator::{ActuatorClient, HttpResponse, actuator_base_url, pulse_url};
pub use error::Error;
pub use transport::TransportConfig;
