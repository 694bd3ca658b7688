// ── Network provisioning ──
//
// Interactive Wi-Fi setup driven one line of operator input at a time,
// plus the connection manager that owns the radio between sessions.

mod connectivity;
mod session;

pub use connectivity::Connectivity;
pub use session::Provisioner;

use crate::error::CoreError;
use crate::model::NetworkInfo;

/// Where a provisioning session stands.
///
/// `Scanning` and `Connecting` are only observable while the corresponding
/// async call is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scanning,
    AwaitingNetworkChoice,
    AwaitingPassword,
    Connecting,
}

/// What the operator should be asked next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Pick a network by its 1-based position, or `0` to cancel.
    SelectNetwork { networks: Vec<NetworkInfo> },
    /// Enter the password for `ssid`, or `0` to cancel.
    Password { ssid: String },
}

/// How a session ended.
#[derive(Debug)]
pub enum Outcome {
    /// Associated, credentials saved.
    Connected { ssid: String },
    Cancelled,
    /// The session could not continue.
    Aborted(CoreError),
}

/// Result of feeding one event to the session.
#[derive(Debug)]
pub enum Step {
    /// The session is still running. `rejected` holds the reason the last
    /// input was not accepted, if it was not.
    Continue {
        prompt: Prompt,
        rejected: Option<CoreError>,
    },
    Finished(Outcome),
}

impl Step {
    /// `true` once the session is over and the node is back to idle.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    pub fn prompt(&self) -> Option<&Prompt> {
        match self {
            Self::Continue { prompt, .. } => Some(prompt),
            Self::Finished(_) => None,
        }
    }

    pub fn rejected(&self) -> Option<&CoreError> {
        match self {
            Self::Continue { rejected, .. } => rejected.as_ref(),
            Self::Finished(_) => None,
        }
    }
}
