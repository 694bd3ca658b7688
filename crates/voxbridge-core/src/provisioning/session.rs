// ── Provisioning session ──
//
// One interactive configuration attempt at a time. The scan snapshot is
// taken once at `start` and every later choice indexes into that snapshot;
// the radio is never rescanned mid-session. Every way out of a session
// releases the driver's scan results.

use secrecy::SecretString;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::connectivity::Connectivity;
use super::{Outcome, Phase, Prompt, Step};
use crate::error::CoreError;
use crate::model::NetworkInfo;
use crate::ports::{KeyValueStore, Radio};

/// Operator input that cancels the session at any prompt.
const CANCEL: &str = "0";

#[derive(Debug)]
struct Session {
    phase: Phase,
    networks: Vec<NetworkInfo>,
    selected: Option<NetworkInfo>,
}

/// Drives the provisioning state machine over a [`Connectivity`].
pub struct Provisioner<R: Radio, S: KeyValueStore> {
    net: Connectivity<R, S>,
    session: Option<Session>,
}

impl<R: Radio, S: KeyValueStore> Provisioner<R, S> {
    pub fn new(net: Connectivity<R, S>) -> Self {
        Self { net, session: None }
    }

    pub fn connectivity(&self) -> &Connectivity<R, S> {
        &self.net
    }

    pub fn connectivity_mut(&mut self) -> &mut Connectivity<R, S> {
        &mut self.net
    }

    pub fn is_configuring(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, |s| s.phase)
    }

    /// The scan snapshot of the running session (empty when idle).
    pub fn networks(&self) -> &[NetworkInfo] {
        self.session
            .as_ref()
            .map(|s| s.networks.as_slice())
            .unwrap_or_default()
    }

    /// Begin a session: drop the current association, scan, and ask for a
    /// network. Any session already running is discarded first.
    ///
    /// A scan error or an empty scan ends the session immediately.
    pub async fn start(&mut self) -> Step {
        if self.session.take().is_some() {
            info!("replacing running network configuration");
        }
        self.net.release_scan();
        self.session = Some(Session {
            phase: Phase::Scanning,
            networks: Vec::new(),
            selected: None,
        });

        info!("starting network configuration");
        self.net.disconnect();
        sleep(self.net.config().scan_settle).await;

        let networks = match self.net.scan() {
            Ok(networks) => networks,
            Err(e) => {
                warn!(error = %e, "network scan failed");
                return self.finish(Outcome::Aborted(e));
            }
        };
        if networks.is_empty() {
            warn!("no Wi-Fi networks found");
            return self.finish(Outcome::Aborted(CoreError::NoNetworksFound));
        }

        info!(count = networks.len(), "networks found");
        let prompt = Prompt::SelectNetwork {
            networks: networks.clone(),
        };
        if let Some(session) = self.session.as_mut() {
            session.phase = Phase::AwaitingNetworkChoice;
            session.networks = networks;
        }
        Step::Continue {
            prompt,
            rejected: None,
        }
    }

    /// Handle the operator's network choice: `0` cancels, `1..=n` picks
    /// from the snapshot, anything else re-prompts.
    pub async fn handle_network_choice(&mut self, input: &str) -> Result<Step, CoreError> {
        self.expect_phase(Phase::AwaitingNetworkChoice, "a network choice")?;
        let input = input.trim();
        if input == CANCEL {
            info!("network configuration cancelled");
            return Ok(self.finish(Outcome::Cancelled));
        }

        let networks = self.networks();
        let chosen = input
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| networks.get(i))
            .cloned();
        let Some(network) = chosen else {
            debug!(input, "invalid network selection");
            return Ok(Step::Continue {
                prompt: Prompt::SelectNetwork {
                    networks: networks.to_vec(),
                },
                rejected: Some(CoreError::InvalidSelection {
                    input: input.to_owned(),
                    max: networks.len(),
                }),
            });
        };

        info!(ssid = %network.ssid, open = network.open, "network selected");
        if network.open {
            self.set_phase(Phase::Connecting);
            let attempts = self.net.config().connect_attempts;
            let password = SecretString::from(String::new());
            let step = match self.net.connect(&network.ssid, &password, attempts).await {
                Ok(()) => self.complete(network.ssid, &password),
                Err(e) => self.finish(Outcome::Aborted(e)),
            };
            return Ok(step);
        }

        let ssid = network.ssid.clone();
        if let Some(session) = self.session.as_mut() {
            session.selected = Some(network);
            session.phase = Phase::AwaitingPassword;
        }
        Ok(Step::Continue {
            prompt: Prompt::Password { ssid },
            rejected: None,
        })
    }

    /// Handle a password line: `0` cancels, blank re-prompts, anything else
    /// is tried against the selected network. A failed attempt re-prompts;
    /// only the password that actually connected is saved.
    pub async fn handle_password(&mut self, input: &str) -> Result<Step, CoreError> {
        self.expect_phase(Phase::AwaitingPassword, "a password")?;
        let line = input.trim_end_matches(['\r', '\n']);
        if line.trim() == CANCEL {
            info!("network configuration cancelled");
            return Ok(self.finish(Outcome::Cancelled));
        }

        let ssid = self
            .session
            .as_ref()
            .and_then(|s| s.selected.as_ref())
            .map(|n| n.ssid.clone())
            .ok_or(CoreError::NotConfiguring)?;

        if line.trim().is_empty() {
            return Ok(Step::Continue {
                prompt: Prompt::Password { ssid },
                rejected: Some(CoreError::EmptyCredential),
            });
        }

        let password = SecretString::from(line.to_owned());
        self.set_phase(Phase::Connecting);
        let attempts = self.net.config().connect_attempts;
        match self.net.connect(&ssid, &password, attempts).await {
            Ok(()) => Ok(self.complete(ssid, &password)),
            Err(e) => {
                self.set_phase(Phase::AwaitingPassword);
                Ok(Step::Continue {
                    prompt: Prompt::Password { ssid },
                    rejected: Some(e),
                })
            }
        }
    }

    /// End the running session, if any. Scan results are released either way.
    pub fn cancel(&mut self) -> bool {
        let was_configuring = self.session.is_some();
        self.finish(Outcome::Cancelled);
        if was_configuring {
            info!("network configuration cancelled");
        }
        was_configuring
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn expect_phase(&self, phase: Phase, expected: &'static str) -> Result<(), CoreError> {
        match &self.session {
            None => Err(CoreError::NotConfiguring),
            Some(s) if s.phase == phase => Ok(()),
            Some(_) => Err(CoreError::UnexpectedInput { expected }),
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if let Some(session) = self.session.as_mut() {
            session.phase = phase;
        }
    }

    /// Associated: persist the credentials, then end the session.
    fn complete(&mut self, ssid: String, password: &SecretString) -> Step {
        match self.net.save_credentials(&ssid, password) {
            Ok(()) => self.finish(Outcome::Connected { ssid }),
            Err(e) => {
                warn!(ssid, error = %e, "connected but credentials were not saved");
                self.finish(Outcome::Aborted(e))
            }
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Step {
        self.session = None;
        self.net.release_scan();
        Step::Finished(outcome)
    }
}
