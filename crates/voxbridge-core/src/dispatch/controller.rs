// ── Dispatch controller ──
//
// Owns the discovery responder and the actuator client. Initialisation
// rebuilds the responder's device table from the registry and enables the
// callback guard as its very last step; shutdown clears the guard first.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::time::sleep;
use tracing::{debug, info, warn};
use voxbridge_api::{HttpResponse, actuator_base_url, pulse_url};

use super::guard::{self, Inbox};
use crate::config::DispatchConfig;
use crate::model::DeviceTarget;
use crate::ports::{DiscoveryResponder, HttpClient, KeyValueStore};
use crate::registry::DeviceRegistry;

/// How a single command was handled.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The actuator answered. A non-200 status is a failed actuation but
    /// still a completed call.
    Completed(HttpResponse),
    /// No device with that name is configured.
    UnknownDevice,
    /// The call could not be made or did not complete.
    Failed(voxbridge_api::Error),
}

/// Record of one dispatched command.
#[derive(Debug)]
pub struct DispatchReport {
    pub device: String,
    pub state: bool,
    pub target: Option<DeviceTarget>,
    pub outcome: DispatchOutcome,
}

impl DispatchReport {
    /// `true` when the actuator answered with `200`.
    pub fn is_success(&self) -> bool {
        matches!(&self.outcome, DispatchOutcome::Completed(r) if r.is_success())
    }
}

/// Look `name` up in `registry` and make exactly one actuator call for it.
///
/// Pin devices pulse the pin on the configured actuator; URL devices GET
/// their URL. Both `on` and `off` produce the same call. Nothing here
/// mutates the registry, and failures are reported, never retried.
pub async fn dispatch_command<S, H>(
    registry: &DeviceRegistry<S>,
    http: &H,
    config: &DispatchConfig,
    name: &str,
    state: bool,
) -> DispatchReport
where
    S: KeyValueStore,
    H: HttpClient,
{
    let Some(device) = registry.find(name) else {
        warn!(device = name, "command for unknown device dropped");
        return DispatchReport {
            device: name.to_owned(),
            state,
            target: None,
            outcome: DispatchOutcome::UnknownDevice,
        };
    };

    let url = match &device.target {
        DeviceTarget::Pin(pin) => {
            actuator_base_url(&config.actuator_host).and_then(|base| pulse_url(&base, *pin))
        }
        DeviceTarget::Url(url) => url::Url::parse(url).map_err(voxbridge_api::Error::from),
    };

    let result = match url {
        Ok(url) => {
            info!(device = %device.name, state, %url, "dispatching command");
            http.get(url.as_str(), config.http_timeout).await
        }
        Err(e) => Err(e),
    };

    let outcome = match result {
        Ok(response) => {
            if response.is_success() {
                info!(device = %device.name, status = response.status, "actuator call succeeded");
            } else {
                warn!(device = %device.name, status = response.status, "actuator returned an error status");
            }
            if response.body.chars().count() < config.response_preview_len {
                debug!(device = %device.name, body = %response.body, "actuator response");
            }
            DispatchOutcome::Completed(response)
        }
        Err(e) => {
            warn!(device = %device.name, error = %e, "actuator call failed");
            DispatchOutcome::Failed(e)
        }
    };

    DispatchReport {
        device: device.name.clone(),
        state,
        target: Some(device.target.clone()),
        outcome,
    }
}

/// Voice-assistant side of the node: responder lifecycle plus dispatch.
///
/// Only one controller in the process receives callbacks: the one
/// initialised most recently.
pub struct DispatchController<D: DiscoveryResponder, H: HttpClient> {
    responder: D,
    http: H,
    config: DispatchConfig,
    inbox: Arc<Inbox>,
    initialized: bool,
    server_started: bool,
}

impl<D: DiscoveryResponder, H: HttpClient> DispatchController<D, H> {
    pub fn new(responder: D, http: H, config: DispatchConfig) -> Self {
        guard::set_enabled(false);
        Self {
            responder,
            http,
            config,
            inbox: Arc::new(Mutex::new(VecDeque::new())),
            initialized: false,
            server_started: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn responder(&self) -> &D {
        &self.responder
    }

    pub fn responder_mut(&mut self) -> &mut D {
        &mut self.responder
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Rebuild the responder's device table from `registry` and start
    /// accepting commands.
    pub fn initialize<S: KeyValueStore>(&mut self, registry: &DeviceRegistry<S>) {
        guard::set_enabled(false);
        info!(devices = registry.len(), "initializing voice assistant");

        if !self.server_started {
            self.responder.start(self.config.responder_port);
            self.server_started = true;
        }
        self.responder.unregister_all();
        for device in registry.devices() {
            let handle = self.responder.register(&device.name);
            self.responder
                .set_external_id(handle, device.stable_id.as_str());
            debug!(device = %device.name, handle, id = %device.stable_id, "registered device");
        }

        self.responder.on_command(guard::command_trampoline);
        self.responder.enable(true);
        // Commands queued against the previous table are stale.
        guard::clear(&self.inbox);
        guard::set_active(&self.inbox);
        self.initialized = true;

        guard::set_enabled(true);
        info!("voice assistant ready");
    }

    /// Stop accepting commands and disable the responder.
    pub async fn shutdown(&mut self) {
        guard::set_enabled(false);
        if !self.initialized {
            return;
        }
        info!("stopping voice assistant");
        sleep(self.config.callback_settle).await;
        self.responder.enable(false);
        self.initialized = false;
    }

    /// Shut down, pause, and initialise again from `registry`.
    pub async fn restart<S: KeyValueStore>(&mut self, registry: &DeviceRegistry<S>) {
        info!("restarting voice assistant");
        self.shutdown().await;
        sleep(self.config.restart_delay).await;
        self.initialize(registry);
    }

    /// Run one scheduler tick: service the responder, then dispatch every
    /// command it delivered, one call at a time.
    pub async fn service_once<S: KeyValueStore>(
        &mut self,
        registry: &DeviceRegistry<S>,
    ) -> Vec<DispatchReport> {
        if !self.initialized {
            return Vec::new();
        }
        self.responder.service();

        let commands = guard::drain(&self.inbox);
        let mut reports = Vec::with_capacity(commands.len());
        for command in commands {
            if !guard::callbacks_enabled() || !guard::is_active(&self.inbox) {
                debug!(device = %command.device, "dropping queued command, dispatch disabled");
                continue;
            }
            reports.push(
                dispatch_command(
                    registry,
                    &self.http,
                    &self.config,
                    &command.device,
                    command.state,
                )
                .await,
            );
        }
        reports
    }
}

impl<D: DiscoveryResponder, H: HttpClient> Drop for DispatchController<D, H> {
    fn drop(&mut self) {
        guard::release(&self.inbox);
    }
}
