// ── Bridge facade ──
//
// Ties the registry, the Wi-Fi side and the voice-assistant side together
// behind the surface the operator layer talks to. Anything that changes the
// device set or the network runs with dispatch suspended.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::BridgeConfig;
use crate::dispatch::{DispatchController, DispatchReport};
use crate::error::CoreError;
use crate::model::{Device, NetworkStatus, StableId};
use crate::ports::{DiscoveryResponder, HttpClient, KeyValueStore, Radio};
use crate::provisioning::{Connectivity, Phase, Provisioner, Step};
use crate::registry::DeviceRegistry;

/// The whole node.
pub struct Bridge<S, R, D, H>
where
    S: KeyValueStore,
    R: Radio,
    D: DiscoveryResponder,
    H: HttpClient,
{
    store: Arc<S>,
    registry: DeviceRegistry<S>,
    provisioner: Provisioner<R, S>,
    dispatch: DispatchController<D, H>,
    config: BridgeConfig,
}

impl<S, R, D, H> Bridge<S, R, D, H>
where
    S: KeyValueStore,
    R: Radio,
    D: DiscoveryResponder,
    H: HttpClient,
{
    /// Assemble the node and load the registry from `store`.
    ///
    /// Nothing is connected or started yet; see [`boot`](Self::boot).
    pub fn new(
        store: Arc<S>,
        radio: R,
        responder: D,
        http: H,
        config: BridgeConfig,
    ) -> Result<Self, CoreError> {
        let registry = DeviceRegistry::open(
            Arc::clone(&store),
            radio.mac_address(),
            config.limits.clone(),
        )?;
        let net = Connectivity::new(radio, Arc::clone(&store), config.wifi.clone());
        let dispatch = DispatchController::new(responder, http, config.dispatch.clone());
        Ok(Self {
            store,
            registry,
            provisioner: Provisioner::new(net),
            dispatch,
            config,
        })
    }

    /// Join the saved network and, once associated, start the voice
    /// assistant. Returns whether the node is online.
    pub async fn boot(&mut self) -> Result<bool, CoreError> {
        let connected = self
            .provisioner
            .connectivity_mut()
            .connect_to_saved()
            .await?;
        if connected {
            self.dispatch.initialize(&self.registry);
        } else {
            info!("no saved network, waiting for configuration");
        }
        Ok(connected)
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &DeviceRegistry<S> {
        &self.registry
    }

    pub fn dispatch(&self) -> &DispatchController<D, H> {
        &self.dispatch
    }

    pub fn dispatch_mut(&mut self) -> &mut DispatchController<D, H> {
        &mut self.dispatch
    }

    pub fn connectivity(&self) -> &Connectivity<R, S> {
        self.provisioner.connectivity()
    }

    // ── Devices ──────────────────────────────────────────────────────

    pub async fn add_pin_device(&mut self, name: &str, pin: u8) -> Result<StableId, CoreError> {
        self.with_dispatch_suspended(|registry| registry.add_pin_device(name, pin))
            .await
    }

    pub async fn add_url_device(&mut self, name: &str, url: &str) -> Result<StableId, CoreError> {
        self.with_dispatch_suspended(|registry| registry.add_url_device(name, url))
            .await
    }

    pub async fn remove_device(&mut self, name: &str) -> Result<Device, CoreError> {
        self.with_dispatch_suspended(|registry| registry.remove(name))
            .await
    }

    pub async fn clear_devices(&mut self) -> Result<(), CoreError> {
        self.with_dispatch_suspended(DeviceRegistry::clear).await
    }

    pub fn list_devices(&self) -> &[Device] {
        self.registry.devices()
    }

    pub fn device_count(&self) -> usize {
        self.registry.len()
    }

    /// Drop every device and the saved Wi-Fi credentials.
    pub async fn factory_reset(&mut self) -> Result<(), CoreError> {
        warn!("factory reset requested");
        self.clear_devices().await?;
        self.provisioner.connectivity().forget_credentials()
    }

    // ── Provisioning ─────────────────────────────────────────────────

    /// Suspend the voice assistant and start a provisioning session.
    pub async fn start_provisioning(&mut self) -> Step {
        self.dispatch.shutdown().await;
        let step = self.provisioner.start().await;
        self.after_step(&step);
        step
    }

    pub async fn handle_network_choice(&mut self, input: &str) -> Result<Step, CoreError> {
        let step = self.provisioner.handle_network_choice(input).await?;
        self.after_step(&step);
        Ok(step)
    }

    pub async fn handle_password(&mut self, input: &str) -> Result<Step, CoreError> {
        let step = self.provisioner.handle_password(input).await?;
        self.after_step(&step);
        Ok(step)
    }

    pub fn is_configuring(&self) -> bool {
        self.provisioner.is_configuring()
    }

    pub fn provisioning_phase(&self) -> Phase {
        self.provisioner.phase()
    }

    /// Abandon the running provisioning session.
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.provisioner.cancel();
        self.resume_dispatch();
        cancelled
    }

    pub fn network_status(&self) -> NetworkStatus {
        self.provisioner.connectivity().status()
    }

    // ── Scheduler tick ───────────────────────────────────────────────

    /// One pass of the main loop: keep the network up (outside provisioning)
    /// and dispatch whatever voice commands arrived.
    pub async fn service_once(&mut self) -> Vec<DispatchReport> {
        if !self.provisioner.is_configuring() {
            let net = self.provisioner.connectivity_mut();
            if net.check_connection(Instant::now()) == Some(false) && net.saved_ssid().is_some() {
                match net.auto_reconnect().await {
                    Ok(true) => self.resume_dispatch(),
                    Ok(false) => {}
                    Err(e) => warn!(error = %e, "automatic reconnection failed"),
                }
            }
        }
        self.dispatch.service_once(&self.registry).await
    }

    /// Shut the voice assistant down, pause, and bring it back up.
    pub async fn restart_dispatch(&mut self) {
        self.dispatch.restart(&self.registry).await;
    }

    pub async fn shutdown(&mut self) {
        self.dispatch.shutdown().await;
    }

    // ── Private helpers ──────────────────────────────────────────────

    async fn with_dispatch_suspended<T>(
        &mut self,
        mutate: impl FnOnce(&mut DeviceRegistry<S>) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let running = self.dispatch.is_initialized();
        if running {
            self.dispatch.shutdown().await;
        }
        let result = mutate(&mut self.registry);
        if running {
            self.dispatch.initialize(&self.registry);
        }
        result
    }

    fn after_step(&mut self, step: &Step) {
        if step.is_done() {
            self.resume_dispatch();
        }
    }

    /// Bring the voice assistant back once no session is running and the
    /// node is online.
    fn resume_dispatch(&mut self) {
        if self.provisioner.is_configuring() || self.dispatch.is_initialized() {
            return;
        }
        if self.provisioner.connectivity().is_connected() {
            self.dispatch.initialize(&self.registry);
        }
    }
}
