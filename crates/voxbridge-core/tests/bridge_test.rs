#![allow(clippy::unwrap_used)]
// End-to-end node behaviour through the `Bridge` facade.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serial_test::serial;

use common::{FakeRadio, FakeResponder, RecordingHttp, network};
use voxbridge_core::dispatch::callbacks_enabled;
use voxbridge_core::{
    Bridge, BridgeConfig, CoreError, DiscoveryResponder, KeyValueStore, MemoryStore, Outcome,
    Phase, Step,
};

type TestBridge = Bridge<MemoryStore, FakeRadio, FakeResponder, RecordingHttp>;

// ── Helpers ─────────────────────────────────────────────────────────

fn radio() -> FakeRadio {
    FakeRadio::with_networks(vec![
        network("HomeNet", -45, false),
        network("Guest", -72, true),
    ])
    .secured("HomeNet", "correct horse")
}

fn bridge_with(store: Arc<MemoryStore>, radio: FakeRadio) -> TestBridge {
    Bridge::new(
        store,
        radio,
        FakeResponder::default(),
        RecordingHttp::default(),
        BridgeConfig::default(),
    )
    .unwrap()
}

fn saved_home(store: &MemoryStore) {
    store.put_string("wifi_ssid", "HomeNet").unwrap();
    store.put_string("wifi_pass", "correct horse").unwrap();
}

async fn online_bridge() -> (Arc<MemoryStore>, TestBridge) {
    let store = Arc::new(MemoryStore::new());
    saved_home(&store);
    let mut bridge = bridge_with(Arc::clone(&store), radio());
    assert!(bridge.boot().await.unwrap());
    (store, bridge)
}

// ── Boot ────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
#[serial]
async fn boot_without_credentials_stays_offline() {
    let store = Arc::new(MemoryStore::new());
    let mut bridge = bridge_with(store, radio());

    assert!(!bridge.boot().await.unwrap());
    assert!(!bridge.dispatch().is_initialized());
    assert!(!bridge.network_status().connected);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn boot_with_credentials_starts_dispatch() {
    let (_, bridge) = online_bridge().await;
    assert!(bridge.dispatch().is_initialized());
    assert!(callbacks_enabled());

    let status = bridge.network_status();
    assert!(status.connected);
    assert_eq!(status.ssid.as_deref(), Some("HomeNet"));
    assert_eq!(status.mac, common::NODE_MAC);
}

// ── Devices ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
#[serial]
async fn added_device_is_published_and_dispatchable() {
    let (_, mut bridge) = online_bridge().await;
    let id = bridge.add_pin_device("Lamp", 4).await.unwrap();

    let responder = bridge.dispatch().responder();
    assert_eq!(responder.names(), ["Lamp"]);
    assert_eq!(responder.table[0].1, id.as_str());
    assert!(callbacks_enabled());

    bridge.dispatch_mut().responder_mut().say("Lamp", true);
    let reports = bridge.service_once().await;
    assert_eq!(reports.len(), 1);
    assert_eq!(
        bridge.dispatch().http().calls(),
        ["http://192.168.1.100/pulsePin?pin=4"]
    );
}

#[tokio::test(start_paused = true)]
#[serial]
async fn removed_device_is_unpublished() {
    let (_, mut bridge) = online_bridge().await;
    bridge.add_pin_device("Lamp", 4).await.unwrap();
    bridge
        .add_url_device("Fan", "http://10.0.0.3/fan")
        .await
        .unwrap();

    bridge.remove_device("lamp").await.unwrap();
    assert_eq!(bridge.device_count(), 1);
    assert_eq!(bridge.dispatch().responder().names(), ["Fan"]);

    bridge.dispatch_mut().responder_mut().say("Lamp", true);
    let reports = bridge.service_once().await;
    assert_eq!(reports.len(), 1);
    assert!(bridge.dispatch().http().calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn failed_mutation_still_restores_dispatch() {
    let (_, mut bridge) = online_bridge().await;
    bridge.add_pin_device("Lamp", 4).await.unwrap();

    let err = bridge.add_pin_device("LAMP", 9).await.unwrap_err();
    assert!(matches!(err, CoreError::DuplicateName { .. }));
    assert!(bridge.dispatch().is_initialized());
    assert!(callbacks_enabled());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn restarted_dispatch_drops_stale_commands() {
    let (_, mut bridge) = online_bridge().await;
    bridge.add_pin_device("Lamp", 4).await.unwrap();

    bridge.dispatch_mut().responder_mut().say("Lamp", true);
    bridge.dispatch_mut().responder_mut().service();
    bridge.restart_dispatch().await;

    assert!(bridge.dispatch().is_initialized());
    assert!(callbacks_enabled());
    assert_eq!(bridge.dispatch().responder().starts, 1);
    assert_eq!(bridge.dispatch().responder().names(), ["Lamp"]);
    assert!(bridge.service_once().await.is_empty());
    assert!(bridge.dispatch().http().calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn devices_survive_bridge_restart() {
    let (store, mut bridge) = online_bridge().await;
    let id = bridge.add_pin_device("Lamp", 4).await.unwrap();
    drop(bridge);

    let mut bridge = bridge_with(Arc::clone(&store), radio());
    bridge.boot().await.unwrap();
    assert_eq!(bridge.list_devices()[0].stable_id, id);
    assert_eq!(
        bridge.dispatch().responder().table[0].1,
        id.as_str()
    );
}

#[tokio::test(start_paused = true)]
#[serial]
async fn factory_reset_forgets_everything() {
    let (store, mut bridge) = online_bridge().await;
    bridge.add_pin_device("Lamp", 4).await.unwrap();

    bridge.factory_reset().await.unwrap();
    assert_eq!(bridge.device_count(), 0);
    assert!(!store.contains("wifi_ssid"));
    assert!(!store.contains("wifi_pass"));
    assert!(bridge.dispatch().responder().names().is_empty());
}

// ── Provisioning ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
#[serial]
async fn provisioning_suspends_and_resumes_dispatch() {
    let store = Arc::new(MemoryStore::new());
    let mut bridge = bridge_with(Arc::clone(&store), radio());
    bridge.boot().await.unwrap();

    let step = bridge.start_provisioning().await;
    assert!(!step.is_done());
    assert!(bridge.is_configuring());
    assert!(!callbacks_enabled());

    let step = bridge.handle_network_choice("1").await.unwrap();
    assert_eq!(bridge.provisioning_phase(), Phase::AwaitingPassword);
    assert!(!step.is_done());

    let step = bridge.handle_password("correct horse").await.unwrap();
    assert!(matches!(step, Step::Finished(Outcome::Connected { .. })));
    assert!(!bridge.is_configuring());
    assert!(bridge.dispatch().is_initialized());
    assert!(callbacks_enabled());
    assert_eq!(store.get_string("wifi_ssid", ""), "HomeNet");
}

#[tokio::test(start_paused = true)]
#[serial]
async fn voice_commands_during_provisioning_are_ignored() {
    let (_, mut bridge) = online_bridge().await;
    bridge.add_pin_device("Lamp", 4).await.unwrap();
    let callback = bridge.dispatch().responder().callback.unwrap();

    bridge.start_provisioning().await;
    callback(0, "Lamp", true, 255);
    bridge.dispatch_mut().responder_mut().say("Lamp", true);
    assert!(bridge.service_once().await.is_empty());

    assert!(bridge.cancel());
    assert!(bridge.dispatch().http().calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn cancelled_provisioning_reconnects_on_next_check() {
    let (_, mut bridge) = online_bridge().await;
    bridge.service_once().await;

    bridge.start_provisioning().await;
    assert!(bridge.cancel());
    assert!(!bridge.network_status().connected);

    tokio::time::advance(std::time::Duration::from_secs(31)).await;
    bridge.service_once().await;
    assert!(bridge.network_status().connected);
    assert!(bridge.dispatch().is_initialized());
}
