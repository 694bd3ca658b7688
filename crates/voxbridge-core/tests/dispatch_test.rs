#![allow(clippy::unwrap_used)]
// Dispatch guard and controller: callbacks in, actuator calls out.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serial_test::serial;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{FakeResponder, NODE_MAC, RecordingHttp};
use voxbridge_api::{ActuatorClient, TransportConfig};
use voxbridge_core::dispatch::callbacks_enabled;
use voxbridge_core::{
    DeviceRegistry, DispatchConfig, DispatchController, DispatchOutcome, MemoryStore,
    RegistryLimits, command_trampoline, dispatch_command,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn registry() -> DeviceRegistry<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let mut reg = DeviceRegistry::new(store, NODE_MAC, RegistryLimits::default());
    reg.add_pin_device("Lamp", 4).unwrap();
    reg.add_url_device("Fan", "http://10.0.0.9/fan/toggle").unwrap();
    reg
}

fn config() -> DispatchConfig {
    DispatchConfig {
        actuator_host: "192.168.1.100".into(),
        ..DispatchConfig::default()
    }
}

fn controller() -> DispatchController<FakeResponder, RecordingHttp> {
    DispatchController::new(FakeResponder::default(), RecordingHttp::default(), config())
}

// ── Guard ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
#[serial]
async fn new_controller_starts_disabled() {
    let reg = registry();
    let mut ctl = controller();
    assert!(!callbacks_enabled());

    for _ in 0..25 {
        command_trampoline(0, "Lamp", true, 255);
    }
    ctl.initialize(&reg);
    assert!(ctl.service_once(&reg).await.is_empty());
    assert!(ctl.http().calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn callbacks_after_shutdown_have_no_effect() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);
    ctl.shutdown().await;
    assert!(!callbacks_enabled());
    assert!(!ctl.responder().enabled);

    let callback = ctl.responder().callback.unwrap();
    for _ in 0..10 {
        callback(0, "Lamp", true, 255);
        command_trampoline(1, "Fan", false, 0);
    }
    ctl.initialize(&reg);
    assert!(ctl.service_once(&reg).await.is_empty());
    assert!(ctl.http().calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn callback_during_rebuild_is_dropped() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    ctl.responder_mut().fire_during_register = Some(("Lamp".into(), true));
    ctl.initialize(&reg);
    assert!(ctl.responder().fire_during_register.is_none());

    assert!(ctl.service_once(&reg).await.is_empty());
    assert!(ctl.http().calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn empty_device_name_is_ignored() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    ctl.responder_mut().say("", true);
    assert!(ctl.service_once(&reg).await.is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn dropping_controller_disables_callbacks() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);
    assert!(callbacks_enabled());

    drop(ctl);
    assert!(!callbacks_enabled());
    command_trampoline(0, "Lamp", true, 255);
}

#[test]
#[serial]
fn controller_serviced_from_another_thread_still_dispatches() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);
    ctl.responder_mut().say("Lamp", true);

    let (reports, calls) = std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let reports = rt.block_on(ctl.service_once(&reg));
        (reports.len(), ctl.http().calls())
    })
    .join()
    .unwrap();

    assert_eq!(reports, 1);
    assert_eq!(calls, ["http://192.168.1.100/pulsePin?pin=4"]);
    assert!(!callbacks_enabled());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
#[serial]
async fn initialize_publishes_registry_with_stable_ids() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    let responder = ctl.responder();
    assert_eq!(responder.port, Some(80));
    assert!(responder.enabled);
    assert!(responder.callback.is_some());
    assert_eq!(responder.names(), ["Lamp", "Fan"]);
    for (device, (_, id)) in reg.devices().iter().zip(&responder.table) {
        assert_eq!(device.stable_id.as_str(), id.as_str());
    }
}

#[tokio::test(start_paused = true)]
#[serial]
async fn restart_rebuilds_table_once_server_is_up() {
    let mut reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    reg.add_pin_device("Porch", 7).unwrap();
    let started = tokio::time::Instant::now();
    ctl.restart(&reg).await;

    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(ctl.responder().starts, 1);
    assert_eq!(ctl.responder().names(), ["Lamp", "Fan", "Porch"]);
    assert!(ctl.is_initialized());
    assert!(callbacks_enabled());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn shutdown_clears_flag_before_disabling_responder() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    let started = tokio::time::Instant::now();
    ctl.shutdown().await;
    assert!(started.elapsed() >= Duration::from_millis(100));
    assert!(!ctl.is_initialized());
    assert!(!ctl.responder().enabled);
}

// ── Dispatch ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
#[serial]
async fn voice_command_pulses_pin_once() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    ctl.responder_mut().say("lamp", true);
    let reports = ctl.service_once(&reg).await;

    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_success());
    assert_eq!(reports[0].device, "Lamp");
    assert_eq!(
        ctl.http().calls(),
        ["http://192.168.1.100/pulsePin?pin=4"]
    );
}

#[tokio::test(start_paused = true)]
#[serial]
async fn off_command_also_pulses() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    ctl.responder_mut().say("Lamp", false);
    let reports = ctl.service_once(&reg).await;
    assert_eq!(reports.len(), 1);
    assert!(!reports[0].state);
    assert_eq!(ctl.http().calls().len(), 1);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn url_device_calls_its_url() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    ctl.responder_mut().say("Fan", true);
    ctl.service_once(&reg).await;
    assert_eq!(ctl.http().calls(), ["http://10.0.0.9/fan/toggle"]);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn commands_in_one_tick_dispatch_in_order() {
    let reg = registry();
    let mut ctl = controller();
    ctl.initialize(&reg);

    ctl.responder_mut().say("Fan", true);
    ctl.responder_mut().say("Lamp", true);
    let reports = ctl.service_once(&reg).await;

    let devices: Vec<_> = reports.iter().map(|r| r.device.as_str()).collect();
    assert_eq!(devices, ["Fan", "Lamp"]);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn unknown_device_is_dropped() {
    let reg = registry();
    let http = RecordingHttp::default();

    let report = dispatch_command(&reg, &http, &config(), "Toaster", true).await;
    assert!(matches!(report.outcome, DispatchOutcome::UnknownDevice));
    assert!(report.target.is_none());
    assert!(http.calls().is_empty());
}

#[tokio::test(start_paused = true)]
#[serial]
async fn http_failure_is_reported_not_retried() {
    let reg = registry();
    let http = RecordingHttp {
        fail: true,
        ..RecordingHttp::default()
    };

    let report = dispatch_command(&reg, &http, &config(), "Lamp", true).await;
    assert!(matches!(report.outcome, DispatchOutcome::Failed(_)));
    assert!(!report.is_success());
    assert_eq!(http.calls().len(), 1);
    assert_eq!(reg.len(), 2);
}

#[tokio::test(start_paused = true)]
#[serial]
async fn error_status_is_a_completed_call() {
    let reg = registry();
    let http = RecordingHttp {
        status: 500,
        ..RecordingHttp::default()
    };

    let report = dispatch_command(&reg, &http, &config(), "Fan", true).await;
    assert!(!report.is_success());
    match report.outcome {
        DispatchOutcome::Completed(response) => assert_eq!(response.status, 500),
        other => panic!("unexpected outcome {other:?}"),
    }
}

// ── Real HTTP client ────────────────────────────────────────────────

#[tokio::test]
#[serial]
async fn lamp_command_hits_actuator_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pulsePin"))
        .and(query_param("pin", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pulsed 4"))
        .expect(1)
        .mount(&server)
        .await;

    let config = DispatchConfig {
        actuator_host: server.uri(),
        ..DispatchConfig::default()
    };
    let http = ActuatorClient::new(&config.actuator_host, &TransportConfig::default()).unwrap();
    let reg = registry();
    let mut ctl = DispatchController::new(FakeResponder::default(), http, config);
    ctl.initialize(&reg);

    ctl.responder_mut().say("Lamp", true);
    let reports = ctl.service_once(&reg).await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].is_success());
    match &reports[0].outcome {
        DispatchOutcome::Completed(response) => assert_eq!(response.body, "pulsed 4"),
        other => panic!("unexpected outcome {other:?}"),
    }
}
