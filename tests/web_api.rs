//! Integration tests for the HTTP surface

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt; // for .collect().await
use printbridge::adapters::{
    BroadcastNotifier, CameraManager, CloudMessage, CloudOutbox, MaterialCounter, MaterialTracker,
};
use printbridge::config::Config;
use printbridge::web::api::{AppState, AppStateInner, create_router};
use printbridge::{Adapters, EventOrchestrator, PrinterLinkListener, SessionState};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tower::util::ServiceExt; // for `oneshot`

struct TestApp {
    state: AppState,
    worker: JoinHandle<()>,
    outbox: UnboundedReceiver<CloudMessage>,
    material: Arc<MaterialCounter>,
}

async fn request(state: &AppState, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(payload) => Body::from(payload.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

impl TestApp {
    async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        request(&self.state, method, uri, body).await
    }

    /// Let the worker drain everything submitted so far.
    async fn drain(self) -> (AppState, UnboundedReceiver<CloudMessage>) {
        self.state.events.shutdown().unwrap();
        self.worker.await.unwrap();
        (self.state, self.outbox)
    }
}

fn test_app() -> TestApp {
    test_app_with(Config::default())
}

fn test_app_with(config: Config) -> TestApp {
    let notifier = BroadcastNotifier::new(config.notifier.channel_capacity);
    let material = Arc::new(MaterialCounter::new());
    let (cloud, outbox) = CloudOutbox::new();
    let adapters = Adapters {
        cloud: Arc::new(cloud),
        camera: Arc::new(CameraManager::new(&config.camera)),
        material: material.clone(),
        notifier: Arc::new(notifier.clone()),
    };
    let orchestrator = Arc::new(EventOrchestrator::new(adapters, SessionState::default()));
    let (events, worker) = orchestrator.clone().spawn();
    TestApp {
        state: Arc::new(AppStateInner {
            orchestrator,
            events,
            notifier,
            config,
        }),
        worker,
        outbox,
        material,
    }
}

async fn with_link(app: &TestApp) -> Arc<PrinterLinkListener> {
    let listener = Arc::new(PrinterLinkListener::with_sink(app.state.events.clone()));
    app.state
        .orchestrator
        .register_listener(listener.clone())
        .await
        .unwrap();
    listener
}

#[tokio::test]
async fn test_status_without_printer_link() {
    let app = test_app();
    let (status, json) = app.request("GET", "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "printbridge");
    assert_eq!(json["printing"], false);
    assert_eq!(json["operational"], false);
    assert_eq!(json["fileName"], Value::Null);
    assert_eq!(json["capabilities"], json!(["remotePrint"]));
}

#[tokio::test]
async fn test_initial_state_logged_out() {
    let app = test_app();
    let (status, json) = app.request("GET", "/api/v1/initialstate", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"], Value::Null);
    assert_eq!(json["connected"], false);
    assert_eq!(json["can_print"], false);
}

#[tokio::test]
async fn test_printer_profile_from_config() {
    let app = test_app();
    let (status, json) = app.request("GET", "/api/v1/printer-profile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["driver"], "marlin");
    assert_eq!(json["max_nozzle_temp"], 280.0);
    assert_eq!(json["max_bed_temp"], 140.0);
}

#[tokio::test]
async fn test_host_event_login_is_applied() {
    let app = test_app();
    let login = json!({
        "event": "UserLoggedIn",
        "payload": { "user_id": "u-1", "name": "Ada", "email": "ada@example.com" }
    });
    let (status, _) = app.request("POST", "/api/v1/host-events", Some(login)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = app
        .request("POST", "/api/v1/host-events", Some(json!({ "event": "Connected" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (state, _outbox) = app.drain().await;
    let (_, json) = request(&state, "GET", "/api/v1/user", None).await;
    assert_eq!(json["user"], json!({ "name": "Ada", "email": "ada@example.com" }));
    let (_, json) = request(&state, "GET", "/api/v1/initialstate", None).await;
    assert_eq!(json["can_print"], true);
}

#[tokio::test]
async fn test_host_event_rejections() {
    let app = test_app();
    let (status, json) = app
        .request("POST", "/api/v1/host-events", Some(json!({ "event": "SlicingDone" })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "Unknown event");

    let started = json!({ "event": "PrintStarted", "payload": { "name": "a.gcode" } });
    let (status, json) = app.request("POST", "/api/v1/host-events", Some(started)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("path"));
}

#[tokio::test]
async fn test_host_event_after_shutdown_is_unavailable() {
    let (state, _outbox) = test_app().drain().await;
    let (status, _) = request(
        &state,
        "POST",
        "/api/v1/host-events",
        Some(json!({ "event": "PrintDone" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_link_endpoints_need_a_listener() {
    let app = test_app();
    for (uri, body) in [
        ("/api/v1/link/state", json!({ "state": "operational" })),
        ("/api/v1/link/commands", json!({ "lines": ["G1 X1 E1"] })),
        ("/api/v1/link/progress", json!({ "completion": 10.0, "print_time": 5 })),
        ("/api/v1/link/file", json!({ "name": "a.gcode", "path": "/a.gcode" })),
    ] {
        let (status, _) = app.request("POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT, "{}", uri);
    }
}

#[tokio::test]
async fn test_link_callbacks_drive_a_print() {
    let app = test_app();
    let listener = with_link(&app).await;

    let (status, json) = app
        .request("POST", "/api/v1/link/state", Some(json!({ "state": "operational" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["events"], json!(["Connected"]));

    let file = json!({ "name": "a.gcode", "path": "/a.gcode" });
    let (status, _) = app.request("POST", "/api/v1/link/file", Some(file)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = app
        .request("POST", "/api/v1/link/state", Some(json!({ "state": "printing" })))
        .await;
    assert_eq!(json["events"], json!(["PrintStarted"]));

    let (_, json) = app.request("GET", "/api/v1/status", None).await;
    assert_eq!(json["printing"], true);
    assert_eq!(json["fileName"], "a.gcode");

    let progress = json!({ "completion": 100.0, "print_time": 3600, "print_time_left": 0 });
    let (status, _) = app.request("POST", "/api/v1/link/progress", Some(progress)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = app
        .request("POST", "/api/v1/link/state", Some(json!({ "state": "operational" })))
        .await;
    assert_eq!(json["events"], json!(["PrintDone"]));
    assert_eq!(listener.job_data().unwrap().completion, Some(100.0));

    let (state, mut outbox) = app.drain().await;
    let session = state.orchestrator.session().await;
    assert!(session.current_job().is_none());
    assert!(session.can_start_new_print());
    // Logged out the whole time
    assert!(outbox.try_recv().is_err());
}

#[tokio::test]
async fn test_sent_commands_are_counted_after_the_job_starts() {
    let app = test_app();
    let listener = with_link(&app).await;
    listener.on_state_change(printbridge::LinkState::Operational);
    listener.select_file("a.gcode", "/a.gcode");
    // The start is still queued when the first lines arrive
    let (_, json) = app
        .request("POST", "/api/v1/link/state", Some(json!({ "state": "printing" })))
        .await;
    assert_eq!(json["events"], json!(["PrintStarted"]));

    let lines = json!({ "lines": ["M83", "G1 Z0.2", "G1 X10 E2.5", "G1 E-1", "G1 E1"] });
    let (status, _) = app.request("POST", "/api/v1/link/commands", Some(lines)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let lines = json!({ "lines": ["G1 X20 E1.5"] });
    app.request("POST", "/api/v1/link/commands", Some(lines)).await;

    let material = app.material.clone();
    app.drain().await;
    // Relative mode survived the reset: 2.5 - 1 + 1 + 1.5
    assert_eq!(material.total_consumed(), 4.0);
    assert_eq!(listener.current_layer(), Some(1));
}

#[tokio::test]
async fn test_link_offline_mid_print_frees_the_printer() {
    let app = test_app();
    let listener = with_link(&app).await;
    listener.on_state_change(printbridge::LinkState::Operational);
    listener.select_file("a.gcode", "/a.gcode");
    listener.on_state_change(printbridge::LinkState::Printing);

    let (_, json) = app
        .request("POST", "/api/v1/link/state", Some(json!({ "state": "offline" })))
        .await;
    assert_eq!(json["events"], json!(["PrintFailed", "Disconnected"]));
    let (_, json) = app
        .request("POST", "/api/v1/link/state", Some(json!({ "state": "operational" })))
        .await;
    assert_eq!(json["events"], json!(["Connected"]));

    let (state, _outbox) = app.drain().await;
    let (_, json) = request(&state, "GET", "/api/v1/initialstate", None).await;
    assert_eq!(json["can_print"], true);
    assert!(state.orchestrator.session().await.current_job().is_none());
}

#[tokio::test]
async fn test_camera_status_and_timelapse() {
    let app = test_app();
    let (_, json) = app.request("GET", "/api/v1/camera", None).await;
    assert_eq!(json["connected"], false);
    let (status, json) = app.request("POST", "/api/v1/camera/timelapse", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "camera is unavailable");

    let mut config = Config::default();
    config.camera.enabled = true;
    let app = test_app_with(config);
    let (status, _) = app
        .request("POST", "/api/v1/host-events", Some(json!({ "event": "CaptureDone" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (state, _outbox) = app.drain().await;

    let (_, json) = request(&state, "GET", "/api/v1/camera", None).await;
    assert_eq!(json["connected"], true);
    let (status, _) = request(&state, "POST", "/api/v1/camera/timelapse", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = request(&state, "DELETE", "/api/v1/camera/timelapse", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    // Stopping twice is harmless
    let (status, _) = request(&state, "DELETE", "/api/v1/camera/timelapse", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}
