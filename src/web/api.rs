//! Defines the Axum API routes and handlers.
//!
//! Read-only status endpoints query the orchestrator; the inbound endpoints
//! let the host push its event bus notifications and printer link callbacks.
//! `/api/v1/events` streams client notifications as server-sent events.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures_util::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::adapters::{AdapterError, BroadcastNotifier};
use crate::config::Config;
use crate::event::{Event, HostEvent};
use crate::listener::{LinkState, PrintFile, PrinterLinkListener};
use crate::orchestrator::{EventOrchestrator, OrchestratorHandle};
use crate::web::models::{
    BoxStatusResponse, CameraStatusResponse, InitialStateResponse, LinkStateRequest,
    LinkStateResponse, PrinterProfileResponse, ProgressRequest, SentCommandsRequest, UserInfo,
    UserResponse,
};

/// Helper to create a JSON error response with a message and status code
fn json_error(message: &str, status: StatusCode) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

pub struct AppStateInner {
    pub orchestrator: Arc<EventOrchestrator>,
    pub events: OrchestratorHandle,
    pub notifier: BroadcastNotifier,
    pub config: Config,
}
pub type AppState = Arc<AppStateInner>;

/// Creates the Axum router with all the API endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/status", get(get_status))
        .route("/api/v1/initialstate", get(initial_state))
        .route("/api/v1/user", get(logged_user))
        .route("/api/v1/camera", get(camera_status))
        .route(
            "/api/v1/camera/timelapse",
            post(start_timelapse).delete(stop_timelapse),
        )
        .route("/api/v1/printer-profile", get(printer_profile))
        .route("/api/v1/events", get(client_events))
        .route("/api/v1/host-events", post(host_event))
        .route("/api/v1/link/state", post(link_state))
        .route("/api/v1/link/commands", post(link_commands))
        .route("/api/v1/link/progress", post(link_progress))
        .route("/api/v1/link/file", post(link_file))
        .with_state(state)
}

/// Handler to get the current status of the box.
async fn get_status(State(state): State<AppState>) -> Json<BoxStatusResponse> {
    let listener = state.orchestrator.listener().await;
    let link = listener.as_ref().map(|l| l.state()).unwrap_or_default();
    let printing = link == LinkState::Printing;
    let file_name = if printing {
        listener.and_then(|l| l.selected_file()).map(|f| f.name)
    } else {
        None
    };
    let camera = state.orchestrator.camera();
    let mut capabilities = vec!["remotePrint".to_string()];
    capabilities.extend(camera.capabilities());
    Json(BoxStatusResponse {
        name: state.config.printer_name().to_string(),
        printing,
        paused: link == LinkState::Paused,
        operational: link.is_operational(),
        file_name,
        camera: camera.is_active(),
        remote_print: true,
        capabilities,
    })
}

async fn initial_state(State(state): State<AppState>) -> Json<InitialStateResponse> {
    let session = state.orchestrator.session().await;
    Json(InitialStateResponse {
        user: session.identity().map(UserInfo::from),
        connected: state.orchestrator.camera().is_active(),
        can_print: session.can_start_new_print(),
    })
}

async fn logged_user(State(state): State<AppState>) -> Json<UserResponse> {
    let session = state.orchestrator.session().await;
    Json(UserResponse {
        user: session.identity().map(UserInfo::from),
    })
}

/// Re-checks the camera before answering.
async fn camera_status(State(state): State<AppState>) -> Json<CameraStatusResponse> {
    Json(CameraStatusResponse {
        connected: state.orchestrator.camera().check_status(),
    })
}

async fn start_timelapse(State(state): State<AppState>) -> Response {
    match state.orchestrator.camera().start_timelapse().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(AdapterError::Unavailable(what)) => {
            json_error(&format!("{} is unavailable", what), StatusCode::CONFLICT)
        }
        Err(e) => json_error(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn stop_timelapse(State(state): State<AppState>) -> Response {
    match state.orchestrator.camera().stop_timelapse().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => json_error(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn printer_profile(State(state): State<AppState>) -> Json<PrinterProfileResponse> {
    Json(PrinterProfileResponse {
        driver: "marlin".to_string(),
        max_nozzle_temp: state.config.printer.max_nozzle_temp,
        max_bed_temp: state.config.printer.max_bed_temp,
    })
}

/// Stream client notifications. Lagging clients skip what they missed.
async fn client_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let mut rx = state.notifier.subscribe();
    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(message) => match SseEvent::default().event(message.event.clone()).json_data(&message) {
                    Ok(event) => yield Ok(event),
                    Err(e) => tracing::warn!("Failed to encode client message: {}", e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Client fell behind the notification stream");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handler for host event bus notifications.
async fn host_event(State(state): State<AppState>, Json(payload): Json<HostEvent>) -> Response {
    match Event::from_host(&payload.event, &payload.payload) {
        Ok(Some(event)) => submit(&state, event),
        Ok(None) => json_error("Unknown event", StatusCode::UNPROCESSABLE_ENTITY),
        Err(e) => json_error(&e.to_string(), StatusCode::BAD_REQUEST),
    }
}

fn submit(state: &AppState, event: Event) -> Response {
    match state.events.submit(event) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => json_error(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn registered_link(state: &AppState) -> Result<Arc<PrinterLinkListener>, Response> {
    state
        .orchestrator
        .listener()
        .await
        .ok_or_else(|| json_error("Printer link is not registered", StatusCode::CONFLICT))
}

async fn link_state(State(state): State<AppState>, Json(payload): Json<LinkStateRequest>) -> Response {
    let listener = match registered_link(&state).await {
        Ok(listener) => listener,
        Err(response) => return response,
    };
    let events = listener.on_state_change(payload.state);
    (
        StatusCode::ACCEPTED,
        Json(LinkStateResponse {
            events: events.iter().map(|e| e.name().to_string()).collect(),
        }),
    )
        .into_response()
}

/// Sent lines are queued behind any pending events, so a job start is
/// applied before its first commands are counted.
async fn link_commands(
    State(state): State<AppState>,
    Json(payload): Json<SentCommandsRequest>,
) -> Response {
    if let Err(response) = registered_link(&state).await {
        return response;
    }
    match state.events.observe_commands(payload.lines) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => json_error(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE),
    }
}

async fn link_progress(State(state): State<AppState>, Json(payload): Json<ProgressRequest>) -> Response {
    match registered_link(&state).await {
        Ok(listener) => {
            listener.on_progress(payload.completion, payload.print_time, payload.print_time_left);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(response) => response,
    }
}

async fn link_file(State(state): State<AppState>, Json(payload): Json<PrintFile>) -> Response {
    match registered_link(&state).await {
        Ok(listener) => {
            listener.select_file(&payload.name, &payload.path);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(response) => response,
    }
}
