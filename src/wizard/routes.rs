//! REST + WebSocket endpoints exposing the wizard actions to a
//! presentation client.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{GenerationError, GenerationKind, WizardError};

use super::generation::GenerationOrchestrator;
use super::model::{Persona, ProfileUpdate, TripPlanUpdate};
use super::session::{SessionEvent, WizardSession};
use super::state::StepKind;

/// Shared state for wizard routes.
#[derive(Clone)]
pub struct WizardRouteState {
    pub session: Arc<WizardSession>,
    pub orchestrator: Arc<GenerationOrchestrator>,
}

impl WizardRouteState {
    pub fn new(orchestrator: Arc<GenerationOrchestrator>) -> Self {
        Self {
            session: Arc::clone(orchestrator.session()),
            orchestrator,
        }
    }
}

/// Build the wizard REST and WebSocket routes.
pub fn wizard_routes(state: WizardRouteState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .route("/api/session", get(get_session))
        .route("/api/session/persona", post(select_persona))
        .route("/api/session/advance", post(advance))
        .route("/api/session/back", post(back))
        .route("/api/session/profile", patch(update_profile))
        .route("/api/session/trip-plan", patch(update_trip_plan))
        .route("/api/session/generate/trip", post(generate_trip))
        .route("/api/session/generate/packing", post(generate_packing))
        .route("/api/session/start-over", post(start_over))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "vibe-booking"
    }))
}

// ── REST Endpoints ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SelectPersonaBody {
    persona: Persona,
}

async fn get_session(State(state): State<WizardRouteState>) -> Response {
    snapshot_response(&state.session).await
}

async fn select_persona(
    State(state): State<WizardRouteState>,
    Json(body): Json<SelectPersonaBody>,
) -> Response {
    match state.session.select_persona(body.persona).await {
        Ok(_) => snapshot_response(&state.session).await,
        Err(e) => wizard_error_response(e),
    }
}

async fn advance(State(state): State<WizardRouteState>) -> Response {
    match state.session.advance().await {
        Ok(_) => snapshot_response(&state.session).await,
        Err(e) => wizard_error_response(e),
    }
}

async fn back(State(state): State<WizardRouteState>) -> Response {
    match state.session.back().await {
        Ok(_) => snapshot_response(&state.session).await,
        Err(e) => wizard_error_response(e),
    }
}

async fn update_profile(
    State(state): State<WizardRouteState>,
    Json(update): Json<ProfileUpdate>,
) -> Response {
    state.session.update_profile(update).await;
    snapshot_response(&state.session).await
}

async fn update_trip_plan(
    State(state): State<WizardRouteState>,
    Json(update): Json<TripPlanUpdate>,
) -> Response {
    state.session.update_trip_plan(update).await;
    snapshot_response(&state.session).await
}

async fn generate_trip(State(state): State<WizardRouteState>) -> Response {
    let task = spawn_generation(&state.orchestrator, GenerationKind::Trip);
    generation_response(&state.session, task).await
}

async fn generate_packing(State(state): State<WizardRouteState>) -> Response {
    let task = spawn_generation(&state.orchestrator, GenerationKind::Packing);
    generation_response(&state.session, task).await
}

/// Run a generation request on its own task.
///
/// An issued request always runs to completion. A client that goes away
/// only loses the response.
fn spawn_generation(
    orchestrator: &Arc<GenerationOrchestrator>,
    kind: GenerationKind,
) -> JoinHandle<Result<StepKind, GenerationError>> {
    let orchestrator = Arc::clone(orchestrator);
    tokio::spawn(async move {
        let result = match kind {
            GenerationKind::Trip => orchestrator.request_trip_recommendation().await,
            GenerationKind::Packing => orchestrator.request_packing_recommendation().await,
        };
        if let Err(e) = &result {
            debug!(kind = %kind, error = %e, "Generation request produced no result");
        }
        result
    })
}

async fn generation_response(
    session: &WizardSession,
    task: JoinHandle<Result<StepKind, GenerationError>>,
) -> Response {
    match task.await {
        Ok(Ok(_)) => snapshot_response(session).await,
        Ok(Err(e)) => generation_error_response(e),
        Err(e) => {
            warn!(error = %e, "Generation task did not finish");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({"error": "Generation task failed"})),
            )
                .into_response()
        }
    }
}

async fn start_over(State(state): State<WizardRouteState>) -> Response {
    state.session.start_over().await;
    snapshot_response(&state.session).await
}

async fn snapshot_response(session: &WizardSession) -> Response {
    (StatusCode::OK, Json(session.snapshot().await)).into_response()
}

fn wizard_error_response(error: WizardError) -> Response {
    match error {
        WizardError::ValidationFailed { errors } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "Profile is incomplete",
                "errors": errors,
            })),
        )
            .into_response(),
        e @ WizardError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
    }
}

fn generation_error_response(error: GenerationError) -> Response {
    let status = if error.is_rejected() || matches!(error, GenerationError::Superseded { .. }) {
        StatusCode::CONFLICT
    } else {
        StatusCode::BAD_GATEWAY
    };
    let message = if status == StatusCode::BAD_GATEWAY {
        // Provider details stay in the logs.
        "Could not generate a recommendation, please try again".to_string()
    } else {
        error.to_string()
    };
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

// ── WebSocket ───────────────────────────────────────────────────────────

/// Actions a presentation client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientAction {
    SelectPersona { persona: Persona },
    Advance,
    Back,
    UpdateProfile { update: ProfileUpdate },
    UpdateTripPlan { update: TripPlanUpdate },
    GenerateTrip,
    GeneratePacking,
    StartOver,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<WizardRouteState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: WizardRouteState) {
    info!(session_id = %state.session.id(), "WebSocket client connected");

    // Subscribe before the initial sync so no event falls in between.
    let mut rx = state.session.subscribe();

    if !send_sync(&mut socket, &state.session).await {
        warn!("Failed to send initial sync, client disconnected");
        return;
    }

    loop {
        tokio::select! {
            // Forward session events to this client
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        if !send_event(&mut socket, &event).await {
                            debug!("Client disconnected during send");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(missed = n, "WS client lagged behind broadcast");
                        if !send_sync(&mut socket, &state.session).await {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!("Broadcast channel closed");
                        break;
                    }
                }
            }

            // Receive actions from client
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(&text, &state).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn send_sync(socket: &mut WebSocket, session: &WizardSession) -> bool {
    let sync = SessionEvent::SessionSync {
        snapshot: Box::new(session.snapshot().await),
    };
    send_event(socket, &sync).await
}

async fn send_event(socket: &mut WebSocket, event: &SessionEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to serialize session event");
            true
        }
    }
}

/// Apply one client action. Outcomes reach the client as session events.
async fn handle_client_message(text: &str, state: &WizardRouteState) {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            debug!(error = %e, text = text, "Unrecognized WS message from client");
            return;
        }
    };

    let session = &state.session;
    match action {
        ClientAction::SelectPersona { persona } => {
            if let Err(e) = session.select_persona(persona).await {
                debug!(error = %e, "Persona selection rejected via WS");
            }
        }
        ClientAction::Advance => {
            if let Err(e) = session.advance().await {
                debug!(error = %e, "Advance rejected via WS");
            }
        }
        ClientAction::Back => {
            if let Err(e) = session.back().await {
                debug!(error = %e, "Back rejected via WS");
            }
        }
        ClientAction::UpdateProfile { update } => {
            session.update_profile(update).await;
        }
        ClientAction::UpdateTripPlan { update } => {
            session.update_trip_plan(update).await;
        }
        // Outcomes arrive as events, so the socket loop does not wait.
        ClientAction::GenerateTrip => {
            drop(spawn_generation(&state.orchestrator, GenerationKind::Trip));
        }
        ClientAction::GeneratePacking => {
            drop(spawn_generation(&state.orchestrator, GenerationKind::Packing));
        }
        ClientAction::StartOver => {
            session.start_over().await;
        }
    }
}
