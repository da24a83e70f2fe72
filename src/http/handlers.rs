use super::state::AppState;
use crate::orchestrator::{ActionOutcome, InteractionEvent, RejectReason};
use crate::session::Snapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub accepted: bool,

    /// Why the action was ignored, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub snapshot: Snapshot,
}

fn action_response(outcome: ActionOutcome, snapshot: Snapshot) -> impl IntoResponse {
    match outcome {
        ActionOutcome::Accepted => (
            StatusCode::OK,
            Json(ActionResponse {
                accepted: true,
                reason: None,
                message: None,
                snapshot,
            }),
        ),
        ActionOutcome::Rejected(reason) => (
            StatusCode::CONFLICT,
            Json(ActionResponse {
                accepted: false,
                reason: Some(reason),
                message: Some(reason.to_string()),
                snapshot,
            }),
        ),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /interaction/begin
/// Start a new interaction (request permission, then record)
pub async fn begin(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.orchestrator.begin().await;
    info!("begin -> {:?}", outcome);
    action_response(outcome, state.orchestrator.snapshot())
}

/// POST /interaction/end
/// Stop recording and run transcription → generation → speech
pub async fn end(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.orchestrator.end().await;
    info!("end -> {:?}", outcome);
    action_response(outcome, state.orchestrator.snapshot())
}

/// POST /interaction/replay
/// Speak the last answer again
pub async fn replay(State(state): State<AppState>) -> impl IntoResponse {
    let outcome = state.orchestrator.replay().await;
    info!("replay -> {:?}", outcome);
    action_response(outcome, state.orchestrator.snapshot())
}

/// GET /interaction/status
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.orchestrator.snapshot()))
}

/// GET /interaction/events
/// Server-sent events, one JSON `InteractionEvent` per message
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let rx = state.orchestrator.subscribe();

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let item = Event::default()
                        .event(event_name(&event))
                        .json_data(&event);
                    return Some((item, rx));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn event_name(event: &InteractionEvent) -> &'static str {
    match event {
        InteractionEvent::StateChanged { .. } => "state_changed",
        InteractionEvent::Transcript { .. } => "transcript",
        InteractionEvent::Answer { .. } => "answer",
        InteractionEvent::Failed { .. } => "failed",
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
