//! /api/status and /api/sessions/{id}.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use livecast_services::SessionSummary;

use super::{ApiError, ApiState};

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub session_count: usize,
    pub connection_count: usize,
    pub bound_count: usize,
    pub sessions: Vec<SessionSummary>,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let sessions = state.registry.summaries().await;
    let connection_count = sessions.iter().map(|s| s.connections).sum();
    let bound_count = sessions.iter().filter(|s| s.channel.is_some()).count();

    Json(StatusResponse {
        session_count: sessions.len(),
        connection_count,
        bound_count,
        sessions,
    })
}

// ── /sessions/{id} ───────────────────────────────────────────────────────────

pub async fn handle_session_inspect(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    let session = state
        .registry
        .session(&session_id)
        .ok_or(ApiError::SessionNotFound(session_id))?;
    Ok(Json(session.summary().await))
}
