//! POST /connect: bind a live channel to a viewer session.

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use livecast_core::ChannelId;

use super::{ApiError, ApiState};

#[derive(Debug, Default, Deserialize)]
pub struct ConnectRequest {
    #[serde(default, alias = "reference")]
    pub url: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

pub async fn handle_connect(
    State(state): State<ApiState>,
    body: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<ConnectResponse>, ApiError> {
    // An unreadable body is reported the same way as an empty one.
    let Json(req) = body.map_err(|_| ApiError::MissingData)?;
    let (Some(reference), Some(session_id)) = (non_empty(req.url), non_empty(req.session_id)) else {
        return Err(ApiError::MissingData);
    };

    let channel = ChannelId::from_reference(&reference)?;

    tracing::info!(session_id = %session_id, channel = %channel, "bind requested");
    state.registry.bind_upstream(&session_id, channel).await?;
    Ok(Json(ConnectResponse { success: true }))
}

/// Route layer for /connect: caps bind attempts per caller address.
pub async fn limit_connect_attempts(
    State(state): State<ApiState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    if !state.attempts.check(peer.ip()) {
        return ApiError::TooManyAttempts.into_response();
    }
    next.run(req).await
}
