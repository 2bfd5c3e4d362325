//! HTTP handlers: the viewer socket, the bind endpoint, and JSON views of
//! registry state.

pub mod connect;
pub mod status;
pub mod ws;

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use livecast_core::ReferenceError;
use livecast_services::{ConnectAttemptLimiter, SessionError, SessionRegistry};

#[derive(Clone)]
pub struct ApiState {
    pub registry: SessionRegistry,
    pub attempts: ConnectAttemptLimiter,
    /// Served for any path no route claims.
    pub static_dir: PathBuf,
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Request-scoped failures. None of them mutate registry state.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing data")]
    MissingData,
    #[error("Invalid URL")]
    InvalidReference(#[from] ReferenceError),
    #[error("Session not found")]
    SessionNotFound(String),
    #[error("Connect failed")]
    UpstreamConnect(#[source] SessionError),
    #[error("Too many attempts")]
    TooManyAttempts,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingData | Self::InvalidReference(_) => StatusCode::BAD_REQUEST,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamConnect(_) => StatusCode::BAD_GATEWAY,
            Self::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingData => "missing_data",
            Self::InvalidReference(_) => "invalid_reference",
            Self::SessionNotFound(_) => "session_not_found",
            Self::UpstreamConnect(_) => "upstream_connect",
            Self::TooManyAttempts => "too_many_attempts",
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => Self::SessionNotFound(id),
            other => Self::UpstreamConnect(other),
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// Re-export handler functions for use in router setup.
pub use connect::{handle_connect, limit_connect_attempts};
pub use status::{handle_session_inspect, handle_status};
pub use ws::handle_ws;
