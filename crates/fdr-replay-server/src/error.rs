//! Error types for the replay server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for server startup.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the server from starting or serving.
#[derive(Debug, Error)]
pub enum Error {
    /// An environment variable held an unusable value
    #[error("invalid configuration {var}={value:?}: {reason}")]
    Config {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned to HTTP and WebSocket clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request named a flight key that cannot exist
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Replay(#[from] fdr_replay::Error),
}

impl From<fdr_telemetry::StoreError> for ApiError {
    fn from(e: fdr_telemetry::StoreError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Replay(fdr_replay::Error::StoreUnavailable { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Replay(fdr_replay::Error::SessionClosed(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("request failed: {}", self);
        }
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
