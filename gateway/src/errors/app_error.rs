//! Application-level error type and its HTTP mapping.
//!
//! Only errors raised before the first response byte become an HTTP error
//! response. Once a stream has started, failures end the stream early instead
//! (see [`crate::core::relay`]).

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::core::audio::AudioError;
use crate::core::rag::RagError;
use crate::core::upstream::UpstreamError;

/// Non-standard "client closed request" status
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Errors surfaced by the HTTP handlers
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or unsupported request (e.g. `stream: false`)
    #[error("{0}")]
    Validation(String),

    /// The caller or the server cancelled the request before streaming began
    #[error("Request was cancelled")]
    Cancelled,

    #[error("Upstream error: {0}")]
    Upstream(UpstreamError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Retrieval error: {0}")]
    Rag(#[from] RagError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Cancelled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::BAD_REQUEST),
            AppError::Upstream(_)
            | AppError::Audio(_)
            | AppError::Rag(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UpstreamError> for AppError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Cancelled => AppError::Cancelled,
            other => AppError::Upstream(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
