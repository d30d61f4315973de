//! Gateway error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use kernelgate_core::{ConfigError, KernelError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors that stop the gateway server.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Body sent for errors the handlers do not map.
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Standard reason phrase for a status, or `Unknown HTTP Error`.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown HTTP Error")
}

/// HTTP-facing error: a status and a detail message.
///
/// Rendered as `{"reason": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Generic 500 for an error kind the operation does not expect.
    ///
    /// The detail is logged, never returned.
    pub fn unexpected(err: &KernelError) -> Self {
        error!(kind = err.kind(), "Unexpected kernel manager error: {}", err);
        Self::internal(UNEXPECTED_ERROR)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(status = self.status.as_u16(), "{}", self.message);

        let body = Json(json!({
            "reason": reason_phrase(self.status),
            "message": self.message,
        }));

        (self.status, body).into_response()
    }
}

/// Structured error reported on the channel endpoint.
///
/// Returned as the JSON body of a rejected upgrade, or sent as the final
/// text frame when the socket is already open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsErrorPayload {
    pub status_code: u16,
    pub status_message: String,
    pub message: String,
    pub exception: String,
}

impl WsErrorPayload {
    /// Build a payload; `reason` overrides the standard reason phrase.
    pub fn new(status: StatusCode, reason: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        let status_message = match reason {
            Some(reason) if !reason.is_empty() => reason.to_string(),
            _ => reason_phrase(status).to_string(),
        };
        let exception = format!(
            "HTTP {}: {} ({})",
            status.as_u16(),
            reason_phrase(status),
            message
        );

        let payload = Self {
            status_code: status.as_u16(),
            status_message,
            message,
            exception,
        };
        error!("WS error: {}", payload.to_json());
        payload
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }
}

/// A refused channel upgrade.
#[derive(Debug)]
pub struct WsRejection(pub WsErrorPayload);

impl WsRejection {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self(WsErrorPayload::new(status, None, message))
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for WsRejection {
    fn into_response(self) -> Response {
        (self.status(), Json(self.0)).into_response()
    }
}
