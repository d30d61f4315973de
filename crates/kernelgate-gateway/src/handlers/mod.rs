//! HTTP and WebSocket route handlers.

pub mod channels;
pub mod kernels;

use crate::error::ApiError;
use axum::Json;
use serde_json::{json, Value};

/// GET /api
pub async fn api_info() -> Json<Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fallback for unmatched routes.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Resource not found")
}
