//! Token authentication for API routes.

use crate::error::ApiError;
use crate::server::GatewayState;
use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract the token a request presents.
///
/// Accepts `Authorization: token <t>`, `Authorization: Bearer <t>` or a
/// `?token=<t>` query parameter. The header wins when both are present.
pub fn presented_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some((scheme, token)) = value.trim().split_once(' ') {
            if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
                return Some(token.trim().to_string());
            }
        }
    }

    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Reject requests without the configured token.
///
/// Passes everything through when no token is configured.
pub async fn require_token(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.gateway.auth.token.as_ref() else {
        return next.run(request).await;
    };

    match presented_token(request.headers(), request.uri()) {
        Some(token) if expected.matches(&token) => next.run(request).await,
        Some(_) => {
            warn!(path = %request.uri().path(), "Rejected request with invalid token");
            ApiError::unauthorized("Invalid authentication token").into_response()
        }
        None => {
            warn!(path = %request.uri().path(), "Rejected unauthenticated request");
            ApiError::unauthorized("Authentication required").into_response()
        }
    }
}
