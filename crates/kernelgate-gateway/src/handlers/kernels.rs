//! Kernel lifecycle endpoints.
//!
//! POST   /kernels        - start a kernel
//! GET    /kernels        - list running kernels
//! DELETE /kernels        - remove a batch of kernels
//! GET    /kernels/{id}   - fetch one kernel
//! DELETE /kernels/{id}   - remove one kernel

use crate::error::ApiError;
use crate::server::GatewayState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::future::join_all;
use kernelgate_core::{
    KernelAliasPayload, KernelCreateRequest, KernelError, KernelId, KernelResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Body of `DELETE /kernels`.
#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub kernel_ids: Vec<String>,
}

/// Parse a path segment as a kernel id; non-matching ids are not routable.
pub(crate) fn routable_id(raw: &str) -> Result<KernelId, ApiError> {
    KernelId::from_path(raw).ok_or_else(|| ApiError::not_found("Resource not found"))
}

/// POST /kernels
pub async fn create_kernel(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<Json<KernelResponse>, ApiError> {
    let request = KernelCreateRequest::from_json(&body)
        .map_err(|e| ApiError::unprocessable(format!("Invalid request json body: {}", e)))?;
    let payload = KernelAliasPayload::from_request(&request)
        .map_err(|e| ApiError::unprocessable(format!("Invalid request json body: {}", e)))?;

    debug!(spec = payload.spec_name(), env = payload.len(), "Creating kernel");

    match state.manager.start_kernel(payload).await {
        Ok(record) => {
            info!(kernel_id = %record.id, spec = %record.name, "Kernel created");
            Ok(Json(record.to_response()))
        }
        Err(KernelError::AlreadyExists(detail)) => Err(ApiError::new(
            StatusCode::CONFLICT,
            format!("Kernel already exists: {}", detail),
        )),
        Err(KernelError::QuotaExceeded(detail)) => {
            Err(ApiError::new(StatusCode::FORBIDDEN, detail))
        }
        Err(KernelError::CreationFailed(detail)) => Err(ApiError::internal(format!(
            "Kernel creation error: {}",
            detail
        ))),
        Err(other) => Err(ApiError::unexpected(&other)),
    }
}

/// GET /kernels
pub async fn list_kernels(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<Vec<KernelResponse>>, ApiError> {
    match state.manager.list_kernels().await {
        Ok(records) => Ok(Json(records.iter().map(KernelResponse::from).collect())),
        Err(KernelError::RetrieveFailed(detail)) => {
            Err(ApiError::internal(format!("Kernel list error: {}", detail)))
        }
        Err(other) => Err(ApiError::unexpected(&other)),
    }
}

/// DELETE /kernels
///
/// Every removal runs to completion before the response is sent. The first
/// failure in request order fails the batch. Removal declares no failure
/// kinds, so any error is answered as unexpected.
pub async fn delete_kernels(
    State(state): State<Arc<GatewayState>>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let request: BulkDeleteRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request json body: {}", e)))?;

    let ids: Vec<KernelId> = request.kernel_ids.into_iter().map(KernelId::new).collect();
    debug!(count = ids.len(), "Removing kernels");

    let results = join_all(ids.iter().map(|id| state.manager.remove_kernel(id))).await;

    if let Some(err) = results.into_iter().find_map(|r| r.err()) {
        return Err(ApiError::unexpected(&err));
    }

    info!(count = ids.len(), "Kernels removed");
    Ok(StatusCode::OK)
}

/// GET /kernels/{id}
pub async fn get_kernel(
    State(state): State<Arc<GatewayState>>,
    Path(kernel_id): Path<String>,
) -> Result<Json<KernelResponse>, ApiError> {
    let id = routable_id(&kernel_id)?;

    match state.manager.get_kernel(&id, true).await {
        Ok(Some(record)) => Ok(Json(record.to_response())),
        Ok(None) => Err(ApiError::not_found(format!("Kernel not found: {}", id))),
        Err(KernelError::NotFound(detail)) => {
            Err(ApiError::not_found(format!("Kernel not found: {}", detail)))
        }
        Err(KernelError::RetrieveFailed(detail)) => Err(ApiError::internal(format!(
            "Kernel retrieve error: {}",
            detail
        ))),
        Err(other) => Err(ApiError::unexpected(&other)),
    }
}

/// DELETE /kernels/{id}
pub async fn delete_kernel(
    State(state): State<Arc<GatewayState>>,
    Path(kernel_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = routable_id(&kernel_id)?;

    state
        .manager
        .remove_kernel(&id)
        .await
        .map_err(|e| ApiError::unexpected(&e))?;

    info!(kernel_id = %id, "Kernel removed");
    Ok(StatusCode::OK)
}
