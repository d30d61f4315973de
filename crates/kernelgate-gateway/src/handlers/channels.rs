//! WebSocket bridge to a kernel's channels.
//!
//! GET /kernels/{id}/channels?session_id=...
//!
//! The kernel is resolved before the upgrade so a missing or unready kernel
//! is refused with a plain HTTP status. Failures after the upgrade are sent
//! as one JSON text frame followed by a close frame.

use crate::error::{WsErrorPayload, WsRejection};
use crate::handlers::kernels::routable_id;
use crate::server::GatewayState;
use crate::session::ChannelSession;
use axum::{
    extract::{
        ws::{
            close_code, rejection::WebSocketUpgradeRejection, CloseFrame, Message, WebSocket,
            WebSocketUpgrade,
        },
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kernelgate_core::{ChannelFrame, KernelError, KernelId, KernelManager, KernelRecord};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Query parameters of the channel endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ChannelParams {
    pub session_id: Option<String>,
}

/// GET /kernels/{id}/channels
pub async fn channels_handler(
    State(state): State<Arc<GatewayState>>,
    Path(kernel_id): Path<String>,
    Query(params): Query<ChannelParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let id = match routable_id(&kernel_id) {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let kernel = match resolve_kernel(state.manager.as_ref(), &id) {
        Ok(kernel) => kernel,
        Err(rejection) => return rejection.into_response(),
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let session = ChannelSession::bind(
        &kernel,
        state.manager.as_ref(),
        params.session_id.as_deref(),
    );
    let manager = state.manager.clone();

    ws.on_upgrade(move |socket| bridge(socket, manager, kernel, session))
}

/// Look up a kernel that can accept a channel connection.
fn resolve_kernel(manager: &dyn KernelManager, id: &KernelId) -> Result<KernelRecord, WsRejection> {
    match manager.get_kernel_sync(id) {
        Ok(Some(kernel)) => Ok(kernel),
        Ok(None) => Err(WsRejection::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Kernel not ready: {}", id),
        )),
        Err(KernelError::NotFound(_)) => Err(WsRejection::new(
            StatusCode::NOT_FOUND,
            format!("Kernel not found: {}", id),
        )),
        Err(e) => {
            error!(kernel_id = %id, "Failed to get kernel: {}", e);
            Err(WsRejection::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Get kernel error: {}", id),
            ))
        }
    }
}

/// Send the terminal error frame and close the socket.
async fn fail_socket(socket: &mut WebSocket, payload: WsErrorPayload) {
    if socket.send(Message::Text(payload.to_json())).await.is_err() {
        return;
    }
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: close_code::ERROR,
            reason: Cow::Owned(payload.status_message),
        })))
        .await;
}

fn to_message(frame: ChannelFrame) -> Message {
    match frame {
        ChannelFrame::Text(text) => Message::Text(text),
        ChannelFrame::Binary(data) => Message::Binary(data),
    }
}

/// Relay frames between the client socket and the kernel until either side ends.
async fn bridge(
    mut socket: WebSocket,
    manager: Arc<dyn KernelManager>,
    kernel: KernelRecord,
    mut session: ChannelSession,
) {
    if let Err(e) = session.prepare(manager.as_ref(), &kernel).await {
        let status = StatusCode::from_u16(e.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match &e {
            KernelError::NotFound(_) => format!("Kernel not found: {}", kernel.id),
            other => format!("Kernel channel error: {}", other),
        };
        fail_socket(&mut socket, WsErrorPayload::new(status, None, message)).await;
        session.close();
        return;
    }

    let Some(mut relay) = session.take_relay() else {
        return;
    };

    info!(
        kernel_id = %session.kernel_id,
        session_id = %session.session_id,
        "Channel session opened"
    );

    // A client frame waiting for kernel capacity. The socket is not read
    // again until it is delivered, while kernel frames keep draining.
    let mut pending: Option<ChannelFrame> = None;

    loop {
        tokio::select! {
            _ = relay.kernel_removed.cancelled() => {
                debug!(kernel_id = %session.kernel_id, "Kernel removed, closing socket");
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::AWAY,
                        reason: Cow::Borrowed("Kernel removed"),
                    })))
                    .await;
                break;
            }
            frame = relay.from_kernel.recv() => {
                let Some(frame) = frame else {
                    debug!(kernel_id = %session.kernel_id, "Kernel stream ended");
                    let _ = socket
                        .send(Message::Close(Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: Cow::Borrowed("Kernel stream ended"),
                        })))
                        .await;
                    break;
                };
                trace!(bytes = frame.len(), "kernel -> client");
                if let Err(e) = socket.send(to_message(frame)).await {
                    warn!(session_id = %session.session_id, "Failed to send frame: {}", e);
                    break;
                }
                session.touch();
            }
            permit = relay.to_kernel.reserve(), if pending.is_some() => {
                let Ok(permit) = permit else {
                    let payload = WsErrorPayload::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        None,
                        format!("Kernel channel error: {} stopped accepting frames", session.kernel_id),
                    );
                    fail_socket(&mut socket, payload).await;
                    break;
                };
                if let Some(frame) = pending.take() {
                    trace!(bytes = frame.len(), "client -> kernel");
                    permit.send(frame);
                }
                session.touch();
            }
            message = socket.recv(), if pending.is_none() => {
                pending = match message {
                    Some(Ok(Message::Text(text))) => Some(ChannelFrame::Text(text)),
                    Some(Ok(Message::Binary(data))) => Some(ChannelFrame::Binary(data)),
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(session_id = %session.session_id, "Client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session.session_id, "WebSocket error: {}", e);
                        break;
                    }
                };
            }
        }
    }

    drop(relay);
    session.close();
    info!(
        kernel_id = %session.kernel_id,
        session_id = %session.session_id,
        "Channel session closed"
    );
}
