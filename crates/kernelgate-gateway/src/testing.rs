//! Shared helpers for router and socket tests.

use crate::server::Gateway;
use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kernelgate_core::{
    Config, KernelAliasPayload, KernelChannels, KernelError, KernelId, KernelManager,
    KernelRecord, KernelResult, KernelState, SessionId,
};
use rand::Rng;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub fn test_router(manager: Arc<dyn KernelManager>) -> Router {
    Gateway::new(Config::default(), manager).router()
}

/// Serve a gateway on an ephemeral port; dropping the sender stops it.
pub async fn spawn_server(
    manager: Arc<dyn KernelManager>,
) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let gateway = Gateway::new(Config::default(), manager);
    tokio::spawn(async move {
        let _ = gateway
            .serve(listener, async {
                let _ = rx.await;
            })
            .await;
    });

    (addr, tx)
}

pub async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Bytes) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes)
}

/// Send a JSON request; an empty response body reads as `null`.
pub async fn request_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let body = body.map(|b| b.to_string());
    let (status, bytes) = request(app, method, uri, body.as_deref()).await;
    if bytes.is_empty() {
        return (status, serde_json::Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Backend that fails every operation with one error.
pub struct FailingManager {
    error: KernelError,
    ready: bool,
    removals: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FailingManager {
    pub fn new(error: KernelError) -> Self {
        Self {
            error,
            ready: false,
            removals: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Resolves every kernel but cannot open channels.
    pub fn ready_but_broken() -> Self {
        Self {
            error: KernelError::ChannelFailed("relay unavailable".to_string()),
            ready: true,
            removals: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Completed removal attempts.
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    /// Most removals observed running at the same time.
    pub fn peak_removals(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KernelManager for FailingManager {
    async fn start_kernel(&self, _payload: KernelAliasPayload) -> KernelResult<KernelRecord> {
        Err(self.error.clone())
    }

    async fn list_kernels(&self) -> KernelResult<Vec<KernelRecord>> {
        Err(self.error.clone())
    }

    async fn get_kernel(&self, _id: &KernelId, _serialize: bool) -> KernelResult<Option<KernelRecord>> {
        Err(self.error.clone())
    }

    async fn remove_kernel(&self, _id: &KernelId) -> KernelResult<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let delay = rand::thread_rng().gen_range(1..20);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.removals.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }

    fn get_kernel_sync(&self, id: &KernelId) -> KernelResult<Option<KernelRecord>> {
        if !self.ready {
            return Err(self.error.clone());
        }
        Ok(Some(KernelRecord {
            id: id.clone(),
            name: "python3".to_string(),
            created_at: chrono::Utc::now(),
            state: KernelState::Idle,
            conditions: Vec::new(),
            env: BTreeMap::new(),
            connection: None,
        }))
    }

    async fn open_channels(
        &self,
        _kernel: &KernelRecord,
        _session: &SessionId,
    ) -> KernelResult<KernelChannels> {
        Err(self.error.clone())
    }
}
