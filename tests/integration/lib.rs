//! Shared helpers for the kernelgate integration tests.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use kernelgate_core::{
    Config, KernelAliasPayload, KernelChannels, KernelId, KernelManager, KernelRecord,
    KernelResult, LocalKernelManager, SessionId,
};
use kernelgate_gateway::Gateway;
use rand::Rng;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;

/// A gateway served on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub async fn start(config: Config, manager: Arc<dyn KernelManager>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let gateway = Gateway::new(config, manager);
        tokio::spawn(async move {
            let _ = gateway
                .serve(listener, async {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            addr,
            _shutdown: tx,
        }
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

/// Drive one request through a router; an empty body reads as `null`.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(
            body.map(|b| Body::from(b.to_string()))
                .unwrap_or_else(Body::empty),
        )
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return (status, serde_json::Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Local manager whose removals take a random amount of time.
#[derive(Default)]
pub struct SlowRemovalManager {
    pub inner: LocalKernelManager,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SlowRemovalManager {
    pub fn completed_removals(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Most removals observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KernelManager for SlowRemovalManager {
    async fn start_kernel(&self, payload: KernelAliasPayload) -> KernelResult<KernelRecord> {
        self.inner.start_kernel(payload).await
    }

    async fn list_kernels(&self) -> KernelResult<Vec<KernelRecord>> {
        self.inner.list_kernels().await
    }

    async fn get_kernel(&self, id: &KernelId, serialize: bool) -> KernelResult<Option<KernelRecord>> {
        self.inner.get_kernel(id, serialize).await
    }

    async fn remove_kernel(&self, id: &KernelId) -> KernelResult<()> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);

        let delay = rand::thread_rng().gen_range(5..60);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let result = self.inner.remove_kernel(id).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    fn get_kernel_sync(&self, id: &KernelId) -> KernelResult<Option<KernelRecord>> {
        self.inner.get_kernel_sync(id)
    }

    async fn open_channels(
        &self,
        kernel: &KernelRecord,
        session: &SessionId,
    ) -> KernelResult<KernelChannels> {
        self.inner.open_channels(kernel, session).await
    }
}
