//! HTTP and WebSocket gateway server.

use crate::auth;
use crate::error::GatewayError;
use crate::handlers::{self, channels, kernels};
use crate::Result;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use kernelgate_core::config::BindMode;
use kernelgate_core::{Config, KernelManager, LocalKernelManager};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every handler.
pub struct GatewayState {
    /// Kernel lifecycle backend.
    pub manager: Arc<dyn KernelManager>,

    /// Configuration.
    pub config: Config,
}

/// The kernel gateway server.
pub struct Gateway {
    state: Arc<GatewayState>,
}

impl Gateway {
    /// Create a gateway over an existing kernel manager.
    pub fn new(config: Config, manager: Arc<dyn KernelManager>) -> Self {
        Self {
            state: Arc::new(GatewayState { manager, config }),
        }
    }

    /// Create a gateway backed by an in-process [`LocalKernelManager`].
    pub fn with_local_manager(config: Config) -> Self {
        let manager = Arc::new(LocalKernelManager::new(config.kernels.clone()));
        Self::new(config, manager)
    }

    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    /// Build the route table.
    pub fn router(&self) -> Router {
        let state = self.state.clone();
        let base = state.config.gateway.base_path.trim_end_matches('/');
        let root = if base.is_empty() { "/" } else { base };

        let api = Router::new()
            .route(root, get(handlers::api_info))
            .route(
                &format!("{base}/kernels"),
                get(kernels::list_kernels)
                    .post(kernels::create_kernel)
                    .delete(kernels::delete_kernels),
            )
            .route(
                &format!("{base}/kernels/:kernel_id"),
                get(kernels::get_kernel).delete(kernels::delete_kernel),
            )
            .route(
                &format!("{base}/kernels/:kernel_id/channels"),
                get(channels::channels_handler),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_token,
            ));

        Router::new()
            .route("/health", get(handlers::health))
            .merge(api)
            .fallback(handlers::not_found)
            .layer(TraceLayer::new_for_http())
            .layer(Self::create_cors_layer(&state.config))
            .with_state(state)
    }

    /// CORS layer built from the configured origins.
    fn create_cors_layer(config: &Config) -> CorsLayer {
        let cors = &config.gateway.cors;
        let layer = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(Duration::from_secs(cors.max_age_secs));

        if cors.allow_origins.iter().any(|o| o == "*") {
            return layer.allow_origin(Any);
        }

        let origins: Vec<HeaderValue> = cors
            .allow_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();

        layer.allow_origin(AllowOrigin::list(origins))
    }

    /// Get the bind address.
    pub fn bind_address(&self) -> SocketAddr {
        let ip = match self.state.config.gateway.bind {
            BindMode::Loopback => [127, 0, 0, 1],
            BindMode::Lan => [0, 0, 0, 0],
        };

        SocketAddr::from((ip, self.state.config.gateway.port))
    }

    /// Run the gateway until Ctrl-C.
    pub async fn run(&self) -> Result<()> {
        let addr = self.bind_address();
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        self.log_startup(addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        info!("Gateway stopped");
        Ok(())
    }

    fn log_startup(&self, addr: SocketAddr) {
        let config = &self.state.config.gateway;

        if config.bind != BindMode::Loopback {
            warn!("Gateway binding to {} is reachable from the network", addr);
        }
        if config.auth.token.is_none() {
            warn!("No auth token configured; API requests are not authenticated");
        }

        info!(
            base_path = %config.base_path,
            "Starting gateway server on {}", addr
        );
    }
}
