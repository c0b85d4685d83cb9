//! Axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use blaze_node::BlazeService;

use crate::error::RpcError;
use crate::{events, handlers, stream};

/// How often balance and notification streams re-read the store.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shared handler state.
#[derive(Clone)]
pub struct RpcState {
    pub service: Arc<BlazeService>,
    /// Shared secret for chainhook deliveries and manual sweeps; `None`
    /// refuses both.
    pub events_secret: Option<Arc<str>>,
    pub poll_interval: Duration,
}

impl RpcState {
    pub fn new(service: Arc<BlazeService>, events_secret: Option<String>) -> Self {
        Self {
            service,
            events_secret: events_secret.map(Arc::from),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The `Authorization` header must carry the secret, bare or as a bearer token.
    pub fn authorize(&self, headers: &HeaderMap) -> Result<(), RpcError> {
        let Some(secret) = self.events_secret.as_deref() else {
            return Err(RpcError::Forbidden);
        };
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let token = presented.strip_prefix("Bearer ").unwrap_or(presented);
        if token.is_empty() || token != secret {
            return Err(RpcError::Forbidden);
        }
        Ok(())
    }
}

/// Build the full route table. `/metrics` is only mounted when enabled.
pub fn router(state: RpcState, enable_metrics: bool) -> Router {
    let api = Router::new()
        .route("/xfer", post(handlers::xfer))
        .route("/balance", get(handlers::balance))
        .route("/balance-stream", get(stream::balance_stream))
        .route("/balance-updates", get(handlers::balance_updates))
        .route("/notifications", get(handlers::notifications))
        .route("/notifications/read", post(handlers::mark_read))
        .route("/notifications/delete", post(handlers::delete_notifications))
        .route("/notifications/stream", get(stream::notification_stream))
        .route("/transfers", get(handlers::transfers))
        .route("/queues", get(handlers::queues))
        .route("/process", post(handlers::process))
        .route("/events", post(events::chainhook));

    let mut app = Router::new()
        .nest("/api/v0/blaze", api)
        .route("/health", get(handlers::health));
    if enable_metrics {
        app = app.route("/metrics", get(handlers::metrics));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

/// The HTTP server, bound to one address.
pub struct RpcServer {
    pub addr: SocketAddr,
    state: RpcState,
    enable_metrics: bool,
}

impl RpcServer {
    pub fn new(addr: SocketAddr, state: RpcState, enable_metrics: bool) -> Self {
        Self {
            addr,
            state,
            enable_metrics,
        }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state, self.enable_metrics);
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "blaze API listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
