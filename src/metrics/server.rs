//! HTTP server for the Prometheus endpoint and the latest session state.

use super::{MetricsRegistry, MetricsSnapshot};
use crate::session::{SessionState, SessionStats};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    /// The server stopped with an error.
    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Creates a loopback config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], port).into(),
        }
    }
}

/// Shared state behind the server.
///
/// Sessions are single-threaded, so their owner pushes state in here with
/// [`publish`](Self::publish) instead of the server reading the session.
pub struct MetricsState {
    registry: MetricsRegistry,
    latest: Option<SessionState>,
}

impl MetricsState {
    /// Records a session's published state and counters.
    pub fn publish(&mut self, state: &SessionState, stats: &SessionStats) {
        self.registry
            .update(&MetricsSnapshot::from_session(state, stats));
        self.latest = Some(state.clone());
    }

    /// Returns the last published session state.
    pub fn latest(&self) -> Option<&SessionState> {
        self.latest.as_ref()
    }
}

type SharedState = Arc<RwLock<MetricsState>>;

/// HTTP server exposing `/metrics`, `/state` and `/health`.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: SharedState,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(MetricsState {
                registry,
                latest: None,
            })),
        }
    }

    /// Returns the shared state for pushing updates.
    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Runs the HTTP server until it fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/state", get(state_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))
    }
}

async fn metrics_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;

    match state.registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}"),
        ),
    }
}

async fn state_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;

    match state.latest().map(toml::to_string) {
        Some(Ok(body)) => (StatusCode::OK, body),
        Some(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode state: {e}"),
        ),
        None => (StatusCode::SERVICE_UNAVAILABLE, "no session state yet".into()),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
