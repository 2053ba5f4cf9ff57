//! Health check endpoints and Prometheus metrics server

use crate::metrics::collector::MetricsCollector;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Health server configuration
#[derive(Debug, Clone)]
pub struct HealthServerConfig {
    /// Port to bind the health server to
    pub port: u16,
    /// Host to bind to (typically "0.0.0.0" for all interfaces)
    pub host: String,
}

impl Default for HealthServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// Shared state for the health server
#[derive(Clone)]
struct HealthServerState {
    metrics_collector: Arc<MetricsCollector>,
}

/// Health server that provides HTTP endpoints for monitoring
pub struct HealthServer {
    config: HealthServerConfig,
    state: HealthServerState,
    shutdown_tx: broadcast::Sender<()>,
}

impl HealthServer {
    /// Create a new health server
    pub fn new(config: HealthServerConfig, metrics_collector: Arc<MetricsCollector>) -> Self {
        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

        Self {
            config,
            state: HealthServerState { metrics_collector },
            shutdown_tx,
        }
    }

    /// Start the health server
    pub async fn start(&self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid health server address")?;

        let app = self.create_router();
        let listener = TcpListener::bind(addr).await?;

        info!("Health server listening on http://{}", addr);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Health server shutdown signal received");
            })
            .await?;

        info!("Health server stopped");
        Ok(())
    }

    /// Create the Axum router with all endpoints
    fn create_router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(self.state.clone())
    }

    /// Stop the health server
    pub async fn stop(&self) -> Result<()> {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to health server: {}", e);
        }
        Ok(())
    }
}

/// Root endpoint handler - shows service information
async fn root_handler() -> impl IntoResponse {
    let info = json!({
        "service": "green-room",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/metrics"],
    });
    Json(info)
}

/// Health endpoint handler
async fn health_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let body = json!({
        "status": "healthy",
        "members_tracked": state.metrics_collector.members_tracked.get(),
        "joins_total": state.metrics_collector.joins_total.get(),
        "sweeps_total": state.metrics_collector.sweeps_total.get(),
        "event_errors_total": state.metrics_collector.event_errors_total.get(),
    });
    Json(body)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<HealthServerState>) -> impl IntoResponse {
    let metric_families = state.metrics_collector.registry().gather();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}
