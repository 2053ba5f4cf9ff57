//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the waiting
//! room, the event router, the AMQP plumbing, and the health server
//! together, and owns their startup/shutdown order.

use crate::amqp::connection::AmqpConnection;
use crate::amqp::consumer::GatewayEventConsumer;
use crate::config::AppConfig;
use crate::events::router::MembershipEventRouter;
use crate::metrics::{HealthServer, HealthServerConfig, MetricsCollector};
use crate::report::surface::{AmqpReportSurface, SurfaceConfig};
use crate::report::ReusableReport;
use crate::room::state::{RoomConfig, WaitingRoom};
use crate::room::sweeper::StaleSweeper;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("AMQP connection error: {message}")]
    AmqpConnection { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Event router owning the room and publish path
    router: Arc<MembershipEventRouter>,

    /// Reusable report handle, kept for the final empty publish
    report: Arc<ReusableReport>,

    /// AMQP connection shared by consumer and publisher channels
    amqp_connection: Arc<AmqpConnection>,

    /// Gateway event consumer, present once started
    consumer: Option<GatewayEventConsumer>,

    /// Health and metrics HTTP server
    health_server: Arc<HealthServer>,

    /// Metrics collector
    metrics: Arc<MetricsCollector>,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,
}

impl AppState {
    /// Initialize the application with all dependencies.
    ///
    /// A failed AMQP connection or metric registration is fatal here; the
    /// service refuses to start half-wired.
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing green-room waiting-list service");
        info!(
            "Configuration: service={}, amqp={}:{}, waiting='{}', active='{}'",
            config.service.name,
            config.amqp.host,
            config.amqp.port,
            config.room.waiting_channel,
            config.room.active_channel
        );

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let amqp_connection = Arc::new(
            AmqpConnection::new(config.amqp.clone())
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: e.to_string(),
                })?,
        );

        let publish_channel =
            amqp_connection
                .open_channel()
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: e.to_string(),
                })?;

        let surface = AmqpReportSurface::new(
            publish_channel,
            config.amqp.report_exchange.clone(),
            SurfaceConfig {
                max_retries: config.amqp.max_retry_attempts,
                retry_delay_ms: config.amqp.retry_delay_ms,
            },
        )
        .await
        .map_err(|e| ServiceError::AmqpConnection {
            message: e.to_string(),
        })?;

        let report = Arc::new(ReusableReport::new(Arc::new(surface)));
        let room = Arc::new(WaitingRoom::new(RoomConfig::from(&config.room)));
        let sweeper = Arc::new(Mutex::new(StaleSweeper::with_metrics(
            room.clone(),
            report.clone(),
            config.sweep_interval(),
            metrics.clone(),
        )));

        let router = Arc::new(MembershipEventRouter::new(
            room,
            report.clone(),
            sweeper,
            config.room.clone(),
            metrics.clone(),
        ));

        let health_server = Arc::new(HealthServer::new(
            HealthServerConfig {
                port: config.service.health_port,
                ..HealthServerConfig::default()
            },
            metrics.clone(),
        ));

        Ok(Self {
            config,
            router,
            report,
            amqp_connection,
            consumer: None,
            health_server,
            metrics,
            background_tasks: Vec::new(),
            is_running: Arc::new(RwLock::new(false)),
        })
    }

    /// Start the health server and begin consuming gateway events.
    ///
    /// The room stays empty until the gateway sends its `SessionReady`
    /// snapshot; the router performs the initial sync and only then starts
    /// the sweeper.
    pub async fn start(&mut self) -> Result<(), ServiceError> {
        info!("Starting green-room service");

        *self.is_running.write().await = true;

        let health_server = self.health_server.clone();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = health_server.start().await {
                warn!("Health server exited with error: {}", e);
            }
        }));

        let consume_channel =
            self.amqp_connection
                .open_channel()
                .await
                .map_err(|e| ServiceError::AmqpConnection {
                    message: e.to_string(),
                })?;

        let consumer = GatewayEventConsumer::new(self.router.clone(), consume_channel);
        consumer
            .start_consuming(&self.config.amqp.gateway_queue)
            .await
            .map_err(|e| ServiceError::AmqpConnection {
                message: e.to_string(),
            })?;
        self.consumer = Some(consumer);

        info!("Green-room service started");
        Ok(())
    }

    /// Perform graceful shutdown: stop the event intake, stop the sweeper,
    /// clear the report, then tear down the HTTP server.
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of green-room service");

        *self.is_running.write().await = false;

        if let Some(consumer) = &self.consumer {
            if let Err(e) = consumer.stop_consuming().await {
                warn!("Failed to stop gateway consumer: {}", e);
            }
        }

        self.router.stop_sweeper().await;

        if let Err(e) = self.report.set_text("").await {
            warn!("Failed to clear report message on shutdown: {}", e);
        }

        if let Err(e) = self.health_server.stop().await {
            warn!("Failed to stop health server: {}", e);
        }

        for task in self.background_tasks.drain(..) {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }

        info!(
            "Green-room service shutdown completed ({} members were tracked)",
            self.metrics.members_tracked.get()
        );
        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }
}
