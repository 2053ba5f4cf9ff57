//! Main entry point for the green-room waiting-list service
//!
//! This is the production entry point that initializes and runs the
//! service with proper error handling, logging, and graceful shutdown.

use anyhow::Result;
use clap::Parser;
use green_room::config::AppConfig;
use green_room::service::AppState;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};

/// Green Room - live waiting-list service
#[derive(Parser)]
#[command(
    name = "green-room",
    version,
    about = "A live waiting-list service that calls participants up from a holding channel",
    long_about = "Green Room tracks who is waiting to be called up from a holding channel into \
                 an active channel, tolerates brief departures, sweeps out members whose grace \
                 has expired, and keeps a single status-report message up to date."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Health/metrics port override
    #[arg(long, value_name = "PORT", help = "Override health server port")]
    health_port: Option<u16>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("Green Room waiting-list service");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Health port: {}", config.service.health_port);
    info!("   AMQP: {}:{}", config.amqp.host, config.amqp.port);
    info!("   Waiting channel: {}", config.room.waiting_channel);
    info!("   Active channel: {}", config.room.active_channel);
    info!(
        "   Grace: call {}s, leave {}s, {} grace leave(s)",
        config.room.call_grace_seconds, config.room.leave_grace_seconds, config.room.grace_leaves
    );
    info!("   Sweep interval: {}s", config.room.sweep_interval_seconds);
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(health_port) = args.health_port {
        config.service.health_port = health_port;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration errors are fatal; the service must not serve half-configured
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting service...");
    if let Err(e) = app_state.start().await {
        error!("Failed to start service: {}", e);
        std::process::exit(1);
    }

    info!("Green Room is running, press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("Shutdown signal received, beginning graceful shutdown...");

    let shutdown_timeout = config.shutdown_timeout();
    match tokio::time::timeout(shutdown_timeout, app_state.shutdown()).await {
        Ok(Ok(())) => {
            info!("Graceful shutdown completed successfully");
        }
        Ok(Err(e)) => {
            warn!("Shutdown finished with error: {}", e);
        }
        Err(_) => {
            warn!("Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("Green Room waiting-list service stopped");
    Ok(())
}
