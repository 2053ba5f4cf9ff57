//! Main application configuration
//!
//! This module defines the primary configuration structures for the green-room
//! waiting-list service, including environment variable loading and validation.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub amqp: AmqpSettings,
    pub room: RoomSettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoint
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// AMQP connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmqpSettings {
    /// AMQP broker host
    pub host: String,
    /// AMQP broker port
    pub port: u16,
    /// AMQP username
    pub username: String,
    /// AMQP password
    pub password: String,
    /// AMQP virtual host
    pub vhost: String,
    /// Queue name for inbound gateway events
    pub gateway_queue: String,
    /// Exchange name for outbound report events
    pub report_exchange: String,
    /// Maximum retry attempts for failed operations
    pub max_retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Waiting-room specific settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Name of the holding channel members wait in
    pub waiting_channel: String,
    /// Name of the active channel members are called up into
    pub active_channel: String,
    /// Seconds a called member may stay away before eviction
    pub call_grace_seconds: u64,
    /// Seconds a departed member may stay away before eviction
    pub leave_grace_seconds: u64,
    /// Number of departures tolerated before a leave evicts outright
    pub grace_leaves: u32,
    /// Interval between stale-entry sweeps in seconds
    pub sweep_interval_seconds: u64,
    /// Command substring that triggers a waiting-list shuffle
    pub shuffle_command: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "green-room".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for AmqpSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
            gateway_queue: "greenroom.gateway_events".to_string(),
            report_exchange: "greenroom.report_events".to_string(),
            max_retry_attempts: 5,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            waiting_channel: "waiting-room".to_string(),
            active_channel: "on-stage".to_string(),
            call_grace_seconds: 15,
            leave_grace_seconds: 15 * 60,
            grace_leaves: 1,
            sweep_interval_seconds: 5,
            shuffle_command: "shuffle".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        if let Ok(port) = env::var("HEALTH_PORT") {
            config.service.health_port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HEALTH_PORT value: {}", port))?;
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_SECONDS") {
            config.service.shutdown_timeout_seconds = timeout
                .parse()
                .map_err(|_| anyhow!("Invalid SHUTDOWN_TIMEOUT_SECONDS value: {}", timeout))?;
        }

        // AMQP settings
        if let Ok(host) = env::var("AMQP_HOST") {
            config.amqp.host = host;
        }
        if let Ok(port) = env::var("AMQP_PORT") {
            config.amqp.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_PORT value: {}", port))?;
        }
        if let Ok(username) = env::var("AMQP_USERNAME") {
            config.amqp.username = username;
        }
        if let Ok(password) = env::var("AMQP_PASSWORD") {
            config.amqp.password = password;
        }
        if let Ok(vhost) = env::var("AMQP_VHOST") {
            config.amqp.vhost = vhost;
        }
        if let Ok(queue) = env::var("AMQP_GATEWAY_QUEUE") {
            config.amqp.gateway_queue = queue;
        }
        if let Ok(exchange) = env::var("AMQP_REPORT_EXCHANGE") {
            config.amqp.report_exchange = exchange;
        }
        if let Ok(retries) = env::var("AMQP_MAX_RETRY_ATTEMPTS") {
            config.amqp.max_retry_attempts = retries
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_MAX_RETRY_ATTEMPTS value: {}", retries))?;
        }
        if let Ok(delay) = env::var("AMQP_RETRY_DELAY_MS") {
            config.amqp.retry_delay_ms = delay
                .parse()
                .map_err(|_| anyhow!("Invalid AMQP_RETRY_DELAY_MS value: {}", delay))?;
        }

        // Room settings
        if let Ok(channel) = env::var("WAITING_CHANNEL") {
            config.room.waiting_channel = channel;
        }
        if let Ok(channel) = env::var("ACTIVE_CHANNEL") {
            config.room.active_channel = channel;
        }
        if let Ok(grace) = env::var("CALL_GRACE_SECONDS") {
            config.room.call_grace_seconds = grace
                .parse()
                .map_err(|_| anyhow!("Invalid CALL_GRACE_SECONDS value: {}", grace))?;
        }
        if let Ok(grace) = env::var("LEAVE_GRACE_SECONDS") {
            config.room.leave_grace_seconds = grace
                .parse()
                .map_err(|_| anyhow!("Invalid LEAVE_GRACE_SECONDS value: {}", grace))?;
        }
        if let Ok(leaves) = env::var("GRACE_LEAVES") {
            config.room.grace_leaves = leaves
                .parse()
                .map_err(|_| anyhow!("Invalid GRACE_LEAVES value: {}", leaves))?;
        }
        if let Ok(interval) = env::var("SWEEP_INTERVAL_SECONDS") {
            config.room.sweep_interval_seconds = interval
                .parse()
                .map_err(|_| anyhow!("Invalid SWEEP_INTERVAL_SECONDS value: {}", interval))?;
        }
        if let Ok(command) = env::var("SHUFFLE_COMMAND") {
            config.room.shuffle_command = command;
        }

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            )
        })?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| anyhow!("Failed to parse config file: {}", e))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get retry delay as Duration
    pub fn amqp_retry_delay(&self) -> Duration {
        Duration::from_millis(self.amqp.retry_delay_ms)
    }

    /// Get call grace window as Duration
    pub fn call_grace(&self) -> Duration {
        Duration::from_secs(self.room.call_grace_seconds)
    }

    /// Get leave grace window as Duration
    pub fn leave_grace(&self) -> Duration {
        Duration::from_secs(self.room.leave_grace_seconds)
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.room.sweep_interval_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }

    // Validate AMQP settings
    if config.amqp.host.is_empty() {
        return Err(anyhow!("AMQP host cannot be empty"));
    }
    if config.amqp.gateway_queue.is_empty() {
        return Err(anyhow!("AMQP gateway queue name cannot be empty"));
    }
    if config.amqp.report_exchange.is_empty() {
        return Err(anyhow!("AMQP report exchange name cannot be empty"));
    }

    // Validate room settings
    if config.room.waiting_channel.is_empty() {
        return Err(anyhow!("Waiting channel name cannot be empty"));
    }
    if config.room.active_channel.is_empty() {
        return Err(anyhow!("Active channel name cannot be empty"));
    }
    if config.room.waiting_channel == config.room.active_channel {
        return Err(anyhow!(
            "Waiting and active channels must be distinct, both are '{}'",
            config.room.waiting_channel
        ));
    }
    if config.room.call_grace_seconds == 0 {
        return Err(anyhow!("Call grace must be greater than 0"));
    }
    if config.room.leave_grace_seconds == 0 {
        return Err(anyhow!("Leave grace must be greater than 0"));
    }
    if config.room.sweep_interval_seconds == 0 {
        return Err(anyhow!("Sweep interval must be greater than 0"));
    }
    if config.room.shuffle_command.is_empty() {
        return Err(anyhow!("Shuffle command cannot be empty"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.room.call_grace_seconds, 15);
        assert_eq!(config.room.leave_grace_seconds, 900);
        assert_eq!(config.room.grace_leaves, 1);
        assert_eq!(config.room.sweep_interval_seconds, 5);
    }

    #[test]
    fn test_identical_channels_rejected() {
        let mut config = AppConfig::default();
        config.room.active_channel = config.room.waiting_channel.clone();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut config = AppConfig::default();
        config.room.sweep_interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.room.call_grace_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_channel_rejected() {
        let mut config = AppConfig::default();
        config.room.waiting_channel = String::new();
        assert!(validate_config(&config).is_err());
    }
}
