//! AMQP connection management with retry logic

use crate::config::AmqpSettings;
use crate::error::{Result, RoomError};
use amqprs::channel::Channel;
use amqprs::connection::{Connection, OpenConnectionArguments};
use anyhow::Context;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Wrapper around an AMQP connection with additional metadata
pub struct AmqpConnection {
    connection: Connection,
    _settings: AmqpSettings,
}

impl AmqpConnection {
    /// Create a new AMQP connection with retry logic
    pub async fn new(settings: AmqpSettings) -> Result<Self> {
        let connection = Self::connect_with_retry(&settings).await?;

        Ok(Self {
            connection,
            _settings: settings,
        })
    }

    /// Attempt to connect with exponential backoff retry
    async fn connect_with_retry(settings: &AmqpSettings) -> Result<Connection> {
        let mut retry_count = 0;
        let mut delay = Duration::from_millis(settings.retry_delay_ms);

        loop {
            match Self::try_connect(settings).await {
                Ok(connection) => {
                    info!("Successfully connected to AMQP broker");
                    return Ok(connection);
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > settings.max_retry_attempts {
                        error!(
                            "Failed to connect to AMQP after {} retries",
                            settings.max_retry_attempts
                        );
                        return Err(RoomError::AmqpConnectionFailed {
                            message: format!("Max retries exceeded: {}", e),
                        }
                        .into());
                    }

                    warn!(
                        "AMQP connection attempt {} failed: {}. Retrying in {:?}",
                        retry_count, e, delay
                    );

                    sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as u64 * 2).min(30000));
                }
            }
        }
    }

    /// Single connection attempt
    async fn try_connect(settings: &AmqpSettings) -> Result<Connection> {
        let mut args = OpenConnectionArguments::new(
            &settings.host,
            settings.port,
            &settings.username,
            &settings.password,
        );
        args.virtual_host(&settings.vhost);

        Connection::open(&args)
            .await
            .context("Failed to open AMQP connection")
            .map_err(|e| {
                RoomError::AmqpConnectionFailed {
                    message: e.to_string(),
                }
                .into()
            })
    }

    /// Open a channel on this connection
    pub async fn open_channel(&self) -> Result<Channel> {
        self.connection
            .open_channel(None)
            .await
            .map_err(|e| {
                RoomError::AmqpConnectionFailed {
                    message: format!("Failed to open channel: {}", e),
                }
                .into()
            })
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Close the connection
    pub async fn close(self) -> Result<()> {
        self.connection
            .close()
            .await
            .context("Failed to close AMQP connection")
    }
}
