//! Report surface boundary
//!
//! The surface is where rendered output becomes externally visible. The AMQP
//! implementation publishes `ReportAction` envelopes for a downstream chat
//! adapter to apply against the actual report message; the mock records
//! actions for tests.

use crate::amqp::messages::{MessageEnvelope, REPLY_ROUTING_KEY, REPORT_ROUTING_KEY};
use crate::error::{Result, RoomError};
use crate::types::ReportAction;
use amqprs::{
    channel::{BasicPublishArguments, Channel, ExchangeDeclareArguments},
    BasicProperties,
};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Trait for applying actions to the report surface
#[async_trait]
pub trait ReportSurface: Send + Sync {
    /// Create the report message with the given text
    async fn create(&self, text: &str) -> Result<()>;

    /// Edit the report message in place
    async fn edit(&self, text: &str) -> Result<()>;

    /// Delete the report message
    async fn delete(&self) -> Result<()>;

    /// Post a one-off reply to a command
    async fn reply(&self, text: &str) -> Result<()>;
}

/// Configuration for report publishing
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
        }
    }
}

/// AMQP-based report surface implementation
pub struct AmqpReportSurface {
    channel: Channel,
    exchange: String,
    config: SurfaceConfig,
}

impl AmqpReportSurface {
    /// Create a new surface publishing to the given exchange
    pub async fn new(channel: Channel, exchange: String, config: SurfaceConfig) -> Result<Self> {
        let surface = Self {
            channel,
            exchange,
            config,
        };
        surface.setup_exchange().await?;
        Ok(surface)
    }

    /// Declare the report events exchange
    async fn setup_exchange(&self) -> Result<()> {
        let args = ExchangeDeclareArguments::new(&self.exchange, "topic");
        self.channel.exchange_declare(args).await.map_err(|e| {
            RoomError::AmqpConnectionFailed {
                message: format!("Failed to declare report exchange: {}", e),
            }
        })?;

        info!("Successfully set up report exchange '{}'", self.exchange);
        Ok(())
    }

    /// Publish an action with retry logic
    async fn publish_action(&self, action: ReportAction, routing_key: &str) -> Result<()> {
        let envelope = MessageEnvelope::new(action, routing_key.to_string());

        let mut retry_count = 0;
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);

        loop {
            match self.try_publish(&envelope).await {
                Ok(_) => {
                    debug!(
                        "Published report action {} to exchange {}",
                        envelope.correlation_id, self.exchange
                    );
                    return Ok(());
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count > self.config.max_retries {
                        error!(
                            "Failed to publish report action {} after {} retries: {}",
                            envelope.correlation_id, self.config.max_retries, e
                        );
                        return Err(e);
                    }

                    warn!(
                        "Publish attempt {} failed for action {}: {}. Retrying in {:?}",
                        retry_count, envelope.correlation_id, e, delay
                    );

                    sleep(delay).await;
                    delay = Duration::from_millis((delay.as_millis() as u64 * 2).min(5000));
                }
            }
        }
    }

    /// Single publish attempt
    async fn try_publish(&self, envelope: &MessageEnvelope<ReportAction>) -> Result<()> {
        let payload = envelope.to_bytes()?;

        let args = BasicPublishArguments::new(&self.exchange, &envelope.routing_key);
        let mut properties = BasicProperties::default();
        properties
            .with_message_id(&envelope.correlation_id)
            .with_timestamp(envelope.timestamp.timestamp() as u64)
            .with_content_type("application/json");

        self.channel
            .basic_publish(properties, payload, args)
            .await
            .map_err(|e| RoomError::ReportPublishFailed {
                message: format!("Failed to publish report action: {}", e),
            })?;

        Ok(())
    }
}

#[async_trait]
impl ReportSurface for AmqpReportSurface {
    async fn create(&self, text: &str) -> Result<()> {
        self.publish_action(
            ReportAction::Create {
                text: text.to_string(),
            },
            REPORT_ROUTING_KEY,
        )
        .await
    }

    async fn edit(&self, text: &str) -> Result<()> {
        self.publish_action(
            ReportAction::Edit {
                text: text.to_string(),
            },
            REPORT_ROUTING_KEY,
        )
        .await
    }

    async fn delete(&self) -> Result<()> {
        self.publish_action(ReportAction::Delete {}, REPORT_ROUTING_KEY)
            .await
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.publish_action(
            ReportAction::Reply {
                text: text.to_string(),
            },
            REPLY_ROUTING_KEY,
        )
        .await
    }
}

/// Mock report surface for testing
#[derive(Debug, Default)]
pub struct MockReportSurface {
    actions: std::sync::Mutex<Vec<ReportAction>>,
}

impl MockReportSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded actions (for testing)
    pub fn recorded_actions(&self) -> Vec<ReportAction> {
        self.actions
            .lock()
            .map(|actions| actions.clone())
            .unwrap_or_default()
    }

    /// Latest visible report text, following create/edit/delete semantics
    pub fn visible_text(&self) -> Option<String> {
        let mut visible = None;
        for action in self.recorded_actions() {
            match action {
                ReportAction::Create { text } | ReportAction::Edit { text } => {
                    visible = Some(text);
                }
                ReportAction::Delete {} => visible = None,
                ReportAction::Reply { .. } => {}
            }
        }
        visible
    }

    /// Replies posted so far (for testing)
    pub fn replies(&self) -> Vec<String> {
        self.recorded_actions()
            .into_iter()
            .filter_map(|action| match action {
                ReportAction::Reply { text } => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Clear recorded actions (for testing)
    pub fn clear(&self) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.clear();
        }
    }

    fn record(&self, action: ReportAction) {
        if let Ok(mut actions) = self.actions.lock() {
            actions.push(action);
        }
    }
}

#[async_trait]
impl ReportSurface for MockReportSurface {
    async fn create(&self, text: &str) -> Result<()> {
        self.record(ReportAction::Create {
            text: text.to_string(),
        });
        Ok(())
    }

    async fn edit(&self, text: &str) -> Result<()> {
        self.record(ReportAction::Edit {
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        self.record(ReportAction::Delete {});
        Ok(())
    }

    async fn reply(&self, text: &str) -> Result<()> {
        self.record(ReportAction::Reply {
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_config_default() {
        let config = SurfaceConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay_ms, 500);
    }

    #[tokio::test]
    async fn test_mock_surface_tracks_visible_text() {
        let surface = MockReportSurface::new();
        surface.create("1. alice").await.unwrap();
        surface.edit("1. alice\n2. bob").await.unwrap();
        assert_eq!(surface.visible_text().as_deref(), Some("1. alice\n2. bob"));

        surface.delete().await.unwrap();
        assert_eq!(surface.visible_text(), None);
    }

    // Note: Integration tests with an actual AMQP broker would go in the
    // tests/ directory.
}
