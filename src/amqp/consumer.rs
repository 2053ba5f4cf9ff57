//! Gateway-event consumer
//!
//! Consumes raw gateway messages from the inbound queue, deserializes and
//! validates them, and dispatches to an `EventHandler`. Mirrors the
//! publish side in `crate::report::surface`.

use crate::amqp::messages::MessageUtils;
use crate::error::{Result, RoomError};
use crate::types::GatewayEvent;
use amqprs::{
    channel::{BasicCancelArguments, BasicConsumeArguments, Channel, QueueDeclareArguments},
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Trait defining the interface for handling gateway events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle a gateway event
    async fn handle_event(&self, event: GatewayEvent) -> Result<()>;

    /// Handle processing errors
    async fn handle_error(&self, error: RoomError, message_data: &[u8]);
}

/// Consumer for gateway event messages
pub struct GatewayEventConsumer {
    handler: Arc<dyn EventHandler>,
    channel: Channel,
    consumer_tag: String,
}

impl GatewayEventConsumer {
    /// Create a new gateway event consumer
    pub fn new(handler: Arc<dyn EventHandler>, channel: Channel) -> Self {
        let consumer_tag = format!("gateway-consumer-{}", crate::utils::generate_correlation_id());

        Self {
            handler,
            channel,
            consumer_tag,
        }
    }

    /// Declare the queue and start consuming messages from it
    pub async fn start_consuming(&self, queue_name: &str) -> Result<()> {
        let declare_args = QueueDeclareArguments::durable_client_named(queue_name);
        self.channel
            .queue_declare(declare_args)
            .await
            .map_err(|e| RoomError::AmqpConnectionFailed {
                message: format!("Failed to declare gateway queue: {}", e),
            })?;

        let args = BasicConsumeArguments::new(queue_name, &self.consumer_tag);

        self.channel
            .basic_consume(EventConsumer::new(self.handler.clone()), args)
            .await
            .map_err(|e| RoomError::AmqpConnectionFailed {
                message: format!("Failed to start consuming: {}", e),
            })?;

        info!("Started consuming gateway events from queue: {}", queue_name);
        Ok(())
    }

    /// Stop consuming messages
    pub async fn stop_consuming(&self) -> Result<()> {
        let args = BasicCancelArguments::new(&self.consumer_tag);

        self.channel
            .basic_cancel(args)
            .await
            .map_err(|e| RoomError::AmqpConnectionFailed {
                message: format!("Failed to stop consuming: {}", e),
            })?;

        info!("Stopped consuming gateway events");
        Ok(())
    }
}

/// Internal consumer implementation
struct EventConsumer {
    handler: Arc<dyn EventHandler>,
}

impl EventConsumer {
    fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self { handler }
    }

    /// Process an incoming message
    async fn process_message(&self, content: &[u8]) -> Result<()> {
        let event = MessageUtils::deserialize_gateway_event(content)?;
        debug!("Gateway event parsed: {:?}", event);
        self.handler.handle_event(event).await?;
        Ok(())
    }
}

#[async_trait]
impl AsyncConsumer for EventConsumer {
    async fn consume(
        &mut self,
        _channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        let delivery_tag = deliver.delivery_tag();
        debug!(
            "Gateway message received - delivery_tag: {}, size: {} bytes",
            delivery_tag,
            content.len()
        );

        if let Err(e) = self.process_message(&content).await {
            error!(
                "Gateway message processing failed - delivery_tag: {}, error: {}",
                delivery_tag, e
            );
            self.handler
                .handle_error(
                    RoomError::InternalError {
                        message: e.to_string(),
                    },
                    &content,
                )
                .await;
        }
    }
}

/// Mock event handler for testing
pub struct MockEventHandler {
    pub received_events: Arc<tokio::sync::Mutex<Vec<GatewayEvent>>>,
}

impl Default for MockEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEventHandler {
    pub fn new() -> Self {
        Self {
            received_events: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl EventHandler for MockEventHandler {
    async fn handle_event(&self, event: GatewayEvent) -> Result<()> {
        let mut events = self.received_events.lock().await;
        events.push(event);
        Ok(())
    }

    async fn handle_error(&self, error: RoomError, _message_data: &[u8]) {
        eprintln!("Mock handler received error: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberRef, MembershipChanged};
    use crate::utils::current_timestamp;

    fn create_test_event() -> GatewayEvent {
        GatewayEvent::MembershipChanged(MembershipChanged {
            member: MemberRef::new("member-1", "Alice"),
            joined_channel: Some("waiting-room".to_string()),
            left_channel: None,
            timestamp: current_timestamp(),
        })
    }

    #[tokio::test]
    async fn test_mock_handler_records_events() {
        let handler = MockEventHandler::new();
        handler.handle_event(create_test_event()).await.unwrap();

        let received = handler.received_events.lock().await;
        assert_eq!(received.len(), 1);
    }

    #[tokio::test]
    async fn test_consumer_rejects_malformed_payload() {
        let handler = Arc::new(MockEventHandler::new());
        let consumer = EventConsumer::new(handler.clone());

        assert!(consumer.process_message(b"not json").await.is_err());
        assert!(handler.received_events.lock().await.is_empty());
    }
}
