//! AMQP plumbing for the green-room service
//!
//! Connection management, message envelopes, and the gateway-event consumer.
//! The report-publishing side lives in `crate::report`.

pub mod connection;
pub mod consumer;
pub mod messages;

// Re-export commonly used types
pub use connection::AmqpConnection;
pub use consumer::{EventHandler, GatewayEventConsumer};
pub use messages::MessageEnvelope;
