//! Error types for the waiting-list service
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific waiting-room scenarios
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("AMQP connection failed: {message}")]
    AmqpConnectionFailed { message: String },

    #[error("Invalid gateway event: {reason}")]
    InvalidGatewayEvent { reason: String },

    #[error("Report publish failed: {message}")]
    ReportPublishFailed { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
