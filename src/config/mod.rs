//! Configuration management for the green-room service
//!
//! This module handles all configuration loading from environment variables,
//! validation, and default values for the waiting-list service.

pub mod app;

// Re-export commonly used types
pub use app::{validate_config, AmqpSettings, AppConfig, RoomSettings, ServiceSettings};
