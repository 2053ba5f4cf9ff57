//! Metrics and monitoring for the green-room service
//!
//! Prometheus counters for room activity plus a small HTTP server exposing
//! health and metrics endpoints.

pub mod collector;
pub mod health;

pub use collector::MetricsCollector;
pub use health::{HealthServer, HealthServerConfig};
