//! Service coordination for the green-room waiting-list service

pub mod app;

pub use app::{AppState, ServiceError};
