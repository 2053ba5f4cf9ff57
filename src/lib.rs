//! Green Room - live waiting-list service
//!
//! This crate maintains an ordered waiting list of participants queuing to
//! be called up from a holding channel into an active channel, and keeps a
//! single externally visible status report in sync with it.

pub mod amqp;
pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod report;
pub mod room;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{Result, RoomError};
pub use types::*;

// Re-export key components
pub use events::MembershipEventRouter;
pub use report::{ReportSurface, ReusableReport};
pub use room::{render_report, RoomConfig, StaleSweeper, WaitingEntry, WaitingRoom};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
