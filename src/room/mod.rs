//! Waiting-room core for the green-room service
//!
//! This module owns the ordered waiting list: entry records, the state
//! machine with its grace rules, the periodic stale-entry sweeper, and the
//! pure status-report renderer.

pub mod entry;
pub mod render;
pub mod state;
pub mod sweeper;

// Re-export commonly used types
pub use entry::WaitingEntry;
pub use render::render_report;
pub use state::{RoomConfig, WaitingRoom};
pub use sweeper::StaleSweeper;
