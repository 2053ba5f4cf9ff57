//! Report publishing for the green-room service
//!
//! The rendered waiting list lives in a single reusable message on the
//! report surface. This module holds the surface boundary trait, its AMQP
//! implementation, and the reusable-message bookkeeping.

pub mod message;
pub mod surface;

// Re-export commonly used types
pub use message::ReusableReport;
pub use surface::{AmqpReportSurface, MockReportSurface, ReportSurface};
