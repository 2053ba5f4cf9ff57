//! Gateway-event routing for the green-room service
//!
//! Collapses the gateway's raw event taxonomy into the waiting room's
//! semantic transitions and drives the report publisher.

pub mod router;

pub use router::MembershipEventRouter;
