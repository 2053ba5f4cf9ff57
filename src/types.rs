//! Common types used throughout the waiting-list service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identifier for a participant, as assigned by the chat gateway
pub type MemberId = String;

/// Name of a gateway channel (voice or text)
pub type ChannelName = String;

/// A participant as observed by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub id: MemberId,
    pub display_name: String,
}

impl MemberRef {
    pub fn new(id: impl Into<MemberId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The closed set of semantic transitions the room reacts to.
///
/// The gateway's raw event taxonomy (join, leave, move, disconnect) is wider
/// than what the room cares about; the router collapses every raw event into
/// one of these before touching room state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Member entered the holding channel
    JoinedWaiting(MemberRef),
    /// Member entered the active channel
    JoinedActive(MemberRef),
    /// Member left a tracked channel without entering the other one
    LeftTracked(MemberId),
    /// Event did not involve a tracked channel
    Ignored,
}

/// Raw membership transition as delivered by the gateway adapter.
///
/// A plain join carries only `joined_channel`, a plain leave only
/// `left_channel`, and a move between channels carries both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipChanged {
    pub member: MemberRef,
    pub joined_channel: Option<ChannelName>,
    pub left_channel: Option<ChannelName>,
    pub timestamp: DateTime<Utc>,
}

/// A text command addressed to the service.
///
/// The gateway resolves the sender's capability before forwarding, so the
/// router only has to honor the flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    pub member: MemberRef,
    pub text: String,
    pub can_reorder: bool,
    pub timestamp: DateTime<Utc>,
}

/// Authoritative channel membership snapshot sent on session establishment
/// and after a connectivity gap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub waiting: Vec<MemberRef>,
    pub active: Vec<MemberRef>,
    pub timestamp: DateTime<Utc>,
}

/// Union type for all inbound gateway messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GatewayEvent {
    MembershipChanged(MembershipChanged),
    Command(Command),
    SessionReady(SessionSnapshot),
    SessionResumed(SessionSnapshot),
    SessionClosed {},
}

/// Outbound action against the single reusable report message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum ReportAction {
    Create { text: String },
    Edit { text: String },
    Delete {},
    Reply { text: String },
}
