//! AMQP message definitions and serialization

use crate::error::{Result, RoomError};
use crate::types::GatewayEvent;

/// Routing keys for outbound report events
pub const REPORT_ROUTING_KEY: &str = "report.update";
pub const REPLY_ROUTING_KEY: &str = "report.reply";

/// Message envelope with metadata
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageEnvelope<T> {
    pub payload: T,
    pub correlation_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub routing_key: String,
}

impl<T> MessageEnvelope<T>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
{
    /// Create a new message envelope
    pub fn new(payload: T, routing_key: String) -> Self {
        Self {
            payload,
            correlation_id: crate::utils::generate_correlation_id().to_string(),
            timestamp: crate::utils::current_timestamp(),
            routing_key,
        }
    }

    /// Serialize the envelope to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| {
            RoomError::InternalError {
                message: format!("Failed to serialize message: {}", e),
            }
            .into()
        })
    }

    /// Deserialize envelope from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| {
            RoomError::InvalidGatewayEvent {
                reason: format!("Failed to deserialize message: {}", e),
            }
            .into()
        })
    }
}

/// Message serialization and validation utilities
pub struct MessageUtils;

impl MessageUtils {
    /// Deserialize a gateway event from bytes
    pub fn deserialize_gateway_event(bytes: &[u8]) -> Result<GatewayEvent> {
        let event: GatewayEvent =
            serde_json::from_slice(bytes).map_err(|e| RoomError::InvalidGatewayEvent {
                reason: format!("Failed to deserialize gateway event: {}", e),
            })?;

        Self::validate_gateway_event(&event)?;
        Ok(event)
    }

    /// Serialize a gateway event to bytes
    pub fn serialize_gateway_event(event: &GatewayEvent) -> Result<Vec<u8>> {
        serde_json::to_vec(event).map_err(|e| {
            RoomError::InternalError {
                message: format!("Failed to serialize gateway event: {}", e),
            }
            .into()
        })
    }

    /// Validate a gateway event
    pub fn validate_gateway_event(event: &GatewayEvent) -> Result<()> {
        match event {
            GatewayEvent::MembershipChanged(change) => {
                if change.member.id.is_empty() {
                    return Err(RoomError::InvalidGatewayEvent {
                        reason: "Member id cannot be empty".to_string(),
                    }
                    .into());
                }
                if change.joined_channel.is_none() && change.left_channel.is_none() {
                    return Err(RoomError::InvalidGatewayEvent {
                        reason: "Membership change must name a joined or left channel".to_string(),
                    }
                    .into());
                }
            }
            GatewayEvent::Command(command) => {
                if command.member.id.is_empty() {
                    return Err(RoomError::InvalidGatewayEvent {
                        reason: "Command sender id cannot be empty".to_string(),
                    }
                    .into());
                }
            }
            GatewayEvent::SessionReady(snapshot) | GatewayEvent::SessionResumed(snapshot) => {
                for member in snapshot.waiting.iter().chain(snapshot.active.iter()) {
                    if member.id.is_empty() {
                        return Err(RoomError::InvalidGatewayEvent {
                            reason: "Snapshot member id cannot be empty".to_string(),
                        }
                        .into());
                    }
                }
            }
            GatewayEvent::SessionClosed {} => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberRef, MembershipChanged, SessionSnapshot};
    use crate::utils::current_timestamp;

    fn create_test_membership_change() -> GatewayEvent {
        GatewayEvent::MembershipChanged(MembershipChanged {
            member: MemberRef::new("member-1", "Alice"),
            joined_channel: Some("waiting-room".to_string()),
            left_channel: None,
            timestamp: current_timestamp(),
        })
    }

    #[test]
    fn test_message_envelope_creation() {
        let event = create_test_membership_change();
        let envelope = MessageEnvelope::new(event, "test.routing.key".to_string());

        assert_eq!(envelope.routing_key, "test.routing.key");
        assert!(!envelope.correlation_id.is_empty());
    }

    #[test]
    fn test_gateway_event_validation() {
        assert!(MessageUtils::validate_gateway_event(&create_test_membership_change()).is_ok());

        // Empty member id
        let invalid = GatewayEvent::MembershipChanged(MembershipChanged {
            member: MemberRef::new("", "Alice"),
            joined_channel: Some("waiting-room".to_string()),
            left_channel: None,
            timestamp: current_timestamp(),
        });
        assert!(MessageUtils::validate_gateway_event(&invalid).is_err());

        // Neither joined nor left
        let invalid = GatewayEvent::MembershipChanged(MembershipChanged {
            member: MemberRef::new("member-1", "Alice"),
            joined_channel: None,
            left_channel: None,
            timestamp: current_timestamp(),
        });
        assert!(MessageUtils::validate_gateway_event(&invalid).is_err());
    }

    #[test]
    fn test_snapshot_validation() {
        let invalid = GatewayEvent::SessionReady(SessionSnapshot {
            waiting: vec![MemberRef::new("", "Nameless")],
            active: vec![],
            timestamp: current_timestamp(),
        });
        assert!(MessageUtils::validate_gateway_event(&invalid).is_err());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let event = create_test_membership_change();
        let bytes = MessageUtils::serialize_gateway_event(&event).unwrap();
        let deserialized = MessageUtils::deserialize_gateway_event(&bytes).unwrap();

        match deserialized {
            GatewayEvent::MembershipChanged(change) => {
                assert_eq!(change.member.id, "member-1");
                assert_eq!(change.joined_channel.as_deref(), Some("waiting-room"));
            }
            other => panic!("Unexpected variant: {:?}", other),
        }
    }
}
