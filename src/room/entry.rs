//! Waiting-list entry records
//!
//! Entries are immutable values: every state transition builds a new entry
//! from the old one, so a snapshot handed to a caller can never change
//! underneath it.

use crate::types::{MemberId, MemberRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tracked participant's queue record and temporal flags.
///
/// `left_at` and `called_at` are never both set: a call clears the left
/// flag and a departure clears the called flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingEntry {
    member: MemberRef,
    joined_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
    called_at: Option<DateTime<Utc>>,
    grace_leaves: u32,
}

impl WaitingEntry {
    /// Create a fresh entry for a member first observed in the holding channel
    pub fn new(member: MemberRef, joined_at: DateTime<Utc>, grace_leaves: u32) -> Self {
        Self {
            member,
            joined_at,
            left_at: None,
            called_at: None,
            grace_leaves,
        }
    }

    /// Member returned to the holding channel: both flags are cleared,
    /// `joined_at` and the grace counter stay as they were
    pub fn returned(&self) -> Self {
        Self {
            left_at: None,
            called_at: None,
            ..self.clone()
        }
    }

    /// Member was called up into the active channel
    pub fn called(&self, at: DateTime<Utc>) -> Self {
        Self {
            left_at: None,
            called_at: Some(at),
            ..self.clone()
        }
    }

    /// Member departed with grace to spare; one grace leave is consumed
    pub fn departed(&self, at: DateTime<Utc>) -> Self {
        Self {
            left_at: Some(at),
            called_at: None,
            grace_leaves: self.grace_leaves.saturating_sub(1),
            ..self.clone()
        }
    }

    /// Entry rewritten during a shuffle: new synthetic join time, grace
    /// counter restored, flags untouched
    pub fn reordered(&self, joined_at: DateTime<Utc>, grace_leaves: u32) -> Self {
        Self {
            joined_at,
            grace_leaves,
            ..self.clone()
        }
    }

    pub fn member_id(&self) -> &MemberId {
        &self.member.id
    }

    pub fn display_name(&self) -> &str {
        &self.member.display_name
    }

    pub fn joined_at(&self) -> DateTime<Utc> {
        self.joined_at
    }

    pub fn left_at(&self) -> Option<DateTime<Utc>> {
        self.left_at
    }

    pub fn called_at(&self) -> Option<DateTime<Utc>> {
        self.called_at
    }

    pub fn grace_leaves(&self) -> u32 {
        self.grace_leaves
    }

    pub fn has_left(&self) -> bool {
        self.left_at.is_some()
    }

    pub fn was_called(&self) -> bool {
        self.called_at.is_some()
    }
}

impl std::fmt::Display for WaitingEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.member.display_name)?;
        if self.has_left() {
            write!(f, ":left")?;
        }
        if self.was_called() {
            write!(f, ":called")?;
        }
        write!(f, ":{}", self.grace_leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::current_timestamp;

    fn entry(name: &str) -> WaitingEntry {
        WaitingEntry::new(MemberRef::new(name, name), current_timestamp(), 1)
    }

    #[test]
    fn test_new_entry_has_no_flags() {
        let e = entry("alice");
        assert!(!e.has_left());
        assert!(!e.was_called());
        assert_eq!(e.grace_leaves(), 1);
    }

    #[test]
    fn test_called_clears_left_flag() {
        let now = current_timestamp();
        let e = entry("alice").departed(now).called(now);
        assert!(e.was_called());
        assert!(!e.has_left());
    }

    #[test]
    fn test_departed_clears_called_flag_and_consumes_grace() {
        let now = current_timestamp();
        let e = entry("alice").called(now).departed(now);
        assert!(e.has_left());
        assert!(!e.was_called());
        assert_eq!(e.grace_leaves(), 0);
    }

    #[test]
    fn test_returned_keeps_join_time_and_grace() {
        let now = current_timestamp();
        let original = entry("alice");
        let e = original.departed(now).returned();
        assert_eq!(e.joined_at(), original.joined_at());
        assert_eq!(e.grace_leaves(), 0);
        assert!(!e.has_left());
        assert!(!e.was_called());
    }

    #[test]
    fn test_reordered_keeps_flags() {
        let now = current_timestamp();
        let e = entry("alice").departed(now);
        let shuffled = e.reordered(now - chrono::Duration::seconds(3), 1);
        assert!(shuffled.has_left());
        assert_eq!(shuffled.grace_leaves(), 1);
        assert_eq!(shuffled.joined_at(), now - chrono::Duration::seconds(3));
    }

    #[test]
    fn test_display_format() {
        let now = current_timestamp();
        let e = entry("alice").departed(now);
        assert_eq!(e.to_string(), "alice:left:0");
    }
}
