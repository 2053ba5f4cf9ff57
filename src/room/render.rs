//! Status-report rendering
//!
//! Pure conversion of an ordered snapshot into the report text. Departed
//! members are struck through, called members are bold, and an empty
//! snapshot renders as an empty string so the publisher deletes the report
//! message.

use crate::room::entry::WaitingEntry;

/// Render the waiting list as one numbered line per entry
pub fn render_report(entries: &[WaitingEntry]) -> String {
    let mut result = String::new();

    for (index, entry) in entries.iter().enumerate() {
        if index > 0 {
            result.push('\n');
        }
        if entry.has_left() {
            result.push_str("~~");
        }
        if entry.was_called() {
            result.push_str("**");
        }
        result.push_str(&format!("{}. {}", index + 1, entry.display_name()));
        if entry.was_called() {
            result.push_str("**");
        }
        if entry.has_left() {
            result.push_str("~~");
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberRef;
    use crate::utils::current_timestamp;

    fn entry(name: &str) -> WaitingEntry {
        WaitingEntry::new(MemberRef::new(name, name), current_timestamp(), 1)
    }

    #[test]
    fn test_empty_snapshot_renders_empty_string() {
        assert_eq!(render_report(&[]), "");
    }

    #[test]
    fn test_plain_entries_are_numbered() {
        let snapshot = vec![entry("alice"), entry("bob")];
        assert_eq!(render_report(&snapshot), "1. alice\n2. bob");
    }

    #[test]
    fn test_called_entry_is_bold() {
        let now = current_timestamp();
        let snapshot = vec![entry("alice").called(now), entry("bob")];
        assert_eq!(render_report(&snapshot), "**1. alice**\n2. bob");
    }

    #[test]
    fn test_departed_entry_is_struck_through() {
        let now = current_timestamp();
        let snapshot = vec![entry("alice"), entry("bob").departed(now)];
        assert_eq!(render_report(&snapshot), "1. alice\n~~2. bob~~");
    }
}
