//! Utility functions for the waiting-list service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a correlation id for outbound messages
pub fn generate_correlation_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_correlation_ids() {
        let id1 = generate_correlation_id();
        let id2 = generate_correlation_id();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_current_timestamp_is_monotonic_enough() {
        let a = current_timestamp();
        let b = current_timestamp();
        assert!(b >= a);
    }
}
