//! Property tests for record construction and table-name validation.

use chrono::{DateTime, TimeZone, Utc};
use listener_core::{storage::TableName, RecordId, WebhookRecord};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn timestamp_and_received_at_agree(millis in 0_i64..4_102_444_800_000) {
        let at = Utc.timestamp_millis_opt(millis).unwrap();
        let record = WebhookRecord::new(RecordId::from("id"), json!(null), at);

        prop_assert_eq!(record.received_at, millis);
        let parsed = DateTime::parse_from_rfc3339(&record.timestamp).unwrap();
        prop_assert_eq!(parsed.timestamp_millis(), millis);
        prop_assert!(record.timestamp.ends_with('Z'));
    }

    #[test]
    fn identifier_shaped_names_are_accepted(name in "[A-Za-z_][A-Za-z0-9_]{0,62}") {
        let table = TableName::parse(&name).unwrap();
        prop_assert_eq!(table.as_str(), name.as_str());
    }

    #[test]
    fn names_with_other_characters_are_rejected(
        prefix in "[a-z]{0,5}",
        bad in "[^A-Za-z0-9_]",
        suffix in "[a-z]{0,5}",
    ) {
        let name = format!("{prefix}{bad}{suffix}");
        prop_assert!(TableName::parse(&name).is_err());
    }
}
