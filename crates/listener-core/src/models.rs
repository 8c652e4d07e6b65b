//! The persisted webhook record and its identifier.
//!
//! A record is built exactly once per accepted delivery, after the body has
//! parsed as JSON, and is never mutated afterwards.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Opaque per-invocation identifier.
///
/// Doubles as the record's primary key and as the `requestId` reported on
/// internal errors. Callers never supply it.
///
/// # Example
///
/// ```
/// use listener_core::models::RecordId;
/// let id = RecordId::from("abc-123");
/// assert_eq!(id.as_str(), "abc-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl sqlx::Type<PgDb> for RecordId {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for RecordId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let id = <String as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(id))
    }
}

impl sqlx::Encode<'_, PgDb> for RecordId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// A webhook delivery as it is written to the durable store.
///
/// `timestamp` and `received_at` are two encodings of one clock reading:
/// an ISO-8601 string with millisecond precision and epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRecord {
    /// Invocation identifier, primary key of the stored item.
    pub id: RecordId,
    /// Caller-supplied body, stored verbatim.
    pub payload: serde_json::Value,
    /// Human-readable receipt time, e.g. `2024-01-01T00:00:00.000Z`.
    pub timestamp: String,
    /// Receipt time in milliseconds since the Unix epoch.
    pub received_at: i64,
}

impl WebhookRecord {
    /// Builds a record for `payload` received at `received`.
    pub fn new(id: RecordId, payload: serde_json::Value, received: DateTime<Utc>) -> Self {
        Self {
            id,
            payload,
            timestamp: format_timestamp(received),
            received_at: received.timestamp_millis(),
        }
    }
}

/// Renders an instant the way records and acknowledgements expose it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn record_encodes_one_instant_twice() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = WebhookRecord::new(RecordId::from("abc-123"), json!({"event": "ping"}), at);

        assert_eq!(record.timestamp, "2024-01-01T00:00:00.000Z");
        assert_eq!(record.received_at, 1_704_067_200_000);
    }

    #[test]
    fn timestamp_keeps_millisecond_precision() {
        let at = Utc.timestamp_millis_opt(1_704_067_200_123).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-01T00:00:00.123Z");
    }

    #[test]
    fn record_serializes_with_camel_case_fields() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = WebhookRecord::new(RecordId::from("abc-123"), json!([1, 2]), at);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "abc-123",
                "payload": [1, 2],
                "timestamp": "2024-01-01T00:00:00.000Z",
                "receivedAt": 1_704_067_200_000_i64,
            })
        );
    }
}
