//! Durable storage for webhook records.
//!
//! The ingestion path only ever needs a single insert, so it depends on the
//! narrow [`RecordStore`] trait. [`PostgresRecordStore`] is the production
//! implementation; [`mock::MockRecordStore`] keeps records in memory and can
//! be told to fail for fault-injection tests.

use std::{fmt, future::Future, pin::Pin, sync::Arc};

use sqlx::PgPool;

pub mod mock;
pub mod webhook_records;

use crate::{
    error::{CoreError, Result},
    models::WebhookRecord,
};

/// PostgreSQL's identifier length limit.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Storage operations required by the ingestion handler.
///
/// Each call is independent; implementations must be safe to share across
/// concurrently running invocations.
pub trait RecordStore: Send + Sync + 'static {
    /// Writes `record` as a new item keyed by its id.
    ///
    /// Failures are reported, never retried.
    fn put(&self, record: WebhookRecord) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Verifies the store is reachable.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Validated name of the table records are written to.
///
/// Table names are interpolated into SQL, so only plain identifiers are
/// accepted: an ASCII letter or underscore followed by letters, digits or
/// underscores, at most 63 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    /// Parses and validates a table name.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` for empty, overlong or non-identifier
    /// names.
    pub fn parse(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return Err(CoreError::InvalidInput("table name must not be empty".to_string()));
        };

        if name.len() > MAX_IDENTIFIER_LEN {
            return Err(CoreError::InvalidInput(format!(
                "table name exceeds {MAX_IDENTIFIER_LEN} characters"
            )));
        }

        let valid_start = first.is_ascii_alphabetic() || first == '_';
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid_start || !valid_rest {
            return Err(CoreError::InvalidInput(format!(
                "table name {name:?} is not a plain SQL identifier"
            )));
        }

        Ok(Self(name.to_string()))
    }

    /// Returns the name as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the double-quoted identifier for use in SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Production store writing to a PostgreSQL table.
#[derive(Clone)]
pub struct PostgresRecordStore {
    records: Arc<webhook_records::Repository>,
}

impl PostgresRecordStore {
    /// Creates a store over `pool` writing into `table`.
    pub fn new(pool: PgPool, table: TableName) -> Self {
        Self { records: Arc::new(webhook_records::Repository::new(Arc::new(pool), table)) }
    }

    /// Returns the underlying repository for schema setup and queries.
    pub fn repository(&self) -> Arc<webhook_records::Repository> {
        self.records.clone()
    }
}

impl RecordStore for PostgresRecordStore {
    fn put(&self, record: WebhookRecord) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.records.insert(&record).await })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.records.health_check().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_accepts_identifiers() {
        for name in ["WebhookEvents", "webhook_events", "_private", "t1"] {
            assert!(TableName::parse(name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn table_name_rejects_non_identifiers() {
        for name in ["", "1table", "webhook-events", "events; DROP TABLE x", "a\"b", "tbl name"] {
            assert!(TableName::parse(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn table_name_rejects_overlong_names() {
        let name = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(TableName::parse(&name).is_err());
        assert!(TableName::parse(&name[..MAX_IDENTIFIER_LEN]).is_ok());
    }

    #[test]
    fn quoted_name_wraps_in_double_quotes() {
        let name = TableName::parse("WebhookEvents").unwrap();
        assert_eq!(name.quoted(), "\"WebhookEvents\"");
    }

    #[tokio::test]
    async fn postgres_store_writes_to_configured_table() {
        let pool = PgPool::connect_lazy("postgresql://test").unwrap();
        let store = PostgresRecordStore::new(pool, TableName::parse("webhook_events").unwrap());

        let repository = store.repository();
        assert_eq!(repository.table().as_str(), "webhook_events");
        assert!(Arc::ptr_eq(&repository, &store.clone().repository()));
    }
}
