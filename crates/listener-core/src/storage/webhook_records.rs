//! Repository for webhook record persistence.
//!
//! Records are insert-only. `received_at` carries the secondary index used
//! for external range queries; the ingestion path never reads it back.
//!
//! Payloads live in a `JSON` column and travel as text in both directions.
//! `JSONB` rejects the `\u0000` escape, which is valid JSON.

use std::sync::Arc;

use sqlx::PgPool;

use super::TableName;
use crate::{
    error::{CoreError, Result},
    models::{RecordId, WebhookRecord},
};

/// Row shape as selected, with the payload still in its text form.
#[derive(sqlx::FromRow)]
struct RecordRow {
    id: RecordId,
    payload: String,
    timestamp: String,
    received_at: i64,
}

impl TryFrom<RecordRow> for WebhookRecord {
    type Error = CoreError;

    fn try_from(row: RecordRow) -> Result<Self> {
        let payload = serde_json::from_str(&row.payload).map_err(|e| {
            CoreError::Database(format!("stored payload of record {} is not JSON: {e}", row.id))
        })?;

        Ok(Self { id: row.id, payload, timestamp: row.timestamp, received_at: row.received_at })
    }
}

/// Repository for webhook record database operations.
pub struct Repository {
    pool: Arc<PgPool>,
    table: TableName,
}

impl Repository {
    /// Creates a new repository writing to `table`.
    pub fn new(pool: Arc<PgPool>, table: TableName) -> Self {
        Self { pool, table }
    }

    /// Returns a reference to the database pool.
    pub fn pool(&self) -> Arc<PgPool> {
        self.pool.clone()
    }

    /// Returns the table this repository writes to.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Creates the record table and its `received_at` index if missing.
    ///
    /// # Errors
    ///
    /// Returns error if either DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        let table = self.table.quoted();

        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                payload JSON NOT NULL,
                "timestamp" TEXT NOT NULL,
                received_at BIGINT NOT NULL
            )
            "#
        ))
        .execute(&*self.pool)
        .await?;

        let index = format!("\"idx_{}_received_at\"", self.table.as_str());
        sqlx::query(&format!("CREATE INDEX IF NOT EXISTS {index} ON {table} (received_at)"))
            .execute(&*self.pool)
            .await?;

        Ok(())
    }

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ConstraintViolation` if the id already exists and
    /// `CoreError::Database` for any other failure.
    pub async fn insert(&self, record: &WebhookRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| CoreError::InvalidInput(format!("payload cannot be serialized: {e}")))?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (id, payload, "timestamp", received_at)
            VALUES ($1, $2::json, $3, $4)
            "#,
            self.table.quoted()
        ))
        .bind(&record.id)
        .bind(payload)
        .bind(&record.timestamp)
        .bind(record.received_at)
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    /// Finds a record by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn find_by_id(&self, id: &RecordId) -> Result<Option<WebhookRecord>> {
        let row = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            SELECT id, payload::text AS payload, "timestamp", received_at
            FROM {}
            WHERE id = $1
            "#,
            self.table.quoted()
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        row.map(WebhookRecord::try_from).transpose()
    }

    /// Lists records received within `[from_ms, to_ms]`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn list_received_between(
        &self,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<WebhookRecord>> {
        let rows = sqlx::query_as::<_, RecordRow>(&format!(
            r#"
            SELECT id, payload::text AS payload, "timestamp", received_at
            FROM {}
            WHERE received_at BETWEEN $1 AND $2
            ORDER BY received_at ASC, id ASC
            "#,
            self.table.quoted()
        ))
        .bind(from_ms)
        .bind(to_ms)
        .fetch_all(&*self.pool)
        .await?;

        rows.into_iter().map(WebhookRecord::try_from).collect()
    }

    /// Executes a trivial query to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Database` if the connection is unhealthy.
    pub async fn health_check(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.pool).await?;
        Ok(())
    }
}
