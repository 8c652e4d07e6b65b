//! In-memory record store for tests.
//!
//! Keeps every written record and can be switched into a failing mode to
//! simulate an unreachable or throttled store.

use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::RwLock;

use super::RecordStore;
use crate::{
    error::{CoreError, Result},
    models::{RecordId, WebhookRecord},
};

/// Mock storage recording writes in memory.
///
/// Clones share state, so a test can keep a handle while the router owns
/// another.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    records: Arc<RwLock<Vec<WebhookRecord>>>,
    put_error: Arc<RwLock<Option<String>>>,
    put_calls: Arc<AtomicUsize>,
}

impl MockRecordStore {
    /// Creates an empty, healthy mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `put` fail with a database error.
    pub async fn fail_writes(&self, message: impl Into<String>) {
        *self.put_error.write().await = Some(message.into());
    }

    /// Restores normal write behavior.
    pub async fn heal(&self) {
        *self.put_error.write().await = None;
    }

    /// Returns all successfully written records in write order.
    pub async fn records(&self) -> Vec<WebhookRecord> {
        self.records.read().await.clone()
    }

    /// Returns the record with `id`, if written.
    pub async fn find(&self, id: &RecordId) -> Option<WebhookRecord> {
        self.records.read().await.iter().find(|r| &r.id == id).cloned()
    }

    /// Number of `put` calls, including failed ones.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::Acquire)
    }
}

impl RecordStore for MockRecordStore {
    fn put(&self, record: WebhookRecord) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.put_calls.fetch_add(1, Ordering::AcqRel);

            if let Some(message) = self.put_error.read().await.clone() {
                return Err(CoreError::Database(message));
            }

            let mut records = self.records.write().await;
            if records.iter().any(|r| r.id == record.id) {
                return Err(CoreError::ConstraintViolation(format!(
                    "record {} already exists",
                    record.id
                )));
            }
            records.push(record);
            Ok(())
        })
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match self.put_error.read().await.as_deref() {
                Some(message) => Err(CoreError::Database(message.to_string())),
                None => Ok(()),
            }
        })
    }
}
