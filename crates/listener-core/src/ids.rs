//! Per-invocation identifier generation.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use uuid::Uuid;

use crate::models::RecordId;

/// Issues a fresh identifier for every invocation.
///
/// Implementations must never hand out the same id twice within a process.
pub trait IdGenerator: Send + Sync + std::fmt::Debug {
    /// Returns the next identifier.
    fn next_id(&self) -> RecordId;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> RecordId {
        RecordId(Uuid::new_v4().to_string())
    }
}

/// Deterministic `"{prefix}-{n}"` identifiers, starting at 1.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    /// Creates a generator producing `prefix-1`, `prefix-2`, ...
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), next: AtomicU64::new(1) }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> RecordId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        RecordId(format!("{}-{n}", self.prefix))
    }
}

/// Hands out a scripted list of ids, then falls back to UUIDs.
#[derive(Debug, Default)]
pub struct FixedIds {
    queue: Mutex<VecDeque<RecordId>>,
}

impl FixedIds {
    /// Creates a generator that returns `ids` in order.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RecordId>,
    {
        Self { queue: Mutex::new(ids.into_iter().map(Into::into).collect()) }
    }
}

impl IdGenerator for FixedIds {
    fn next_id(&self) -> RecordId {
        let scripted = self
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| UuidGenerator.next_id())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        let generator = UuidGenerator;
        let ids: HashSet<_> = (0..1000).map(|_| generator.next_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn sequential_ids_count_up() {
        let generator = SequentialIds::new("req");
        assert_eq!(generator.next_id().as_str(), "req-1");
        assert_eq!(generator.next_id().as_str(), "req-2");
    }

    #[test]
    fn fixed_ids_fall_back_to_uuid() {
        let generator = FixedIds::new(["abc-123"]);
        assert_eq!(generator.next_id().as_str(), "abc-123");

        let fallback = generator.next_id();
        assert!(Uuid::parse_str(fallback.as_str()).is_ok());
    }
}
