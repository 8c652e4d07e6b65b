//! Core domain types for the webhook listener.
//!
//! Holds the persisted `WebhookRecord`, the error taxonomy, and the injected
//! dependencies every invocation relies on: a clock, an id source, and the
//! durable record store.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod ids;
pub mod models;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result};
pub use ids::{FixedIds, IdGenerator, SequentialIds, UuidGenerator};
pub use models::{RecordId, WebhookRecord};
pub use storage::{PostgresRecordStore, RecordStore};
pub use time::{Clock, RealClock, TestClock};
