//! HTTP surface of the webhook listener.
//!
//! A single route accepts webhook deliveries, validates the body as JSON and
//! persists it through the injected [`RecordStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use listener_core::{Clock, IdGenerator, RealClock, RecordStore, UuidGenerator};

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod invocation;
pub mod server;

pub use config::Config;
pub use error::IngestError;
pub use invocation::InvocationId;
pub use server::{create_router, start_server, HttpSettings};

/// Dependencies shared by every invocation.
///
/// Everything here is immutable; concurrent invocations only meet inside the
/// store.
#[derive(Clone)]
pub struct AppState {
    /// Durable record store.
    pub store: Arc<dyn RecordStore>,
    /// Time source for record timestamps.
    pub clock: Arc<dyn Clock>,
    /// Source of per-invocation identifiers.
    pub ids: Arc<dyn IdGenerator>,
}

impl AppState {
    /// Creates state from explicit dependencies.
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self { store, clock, ids }
    }

    /// Creates state with the system clock and random UUID identifiers.
    pub fn with_store(store: Arc<dyn RecordStore>) -> Self {
        Self::new(store, Arc::new(RealClock::new()), Arc::new(UuidGenerator))
    }
}
