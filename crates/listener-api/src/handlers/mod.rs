//! HTTP request handlers.
//!
//! - `webhook` - the single ingestion endpoint

pub mod webhook;

pub use webhook::receive_webhook;
