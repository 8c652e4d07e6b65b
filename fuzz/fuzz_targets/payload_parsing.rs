#![no_main]

//! Fuzz target for webhook body parsing.
//!
//! Any byte sequence must either parse to a JSON value that serializes
//! again or be rejected as a client error, never panic.

use libfuzzer_sys::fuzz_target;
use listener_api::{handlers::webhook::parse_payload, IngestError};

fuzz_target!(|data: &[u8]| {
    match parse_payload(data) {
        Ok(value) => {
            let encoded = serde_json::to_vec(&value).expect("parsed value re-serializes");
            assert!(!encoded.is_empty());
        },
        Err(IngestError::MissingBody) => assert!(data.is_empty()),
        Err(err) => assert!(err.is_client_error()),
    }
});
