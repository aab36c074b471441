//! Retry and backoff policy.
//!
//! Classifies chunk errors (transport failures, transient server statuses)
//! and computes jittered exponential backoff. Nothing here performs I/O.

mod classify;
mod error;
mod policy;

pub use classify::{chunk_error_from_curl, classify, classify_http_status, transport_kind_for_curl};
pub use error::{ChunkError, TransportKind};
pub use policy::{
    Classification, RetryDecision, RetryPolicy, MAX_RETRIES, RETRIABLE_STATUS_CODES,
};
