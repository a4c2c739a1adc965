//! Event Module - audit trail of a run
//!
//! Key types:
//! - `Event`: envelope with id + timestamp + kind
//! - `EventKind`: run-level and task-level variants
//! - `EventLog`: thread-safe, append-only log

mod log;

// Re-export all public types
pub use log::{Event, EventKind, EventLog};
