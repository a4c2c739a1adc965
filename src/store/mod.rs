//! Store Module - per-run state
//!
//! Thread-safe storage for task outputs and completion order.
//!
//! Key types:
//! - `ResultStore`: write-once task outputs (DashMap, lock-free reads)
//! - `ExecutionOrder`: append-only completion sequence
//! - `ExecutionResults`: owned snapshot returned from a successful run

mod order;
mod results;

// Re-export all public types
pub use order::ExecutionOrder;
pub use results::{ExecutionResults, ResultStore};
