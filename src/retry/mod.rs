//! Retry with exponential backoff
//!
//! This module provides:
//! - [`policy`]: serializable `RetryPolicy` and its normalized `Backoff` schedule
//! - [`executor`]: `RetryExecutor`, the cancellable retry loop around a task lifecycle

pub mod executor;
pub mod policy;

use serde::{Deserialize, Serialize};

pub use executor::RetryExecutor;
pub use policy::{
    Backoff, RetryPolicy, DEFAULT_INTERVAL, DEFAULT_MAX_INTERVAL, DEFAULT_MULTIPLIER,
    MAX_INTERVAL_CEILING,
};

/// Which part of the lifecycle a retry attempt re-runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// Pre, Execute and Post all run again on every attempt
    #[default]
    Lifecycle,
    /// Pre and Post run once; only Execute is retried
    ExecuteOnly,
}
