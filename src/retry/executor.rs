//! RetryExecutor - bounded, cancellable retry loop
//!
//! Wraps one task's lifecycle. Between failed attempts it sleeps for the
//! backoff delay unless the cancellation token fires first. When retrying is
//! disabled the operation is invoked exactly once with no cancellation
//! check and no wait.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::policy::{Backoff, RetryPolicy};
use crate::error::{CancelPhase, DagError};

/// Retry loop bound to one task name and its normalized policy
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    task: Arc<str>,
    backoff: Backoff,
}

impl RetryExecutor {
    pub fn new(task: Arc<str>, policy: Option<&RetryPolicy>) -> Self {
        Self {
            task,
            backoff: Backoff::from_policy(policy),
        }
    }

    /// Executor that runs the operation once
    pub fn once(task: Arc<str>) -> Self {
        Self {
            task,
            backoff: Backoff::once(),
        }
    }

    pub fn task(&self) -> &Arc<str> {
        &self.task
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Run `operation` until it succeeds, the attempt budget is spent, or
    /// `cancel` fires.
    ///
    /// `operation` receives the 1-based attempt number. Failure after the
    /// last attempt is reported as `RetryExhausted` wrapping the last error.
    pub async fn run<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, DagError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, DagError>>,
    {
        if !self.backoff.retries_enabled() {
            return operation(1)
                .await
                .map_err(|last| DagError::exhausted(&self.task, 1, last));
        }

        let max_attempts = self.backoff.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(self.cancelled(attempt, CancelPhase::Attempt));
            }

            let err = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(task = %self.task, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if attempt >= max_attempts {
                warn!(task = %self.task, attempts = attempt, error = %err, "retry budget exhausted");
                return Err(DagError::exhausted(&self.task, attempt, err));
            }

            let delay = self.backoff.delay_for(attempt);
            warn!(
                task = %self.task,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, backing off"
            );

            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(self.cancelled(attempt, CancelPhase::Backoff));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn cancelled(&self, attempt: u32, phase: CancelPhase) -> DagError {
        DagError::Cancelled {
            task: Arc::clone(&self.task),
            attempt,
            phase,
        }
    }
}
