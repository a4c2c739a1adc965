//! Unit - one dispatched task
//!
//! A unit waits for an admission permit, assembles its inputs from the
//! published outputs of its dependencies, drives the lifecycle through the
//! task's `RetryExecutor`, publishes the output and reports to the
//! coordinator. Panics inside the lifecycle are caught and reported as
//! failures so the coordinator never waits on a unit that died.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{CancelPhase, DagError};
use crate::event::EventKind;
use crate::retry::RetryScope;
use crate::task::{Stage, Task, TaskError, TaskIo};

use super::scheduler::{Report, RunShared};

/// Drive task `idx` to a terminal outcome and report it
pub(crate) async fn run_unit(shared: Arc<RunShared>, idx: usize, reports: UnboundedSender<Report>) {
    let name = Arc::clone(shared.index.name(idx));
    let start = Instant::now();

    let outcome = AssertUnwindSafe(execute_unit(&shared, idx))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(DagError::TaskPanicked {
                task: Arc::clone(&name),
                message: panic_message(panic.as_ref()),
            })
        });
    let duration_ms = start.elapsed().as_millis() as u64;

    let report = match outcome {
        Ok(output) => {
            let output_value = to_value(&output);
            shared.store.publish(Arc::clone(&name), output);
            shared.events.emit(EventKind::TaskCompleted {
                task: Arc::clone(&name),
                output: output_value,
                duration_ms,
            });
            debug!(task = %name, duration_ms, "task completed");
            Report::Completed(idx)
        }
        Err(err) => {
            shared.events.emit(EventKind::TaskFailed {
                task: Arc::clone(&name),
                error: err.to_string(),
                duration_ms,
            });
            warn!(task = %name, duration_ms, error = %err, "task failed");
            Report::Failed(idx, err)
        }
    };

    // Closed once the coordinator returned on an earlier failure
    let _ = reports.send(report);
}

async fn execute_unit(shared: &RunShared, idx: usize) -> Result<TaskIo, DagError> {
    let index = &shared.index;
    let name = index.name(idx);
    let task = shared.tasks[idx].as_ref();
    let executor = &shared.executors[idx];
    let cancel = &shared.cancel;

    let _permit = match &shared.permits {
        Some(permits) => tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(dispatch_cancelled(name)),
            // Never closed, so `ok()` only drops an unreachable error
            permit = permits.acquire() => permit.ok(),
        },
        None => None,
    };

    if cancel.is_cancelled() {
        return Err(dispatch_cancelled(name));
    }

    let inputs = shared.store.namespaced_inputs(
        index
            .dependencies(idx)
            .iter()
            .map(|&dep| index.name(dep).as_ref()),
    );
    shared.events.emit(EventKind::TaskStarted {
        task: Arc::clone(name),
        inputs: to_value(&inputs),
    });
    let inputs = &inputs;

    match shared.scope {
        RetryScope::Lifecycle => {
            executor
                .run(cancel, |attempt| async move {
                    let result = run_lifecycle(task, name, cancel, inputs).await;
                    if let Err(err) = &result {
                        attempt_failed(shared, name, attempt, err);
                    }
                    result
                })
                .await
        }
        RetryScope::ExecuteOnly => {
            task.pre_execution(cancel, inputs)
                .await
                .map_err(|e| single_attempt(name, Stage::PreExecution, e))?;

            let output = executor
                .run(cancel, |attempt| async move {
                    let result = task
                        .execute(cancel, inputs)
                        .await
                        .map_err(|e| DagError::stage_failed(name, Stage::Execute, e));
                    if let Err(err) = &result {
                        attempt_failed(shared, name, attempt, err);
                    }
                    result
                })
                .await?;

            task.post_execution(cancel, &output)
                .await
                .map_err(|e| single_attempt(name, Stage::PostExecution, e))?;
            Ok(output)
        }
    }
}

/// PreExecution → Execute → PostExecution, stopping at the first failure
async fn run_lifecycle(
    task: &dyn Task,
    name: &Arc<str>,
    cancel: &CancellationToken,
    inputs: &TaskIo,
) -> Result<TaskIo, DagError> {
    task.pre_execution(cancel, inputs)
        .await
        .map_err(|e| DagError::stage_failed(name, Stage::PreExecution, e))?;

    let output = task
        .execute(cancel, inputs)
        .await
        .map_err(|e| DagError::stage_failed(name, Stage::Execute, e))?;

    task.post_execution(cancel, &output)
        .await
        .map_err(|e| DagError::stage_failed(name, Stage::PostExecution, e))?;

    Ok(output)
}

fn attempt_failed(shared: &RunShared, name: &Arc<str>, attempt: u32, err: &DagError) {
    shared.events.emit(EventKind::AttemptFailed {
        task: Arc::clone(name),
        attempt,
        error: err.to_string(),
    });
}

fn single_attempt(name: &Arc<str>, stage: Stage, source: TaskError) -> DagError {
    DagError::exhausted(name, 1, DagError::stage_failed(name, stage, source))
}

fn dispatch_cancelled(name: &Arc<str>) -> DagError {
    DagError::Cancelled {
        task: Arc::clone(name),
        attempt: 0,
        phase: CancelPhase::Dispatch,
    }
}

fn to_value(io: &TaskIo) -> Value {
    serde_json::to_value(io).unwrap_or(Value::Null)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
