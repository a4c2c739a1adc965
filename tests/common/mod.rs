//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use dagrun::{CancellationToken, FnTask, RetryPolicy, Stage, Task, TaskError, TaskIo, TaskSet};

/// Build a TaskIo from key/value pairs
pub fn io(pairs: &[(&str, Value)]) -> TaskIo {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Build a TaskSet, panicking on duplicate names
pub fn task_set<T: Task + 'static>(tasks: impl IntoIterator<Item = T>) -> TaskSet {
    let mut set = TaskSet::new();
    for task in tasks {
        set.insert(task).expect("unique task names");
    }
    set
}

/// Task that outputs `{"value": <name>}` and depends on `deps`
pub fn named(name: &str, deps: &[&str]) -> FnTask {
    FnTask::constant(name, io(&[("value", json!(name))])).depends_on(deps.iter().copied())
}

/// Task whose execute stage always fails with `message`
pub fn failing(name: &str, deps: &[&str], message: &str) -> FnTask {
    let message = message.to_string();
    FnTask::new(name, move |_| {
        let message = message.clone();
        async move { Err::<TaskIo, TaskError>(message.into()) }
    })
    .depends_on(deps.iter().copied())
}

// ============================================================================
// RecordingTask - records every lifecycle call
// ============================================================================

/// Task that counts lifecycle calls, records its inputs and can fail a stage
pub struct RecordingTask {
    name: String,
    dependencies: Vec<String>,
    retry: Option<RetryPolicy>,
    fail_stage: Option<Stage>,
    /// Remaining failures before the failing stage starts succeeding
    failures_left: AtomicU32,
    pub calls: Arc<Calls>,
}

/// Lifecycle call counters shared with the test body
#[derive(Default)]
pub struct Calls {
    pub pre: AtomicU32,
    pub execute: AtomicU32,
    pub post: AtomicU32,
    pub inputs: Mutex<Vec<TaskIo>>,
}

impl Calls {
    pub fn pre(&self) -> u32 {
        self.pre.load(Ordering::SeqCst)
    }

    pub fn execute(&self) -> u32 {
        self.execute.load(Ordering::SeqCst)
    }

    pub fn post(&self) -> u32 {
        self.post.load(Ordering::SeqCst)
    }

    pub fn last_inputs(&self) -> Option<TaskIo> {
        self.inputs.lock().last().cloned()
    }
}

impl RecordingTask {
    pub fn new(name: &str, deps: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            retry: None,
            fail_stage: None,
            failures_left: AtomicU32::new(0),
            calls: Arc::new(Calls::default()),
        }
    }

    /// Fail `stage` the first `times` times it runs (`u32::MAX` = always)
    pub fn failing(mut self, stage: Stage, times: u32) -> Self {
        self.fail_stage = Some(stage);
        self.failures_left = AtomicU32::new(times);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    fn maybe_fail(&self, stage: Stage) -> Result<(), TaskError> {
        if self.fail_stage != Some(stage) {
            return Ok(());
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left == 0 {
            return Ok(());
        }
        if left != u32::MAX {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
        }
        Err(format!("{} {} broke", self.name, stage).into())
    }
}

#[async_trait]
impl Task for RecordingTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry.clone()
    }

    async fn pre_execution(
        &self,
        _cancel: &CancellationToken,
        input: &TaskIo,
    ) -> Result<(), TaskError> {
        self.calls.pre.fetch_add(1, Ordering::SeqCst);
        self.calls.inputs.lock().push(input.clone());
        self.maybe_fail(Stage::PreExecution)
    }

    async fn execute(
        &self,
        _cancel: &CancellationToken,
        _input: &TaskIo,
    ) -> Result<TaskIo, TaskError> {
        self.calls.execute.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail(Stage::Execute)?;
        Ok(io(&[("value", json!(self.name))]))
    }

    async fn post_execution(
        &self,
        _cancel: &CancellationToken,
        _output: &TaskIo,
    ) -> Result<(), TaskError> {
        self.calls.post.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail(Stage::PostExecution)
    }
}
