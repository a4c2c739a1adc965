//! Task Module - the unit of work the runner schedules
//!
//! Contains:
//! - `Task`: capability trait every task implementation supplies
//! - `TaskSet`: name-keyed collection handed to the runner
//! - `FnTask`: closure-backed task for wiring small graphs without a new type
//!
//! The runner never looks inside a task's lifecycle. It only reads the
//! name, the dependency list and the retry policy, then drives the three
//! lifecycle stages.

mod fn_task;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::DagError;
use crate::retry::RetryPolicy;

pub use fn_task::FnTask;

/// Named values flowing into and out of a task
pub type TaskIo = FxHashMap<String, Value>;

/// Error type task implementations return (anything `std::error::Error`)
pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lifecycle stage of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PreExecution,
    Execute,
    PostExecution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreExecution => f.write_str("pre execution"),
            Self::Execute => f.write_str("execution"),
            Self::PostExecution => f.write_str("post execution"),
        }
    }
}

/// A schedulable unit of work
///
/// `pre_execution` and `post_execution` default to no-ops. With the default
/// retry scope all three stages run again on every retry attempt, so side
/// effects in them must be safe to repeat.
#[async_trait]
pub trait Task: Send + Sync {
    /// Unique name, also the key under which dependents see this task's output
    fn name(&self) -> &str;

    /// Names of the tasks whose output this task needs
    fn dependencies(&self) -> &[String];

    /// Retry policy; `None` runs the task once
    fn retry_policy(&self) -> Option<RetryPolicy> {
        None
    }

    async fn pre_execution(
        &self,
        _cancel: &CancellationToken,
        _input: &TaskIo,
    ) -> Result<(), TaskError> {
        Ok(())
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        input: &TaskIo,
    ) -> Result<TaskIo, TaskError>;

    async fn post_execution(
        &self,
        _cancel: &CancellationToken,
        _output: &TaskIo,
    ) -> Result<(), TaskError> {
        Ok(())
    }
}

/// Set of tasks keyed by their unique name
#[derive(Clone, Default)]
pub struct TaskSet {
    tasks: FxHashMap<Arc<str>, Arc<dyn Task>>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from any iterator of tasks, rejecting duplicate names
    pub fn from_tasks<I>(tasks: I) -> Result<Self, DagError>
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        let mut set = Self::new();
        for task in tasks {
            set.insert_arc(task)?;
        }
        Ok(set)
    }

    /// Add a task
    pub fn insert<T: Task + 'static>(&mut self, task: T) -> Result<(), DagError> {
        self.insert_arc(Arc::new(task))
    }

    /// Add an already shared task
    pub fn insert_arc(&mut self, task: Arc<dyn Task>) -> Result<(), DagError> {
        let name: Arc<str> = Arc::from(task.name());
        if self.tasks.contains_key(&name) {
            return Err(DagError::DuplicateTask {
                task: name.to_string(),
            });
        }
        self.tasks.insert(name, task);
        Ok(())
    }

    /// Builder-style insert
    pub fn with<T: Task + 'static>(mut self, task: T) -> Result<Self, DagError> {
        self.insert(task)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in arbitrary order
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.tasks.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Arc<dyn Task>)> {
        self.tasks.iter()
    }
}

impl fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.tasks.keys().map(|n| n.as_ref()).collect();
        names.sort_unstable();
        f.debug_struct("TaskSet").field("tasks", &names).finish()
    }
}
