//! DAG Runner - task graph execution with tokio
//!
//! Performance optimizations:
//! - Graph validated and indexed once at construction, reused by every run
//! - Arc slices for zero-cost task/executor sharing with spawned units
//! - Tokio handles all concurrency (optional admission limit via config)

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::{Mutex as RunGate, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::RunnerConfig;
use crate::dag::{find_cycle, render_tree, GraphIndex};
use crate::error::{DagError, Result};
use crate::event::{EventKind, EventLog};
use crate::retry::RetryExecutor;
use crate::store::{ExecutionOrder, ExecutionResults, ResultStore};
use crate::task::{Task, TaskSet};

use super::scheduler::{RunShared, Scheduler};

/// DAG runner with event sourcing
///
/// Runs on one instance are serialized: a second `execute` waits for the
/// first to return. Per-run state (in-degree counters, results, completion
/// order, event log) is rebuilt at the start of every run.
pub struct Runner {
    index: Arc<GraphIndex>,
    tasks: Arc<[Arc<dyn Task>]>,
    executors: Arc<[RetryExecutor]>,
    config: RunnerConfig,
    run_gate: RunGate<()>,
    last_order: Mutex<ExecutionOrder>,
    last_events: Mutex<EventLog>,
}

impl Runner {
    /// Validate and index `tasks` with the default configuration
    pub fn new(tasks: TaskSet) -> Result<Self> {
        Self::with_config(tasks, RunnerConfig::default())
    }

    /// Validate and index `tasks`
    ///
    /// Fails on a dependency cycle (the error carries the cycle path), a
    /// dependency on a task missing from the set, or an invalid config.
    pub fn with_config(tasks: TaskSet, config: RunnerConfig) -> Result<Self> {
        config.validate()?;

        if let Some(cycle) = find_cycle(&tasks) {
            let cycle = cycle
                .iter()
                .map(|name| name.as_ref())
                .collect::<Vec<_>>()
                .join(" → ");
            return Err(DagError::CycleDetected { cycle });
        }

        let index = GraphIndex::build(&tasks)?;

        let ordered: Vec<Arc<dyn Task>> = index
            .names()
            .iter()
            .map(|name| {
                tasks.get(name).cloned().ok_or_else(|| DagError::Config {
                    reason: format!("task '{}' vanished from the task set", name),
                })
            })
            .collect::<Result<_>>()?;

        let executors: Vec<RetryExecutor> = index
            .names()
            .iter()
            .zip(&ordered)
            .map(|(name, task)| {
                let policy = task
                    .retry_policy()
                    .or_else(|| config.default_retry.clone());
                RetryExecutor::new(Arc::clone(name), policy.as_ref())
            })
            .collect();

        info!(
            tasks = index.len(),
            edges = index.edge_count(),
            max_concurrency = ?config.max_concurrency,
            "task graph validated"
        );

        Ok(Self {
            index: Arc::new(index),
            tasks: ordered.into(),
            executors: executors.into(),
            config,
            run_gate: RunGate::new(()),
            last_order: Mutex::new(ExecutionOrder::new()),
            last_events: Mutex::new(EventLog::new()),
        })
    }

    /// Run every task once, respecting dependency order
    pub async fn execute(&self) -> Result<ExecutionResults> {
        self.execute_with_cancel(CancellationToken::new()).await
    }

    /// Run with an external cancellation signal
    ///
    /// Cancelling stops new attempts and aborts backoff waits. Lifecycle
    /// calls already in flight see the token but are never aborted.
    #[instrument(skip(self, cancel), fields(tasks = self.index.len()))]
    pub async fn execute_with_cancel(&self, cancel: CancellationToken) -> Result<ExecutionResults> {
        let _gate = self.run_gate.lock().await;
        let run_start = Instant::now();

        let events = EventLog::new();
        *self.last_events.lock() = events.clone();
        self.last_order.lock().clear();

        events.emit(EventKind::RunStarted {
            task_count: self.index.len(),
            edge_count: self.index.edge_count(),
        });
        info!("Starting run");

        let shared = Arc::new(RunShared {
            index: Arc::clone(&self.index),
            tasks: Arc::clone(&self.tasks),
            executors: Arc::clone(&self.executors),
            scope: self.config.retry_scope,
            store: ResultStore::with_capacity(self.index.len()),
            events: events.clone(),
            cancel,
            permits: self.config.max_concurrency.map(Semaphore::new),
        });

        let mut scheduler = Scheduler::new(Arc::clone(&shared));
        let outcome = scheduler.run().await;
        let order = scheduler.into_order();
        let completed = order.len();
        *self.last_order.lock() = order;

        let total_duration_ms = run_start.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                events.emit(EventKind::RunCompleted {
                    completed,
                    total_duration_ms,
                });
                info!(completed, total_duration_ms, "Run completed");
                Ok(shared.store.snapshot())
            }
            Err(err) => {
                events.emit(EventKind::RunFailed {
                    error: err.to_string(),
                    failed_task: err.task().map(Arc::from),
                });
                warn!(completed, total_duration_ms, error = %err, "Run failed");
                Err(err)
            }
        }
    }

    /// Completion order of the most recent run, one `"{n}. {task}"` per line
    pub fn execution_order(&self) -> String {
        self.last_order.lock().to_string()
    }

    /// Completion order of the most recent run as data
    pub fn completed(&self) -> Vec<Arc<str>> {
        self.last_order.lock().as_slice().to_vec()
    }

    /// Event log of the most recent run
    pub fn event_log(&self) -> EventLog {
        self.last_events.lock().clone()
    }

    /// Tree of every root and, recursively, its dependents
    pub fn render_graph(&self) -> String {
        render_tree(&self.index)
    }

    /// Print `render_graph` to stdout
    pub fn print_graph(&self) {
        print!("{}", self.render_graph());
    }

    pub fn graph(&self) -> &GraphIndex {
        &self.index
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn task_count(&self) -> usize {
        self.index.len()
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("tasks", &self.index.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{FnTask, TaskIo};
    use pretty_assertions::assert_eq;

    fn noop(name: &str, deps: &[&str]) -> FnTask {
        FnTask::constant(name, TaskIo::default()).depends_on(deps.iter().copied())
    }

    fn task_set(tasks: Vec<FnTask>) -> TaskSet {
        let mut set = TaskSet::new();
        for task in tasks {
            set.insert(task).unwrap();
        }
        set
    }

    #[test]
    fn cycle_rejected_with_path() {
        let tasks = task_set(vec![noop("a", &["b"]), noop("b", &["a"])]);
        let err = Runner::new(tasks).unwrap_err();
        assert_eq!(err.code(), "DAG-001");
        assert!(err.to_string().contains("a → b → a"), "{err}");
    }

    #[test]
    fn unknown_dependency_rejected() {
        let tasks = task_set(vec![noop("a", &["ghost"])]);
        let err = Runner::new(tasks).unwrap_err();
        assert_eq!(err.code(), "DAG-002");
    }

    #[test]
    fn invalid_config_rejected() {
        let err = Runner::with_config(TaskSet::new(), RunnerConfig::new().with_max_concurrency(0))
            .unwrap_err();
        assert_eq!(err.code(), "DAG-020");
    }

    #[test]
    fn render_graph_lists_roots() {
        let runner = Runner::new(task_set(vec![noop("a", &[]), noop("b", &["a"])])).unwrap();
        assert_eq!(runner.render_graph(), "a\n└── b\n");
        assert_eq!(runner.task_count(), 2);
    }

    #[tokio::test]
    async fn order_empty_before_first_run() {
        let runner = Runner::new(task_set(vec![noop("a", &[])])).unwrap();
        assert_eq!(runner.execution_order(), "");
        runner.execute().await.unwrap();
        assert_eq!(runner.execution_order(), "1. a\n");
    }
}
