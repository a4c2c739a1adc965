//! EventLog - event sourcing for runs
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: run-level and task-level variants
//! - EventLog: thread-safe, append-only log
//!
//! Event ids are assigned from one atomic counter, so for two causally
//! ordered emits (a dependency's `TaskCompleted`, then its dependent's
//! `TaskStarted`) the ids are ordered too.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since run start (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// All event types
///
/// Uses Arc<str> for task fields to share the scheduler's interned names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // RUN LEVEL
    // ═══════════════════════════════════════════
    RunStarted {
        task_count: usize,
        edge_count: usize,
    },
    RunCompleted {
        completed: usize,
        total_duration_ms: u64,
    },
    RunFailed {
        error: String,
        failed_task: Option<Arc<str>>,
    },

    // ═══════════════════════════════════════════
    // TASK LEVEL
    // ═══════════════════════════════════════════
    /// All dependencies published; unit dispatched
    TaskScheduled {
        task: Arc<str>,
        dependencies: Vec<Arc<str>>,
    },
    /// Lifecycle about to begin with the assembled inputs
    TaskStarted { task: Arc<str>, inputs: Value },
    AttemptFailed {
        task: Arc<str>,
        attempt: u32,
        error: String,
    },
    TaskCompleted {
        task: Arc<str>,
        output: Value,
        duration_ms: u64,
    },
    TaskFailed {
        task: Arc<str>,
        error: String,
        duration_ms: u64,
    },
}

impl EventKind {
    /// Extract the task name if the event is task-related
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::TaskScheduled { task, .. }
            | Self::TaskStarted { task, .. }
            | Self::AttemptFailed { task, .. }
            | Self::TaskCompleted { task, .. }
            | Self::TaskFailed { task, .. } => Some(task),
            Self::RunStarted { .. } | Self::RunCompleted { .. } | Self::RunFailed { .. } => None,
        }
    }

    pub fn is_run_event(&self) -> bool {
        matches!(
            self,
            Self::RunStarted { .. } | Self::RunCompleted { .. } | Self::RunFailed { .. }
        )
    }
}

/// Thread-safe, append-only event log
///
/// Clones share one log. Ids are handed out while the write lock is held,
/// so the stored sequence is always in id order.
#[derive(Clone)]
pub struct EventLog {
    inner: Arc<Inner>,
}

struct Inner {
    origin: Instant,
    next_id: AtomicU64,
    entries: RwLock<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                origin: Instant::now(),
                next_id: AtomicU64::new(0),
                entries: RwLock::new(Vec::with_capacity(32)),
            }),
        }
    }

    /// Append `kind` and return the id it was given
    pub fn emit(&self, kind: EventKind) -> u64 {
        let timestamp_ms = self.inner.origin.elapsed().as_millis() as u64;
        let mut entries = self.inner.entries.write();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        entries.push(Event {
            id,
            timestamp_ms,
            kind,
        });
        id
    }

    /// Snapshot of every event, in id order
    pub fn events(&self) -> Vec<Event> {
        self.inner.entries.read().clone()
    }

    /// Snapshot of the events naming `task`, in id order
    pub fn filter_task(&self, task: &str) -> Vec<Event> {
        self.inner
            .entries
            .read()
            .iter()
            .filter(|e| e.kind.task() == Some(task))
            .cloned()
            .collect()
    }

    /// JSON array of every event, for export
    pub fn to_json(&self) -> Value {
        serde_json::to_value(&*self.inner.entries.read()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventLog({} events)", self.len())
    }
}
