//! dagrun - concurrent DAG task executor with retry and backoff
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  task/      Task trait, TaskSet, FnTask                      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  runtime/   Concurrent execution (Runner, Scheduler, units)  │
//! │  dag/       Graph structure (cycle check, GraphIndex)        │
//! │  retry/     Exponential backoff (RetryPolicy, executor)      │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  store/     Per-run state (ResultStore, ExecutionOrder)      │
//! │  event/     Event sourcing (EventLog, EventKind)             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`task`] | Task lifecycle trait and name-keyed task collection |
//! | [`runtime`] | Kahn's algorithm over tokio tasks, first error wins |
//! | [`dag`] | Cycle detection, interned dependency index, tree rendering |
//! | [`retry`] | Retry policy normalization and cancellable backoff loop |
//! | [`store`] | Write-once task outputs (DashMap) and completion order |
//! | [`event`] | Event sourcing for audit trail |
//! | [`config`] | Run-wide settings (TOML + env) |
//! | [`error`] | Error types with fix suggestions |
//!
//! ## Example
//!
//! ```no_run
//! use dagrun::{FnTask, Runner, TaskIo, TaskSet};
//! use serde_json::json;
//!
//! # async fn demo() -> Result<(), dagrun::DagError> {
//! let mut tasks = TaskSet::new();
//! tasks.insert(FnTask::new("fetch", |_| async {
//!     let mut out = TaskIo::default();
//!     out.insert("rows".to_string(), json!(3));
//!     Ok(out)
//! }))?;
//! tasks.insert(
//!     FnTask::new("report", |input| async move {
//!         let mut out = TaskIo::default();
//!         out.insert("seen".to_string(), input["fetch.rows"].clone());
//!         Ok(out)
//!     })
//!     .depends_on(["fetch"]),
//! )?;
//!
//! let runner = Runner::new(tasks)?;
//! let results = runner.execute().await?;
//! assert_eq!(results["report"]["seen"], json!(3));
//! print!("{}", runner.execution_order());
//! # Ok(())
//! # }
//! ```

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - Tasks
// ═══════════════════════════════════════════════════════════════
pub mod task;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - Execution logic
// ═══════════════════════════════════════════════════════════════
pub mod dag;
pub mod retry;
pub mod runtime;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - Storage, events
// ═══════════════════════════════════════════════════════════════
pub mod event;
pub mod store;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{CancelPhase, DagError, FixSuggestion, Result};

// Config types
pub use config::RunnerConfig;

// Task types
pub use task::{FnTask, Stage, Task, TaskError, TaskIo, TaskSet};

// Graph types
pub use dag::{find_cycle, has_cycle, GraphIndex};

// Retry types
pub use retry::{Backoff, RetryExecutor, RetryPolicy, RetryScope};

// Store types
pub use store::{ExecutionOrder, ExecutionResults};

// Event types
pub use event::{Event, EventKind, EventLog};

// Runtime types
pub use runtime::Runner;

// Re-exported so task implementations need no direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
