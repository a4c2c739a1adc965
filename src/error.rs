//! Error types with error codes and fix suggestions
//!
//! Error code ranges:
//! - DAG-000-009: Graph construction errors
//! - DAG-010-019: Task execution errors
//! - DAG-020-029: Configuration errors

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::task::{Stage, TaskError};

pub type Result<T> = std::result::Result<T, DagError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Where a cancellation was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPhase {
    /// Before the task was handed to its lifecycle at all
    Dispatch,
    /// Before starting an attempt
    Attempt,
    /// While waiting out a backoff interval
    Backoff,
}

impl fmt::Display for CancelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch => f.write_str("before dispatch"),
            Self::Attempt => f.write_str("before attempt"),
            Self::Backoff => f.write_str("during retry wait"),
        }
    }
}

fn attempts_label(attempts: &u32) -> String {
    if *attempts == 1 {
        "1 attempt".to_string()
    } else {
        format!("{} attempts", attempts)
    }
}

#[derive(Error, Debug)]
pub enum DagError {
    // ═══════════════════════════════════════════
    // GRAPH ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[DAG-001] Circular dependency detected: {cycle}")]
    CycleDetected { cycle: String },

    #[error("[DAG-002] Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("[DAG-003] Duplicate task name '{task}'")]
    DuplicateTask { task: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[DAG-010] Task '{task}' {stage} failed: {source}")]
    Stage {
        task: Arc<str>,
        stage: Stage,
        #[source]
        source: TaskError,
    },

    #[error("[DAG-011] Task '{task}' failed after {}: {source}", attempts_label(.attempts))]
    RetryExhausted {
        task: Arc<str>,
        attempts: u32,
        #[source]
        source: Box<DagError>,
    },

    #[error("[DAG-012] Task '{task}' cancelled {phase} (attempt {attempt})")]
    Cancelled {
        task: Arc<str>,
        attempt: u32,
        phase: CancelPhase,
    },

    #[error("[DAG-013] Task '{task}' panicked: {message}")]
    TaskPanicked { task: Arc<str>, message: String },

    // ═══════════════════════════════════════════
    // CONFIGURATION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[DAG-020] Configuration error: {reason}")]
    Config { reason: String },
}

impl DagError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::CycleDetected { .. } => "DAG-001",
            Self::UnknownDependency { .. } => "DAG-002",
            Self::DuplicateTask { .. } => "DAG-003",
            Self::Stage { .. } => "DAG-010",
            Self::RetryExhausted { .. } => "DAG-011",
            Self::Cancelled { .. } => "DAG-012",
            Self::TaskPanicked { .. } => "DAG-013",
            Self::Config { .. } => "DAG-020",
        }
    }

    /// Name of the task this error belongs to, if any
    pub fn task(&self) -> Option<&str> {
        match self {
            Self::Stage { task, .. }
            | Self::RetryExhausted { task, .. }
            | Self::Cancelled { task, .. }
            | Self::TaskPanicked { task, .. } => Some(task),
            Self::UnknownDependency { task, .. } | Self::DuplicateTask { task } => Some(task),
            Self::CycleDetected { .. } | Self::Config { .. } => None,
        }
    }

    /// Lifecycle stage that failed, looking through retry wrapping
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::RetryExhausted { source, .. } => source.stage(),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub(crate) fn stage_failed(task: &Arc<str>, stage: Stage, source: TaskError) -> Self {
        Self::Stage {
            task: Arc::clone(task),
            stage,
            source,
        }
    }

    pub(crate) fn exhausted(task: &Arc<str>, attempts: u32, last: DagError) -> Self {
        Self::RetryExhausted {
            task: Arc::clone(task),
            attempts,
            source: Box::new(last),
        }
    }
}

impl FixSuggestion for DagError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DagError::CycleDetected { .. } => {
                Some("Remove one dependency along the reported cycle")
            }
            DagError::UnknownDependency { .. } => {
                Some("Add the missing task to the task set or fix the dependency name")
            }
            DagError::DuplicateTask { .. } => Some("Give every task a unique name"),
            DagError::Stage { .. } => Some("Inspect the underlying cause of the failing stage"),
            DagError::RetryExhausted { .. } => {
                Some("Increase maxAttempts or fix the underlying failure")
            }
            DagError::Cancelled { .. } => None,
            DagError::TaskPanicked { .. } => Some("Return an error from the task instead of panicking"),
            DagError::Config { .. } => Some("Check the runner configuration values"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    fn stage_error(stage: Stage) -> DagError {
        DagError::stage_failed(&Arc::from("fetch"), stage, "connection reset".into())
    }

    #[test]
    fn stage_error_names_task_and_stage() {
        let err = stage_error(Stage::Execute);
        assert_eq!(
            err.to_string(),
            "[DAG-010] Task 'fetch' execution failed: connection reset"
        );
        assert_eq!(stage_error(Stage::PreExecution).stage(), Some(Stage::PreExecution));
    }

    #[test]
    fn exhausted_error_counts_attempts_and_keeps_cause() {
        let err = DagError::exhausted(&Arc::from("fetch"), 3, stage_error(Stage::Execute));
        let msg = err.to_string();
        assert!(msg.contains("failed after 3 attempts"), "{msg}");
        assert!(msg.contains("execution failed"));
        assert_eq!(err.stage(), Some(Stage::Execute));
        assert_eq!(err.task(), Some("fetch"));

        // Wrap chain: RetryExhausted -> Stage -> original cause
        let stage = err.source().expect("stage error");
        let cause = stage.source().expect("original cause");
        assert_eq!(cause.to_string(), "connection reset");
    }

    #[test]
    fn single_attempt_is_singular() {
        let err = DagError::exhausted(&Arc::from("x"), 1, stage_error(Stage::PostExecution));
        assert!(err.to_string().contains("after 1 attempt:"));
    }

    #[test]
    fn cancelled_display() {
        let err = DagError::Cancelled {
            task: Arc::from("x"),
            attempt: 2,
            phase: CancelPhase::Backoff,
        };
        assert!(err.is_cancelled());
        assert_eq!(
            err.to_string(),
            "[DAG-012] Task 'x' cancelled during retry wait (attempt 2)"
        );
    }

    #[test]
    fn every_code_matches_display_prefix() {
        let errors = vec![
            DagError::CycleDetected {
                cycle: "a → a".into(),
            },
            DagError::UnknownDependency {
                task: "a".into(),
                dependency: "b".into(),
            },
            DagError::DuplicateTask { task: "a".into() },
            stage_error(Stage::Execute),
            DagError::TaskPanicked {
                task: Arc::from("a"),
                message: "boom".into(),
            },
            DagError::Config {
                reason: "bad".into(),
            },
        ];
        for err in errors {
            assert!(err.to_string().starts_with(&format!("[{}]", err.code())));
        }
    }

    #[test]
    fn fix_suggestions_present_for_graph_errors() {
        let err = DagError::CycleDetected {
            cycle: "a → b → a".into(),
        };
        assert!(err.fix_suggestion().is_some());
    }
}
