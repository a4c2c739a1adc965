//! Scheduler - coordinator for one run
//!
//! The coordinator is the only owner of the in-degree counters. Units never
//! touch them: they publish their output, then send a `Report` over an
//! unbounded channel. The coordinator records the completion, decrements the
//! dependents and dispatches every dependent that reaches zero.
//!
//! Ordering per task: publish → report → dependent dispatch.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use crate::dag::GraphIndex;
use crate::error::DagError;
use crate::event::{EventKind, EventLog};
use crate::retry::{RetryExecutor, RetryScope};
use crate::store::{ExecutionOrder, ResultStore};
use crate::task::Task;

use super::unit;

/// State shared by the coordinator and every unit of one run
///
/// `tasks` and `executors` are aligned with the index's dense task ids.
pub(crate) struct RunShared {
    pub index: Arc<GraphIndex>,
    pub tasks: Arc<[Arc<dyn Task>]>,
    pub executors: Arc<[RetryExecutor]>,
    pub scope: RetryScope,
    pub store: ResultStore,
    pub events: EventLog,
    pub cancel: CancellationToken,
    /// Admission gate (`None` = unbounded)
    pub permits: Option<Semaphore>,
}

/// Terminal outcome of one unit
#[derive(Debug)]
pub(crate) enum Report {
    Completed(usize),
    Failed(usize, DagError),
}

/// Kahn's algorithm driven by completion reports
pub(crate) struct Scheduler {
    shared: Arc<RunShared>,
    order: ExecutionOrder,
}

impl Scheduler {
    pub fn new(shared: Arc<RunShared>) -> Self {
        Self {
            shared,
            order: ExecutionOrder::new(),
        }
    }

    /// Run until every task completed or the first failure is reported.
    ///
    /// On failure, units still in flight are left to finish on their own;
    /// their reports land in a closed channel and are dropped.
    pub async fn run(&mut self) -> Result<(), DagError> {
        let index = Arc::clone(&self.shared.index);
        let total = index.len();
        if total == 0 {
            return Ok(());
        }

        let mut in_degree = index.in_degrees();
        let (reports, mut inbox) = mpsc::unbounded_channel();

        for root in index.roots() {
            self.dispatch(root, &reports);
        }

        while self.order.len() < total {
            // The coordinator holds a sender, so `recv` only yields `None`
            // if every unit vanished without reporting
            let Some(report) = inbox.recv().await else {
                break;
            };

            match report {
                Report::Completed(idx) => {
                    self.order.push(Arc::clone(index.name(idx)));
                    for &dependent in index.dependents(idx) {
                        in_degree[dependent] -= 1;
                        if in_degree[dependent] == 0 {
                            self.dispatch(dependent, &reports);
                        }
                    }
                }
                Report::Failed(idx, err) => {
                    debug!(task = %index.name(idx), "first failure reported, stopping dispatch");
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    /// Completion order recorded so far
    #[cfg(test)]
    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }

    pub fn into_order(self) -> ExecutionOrder {
        self.order
    }

    fn dispatch(&self, idx: usize, reports: &mpsc::UnboundedSender<Report>) {
        let index = &self.shared.index;
        let name = index.name(idx);

        self.shared.events.emit(EventKind::TaskScheduled {
            task: Arc::clone(name),
            dependencies: index
                .dependencies(idx)
                .iter()
                .map(|&dep| Arc::clone(index.name(dep)))
                .collect(),
        });
        debug!(task = %name, "dispatching");

        let span = tracing::info_span!("task", task = %name);
        tokio::spawn(
            unit::run_unit(Arc::clone(&self.shared), idx, reports.clone()).instrument(span),
        );
    }
}
