//! ResultStore - task output storage with DashMap
//!
//! Each entry is written once, by the task that produced it, before any
//! dependent is dispatched. Readers never block writers of other entries.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxHashMap;

use crate::task::TaskIo;

/// Outputs of a successful run: task name → output map
pub type ExecutionResults = FxHashMap<String, TaskIo>;

/// Thread-safe, write-once storage for task outputs
///
/// Uses Arc<str> keys so the scheduler's interned names are reused as-is.
#[derive(Clone, Default)]
pub struct ResultStore {
    results: Arc<DashMap<Arc<str>, Arc<TaskIo>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    /// Publish a task's output. Returns `false` and keeps the first value if
    /// the task already published.
    pub fn publish(&self, task: Arc<str>, output: TaskIo) -> bool {
        match self.results.entry(task) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(output));
                true
            }
        }
    }

    /// Output of a task (Arc clone, no deep copy)
    pub fn get(&self, task: &str) -> Option<Arc<TaskIo>> {
        self.results.get(task).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, task: &str) -> bool {
        self.results.contains_key(task)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Merge the outputs of `dependencies` into one input map, each key
    /// prefixed with its producer's name (`"fetch.body"`), so equal keys from
    /// different dependencies never collide.
    pub fn namespaced_inputs<'a, I>(&self, dependencies: I) -> TaskIo
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut inputs = TaskIo::default();
        for dep in dependencies {
            let Some(output) = self.get(dep) else {
                continue;
            };
            for (key, value) in output.iter() {
                inputs.insert(format!("{}.{}", dep, key), value.clone());
            }
        }
        inputs
    }

    /// Owned copy of every published output
    pub fn snapshot(&self) -> ExecutionResults {
        self.results
            .iter()
            .map(|entry| (entry.key().to_string(), (**entry.value()).clone()))
            .collect()
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("len", &self.len())
            .finish()
    }
}
