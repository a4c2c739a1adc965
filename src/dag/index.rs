//! GraphIndex - interned dependency graph (optimized)
//!
//! Performance optimizations:
//! - Task names interned once to dense `usize` indices
//! - SmallVec for stack-allocated small edge lists (0-4 items)
//! - Name lookup (FxHashMap) only at the boundary; the scheduler hot path
//!   works on indices

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::DagError;
use crate::task::TaskSet;

/// Stack-allocated edges: most tasks have 0-4 dependencies / dependents
pub type EdgeVec = SmallVec<[usize; 4]>;

/// Dependency graph keyed by dense task indices
///
/// Indices follow the sorted order of task names. `dependents` is the exact
/// transpose of `dependencies`, each list sorted by index.
#[derive(Debug, Clone)]
pub struct GraphIndex {
    names: Vec<Arc<str>>,
    lookup: FxHashMap<Arc<str>, usize>,
    dependencies: Vec<EdgeVec>,
    dependents: Vec<EdgeVec>,
}

impl GraphIndex {
    /// Build the index in one pass over tasks and their dependency lists.
    ///
    /// Fails when a dependency names a task that is not in the set.
    /// Repeated entries in one dependency list count as a single edge.
    pub fn build(tasks: &TaskSet) -> Result<Self, DagError> {
        let mut names: Vec<Arc<str>> = tasks.names().cloned().collect();
        names.sort_unstable();

        let lookup: FxHashMap<Arc<str>, usize> = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (Arc::clone(name), idx))
            .collect();

        let mut dependencies: Vec<EdgeVec> = vec![EdgeVec::new(); names.len()];
        let mut dependents: Vec<EdgeVec> = vec![EdgeVec::new(); names.len()];

        for (idx, name) in names.iter().enumerate() {
            let Some(task) = tasks.get(name) else {
                continue;
            };
            for dep in task.dependencies() {
                let Some(&dep_idx) = lookup.get(dep.as_str()) else {
                    return Err(DagError::UnknownDependency {
                        task: name.to_string(),
                        dependency: dep.clone(),
                    });
                };
                if dependencies[idx].contains(&dep_idx) {
                    continue;
                }
                dependencies[idx].push(dep_idx);
                dependents[dep_idx].push(idx);
            }
        }

        // Outer loop visits dependents in index order, so each dependents list
        // is already sorted.
        Ok(Self {
            names,
            lookup,
            dependencies,
            dependents,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All task names, indexed by task index
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }

    /// Name of a task index
    #[inline]
    pub fn name(&self, idx: usize) -> &Arc<str> {
        &self.names[idx]
    }

    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Direct dependencies of a task
    #[inline]
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        &self.dependencies[idx]
    }

    /// Tasks that list `idx` as a dependency
    #[inline]
    pub fn dependents(&self, idx: usize) -> &[usize] {
        &self.dependents[idx]
    }

    /// Number of dependencies that must complete before `idx` may run
    #[inline]
    pub fn in_degree(&self, idx: usize) -> usize {
        self.dependencies[idx].len()
    }

    /// Fresh per-run copy of every in-degree counter
    pub fn in_degrees(&self) -> Vec<usize> {
        self.dependencies.iter().map(SmallVec::len).collect()
    }

    /// Tasks with no dependencies, in index order
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |&idx| self.dependencies[idx].is_empty())
    }

    /// Total number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.dependencies.iter().map(SmallVec::len).sum()
    }
}
