//! Cycle detection using DFS with visited / on-stack marks
//!
//! Edges point from a task to each of its dependencies. Reaching a node that
//! is still on the DFS stack means a back edge, i.e. a cycle. Dependencies
//! naming tasks outside the set are treated as leaves here; the index build
//! rejects them separately.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::task::TaskSet;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Visited,
}

/// Whether the dependency relation of `tasks` contains a cycle
pub fn has_cycle(tasks: &TaskSet) -> bool {
    find_cycle(tasks).is_some()
}

/// Find one cycle and return its path, first node repeated at the end
/// (`["a", "b", "a"]`).
///
/// Roots are explored in name order so the reported path is stable.
pub fn find_cycle(tasks: &TaskSet) -> Option<Vec<Arc<str>>> {
    let mut marks: FxHashMap<&str, Mark> =
        FxHashMap::with_capacity_and_hasher(tasks.len(), Default::default());
    let mut stack: Vec<&str> = Vec::new();

    fn dfs<'a>(
        node: &'a str,
        tasks: &'a TaskSet,
        marks: &mut FxHashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<Arc<str>>> {
        match marks.get(node) {
            Some(Mark::OnStack) => {
                let start = stack.iter().position(|n| *n == node).unwrap_or(0);
                let mut cycle: Vec<Arc<str>> =
                    stack[start..].iter().map(|n| Arc::from(*n)).collect();
                cycle.push(Arc::from(node));
                return Some(cycle);
            }
            Some(Mark::Visited) => return None,
            None => {}
        }

        let task = tasks.get(node)?;

        marks.insert(node, Mark::OnStack);
        stack.push(node);

        for dep in task.dependencies() {
            if let Some(cycle) = dfs(dep, tasks, marks, stack) {
                return Some(cycle);
            }
        }

        stack.pop();
        marks.insert(node, Mark::Visited);
        None
    }

    let mut roots: Vec<&str> = tasks.names().map(|n| n.as_ref()).collect();
    roots.sort_unstable();

    for root in roots {
        if marks.contains_key(root) {
            continue;
        }
        if let Some(cycle) = dfs(root, tasks, &mut marks, &mut stack) {
            return Some(cycle);
        }
    }

    None
}
