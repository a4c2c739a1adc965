//! ExecutionOrder - completion sequence of a run

use std::fmt;
use std::sync::Arc;

/// Append-only list of task names in the order their lifecycles succeeded
///
/// Reflects actual completion timing: independent tasks may appear in any
/// interleaving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOrder {
    names: Vec<Arc<str>>,
}

impl ExecutionOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Arc<str>) {
        self.names.push(task);
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn as_slice(&self) -> &[Arc<str>] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, task: &str) -> bool {
        self.names.iter().any(|n| n.as_ref() == task)
    }

    /// 0-based completion position of a task
    pub fn position(&self, task: &str) -> Option<usize> {
        self.names.iter().position(|n| n.as_ref() == task)
    }
}

/// Numbered, one task per line: `1. fetch`
impl fmt::Display for ExecutionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names.iter().enumerate() {
            writeln!(f, "{}. {}", i + 1, name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_one_based_listing() {
        let mut order = ExecutionOrder::new();
        order.push(Arc::from("auth"));
        order.push(Arc::from("profile"));
        assert_eq!(order.to_string(), "1. auth\n2. profile\n");
        assert_eq!(order.position("profile"), Some(1));
        assert!(order.contains("auth"));
    }

    #[test]
    fn empty_order_renders_empty() {
        let mut order = ExecutionOrder::new();
        assert_eq!(order.to_string(), "");
        order.push(Arc::from("x"));
        order.clear();
        assert!(order.is_empty());
    }
}
