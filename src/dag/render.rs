//! Diagnostic tree rendering
//!
//! Prints every root followed by the tasks that depend on it, recursively.
//! A task reachable from several parents appears under each of them, so
//! the output grows with the number of root-to-leaf paths: k layers of two
//! fully connected tasks print 2^k lines.
//! Informational only; the scheduler never reads this.

use std::fmt::Write;

use super::index::GraphIndex;

/// Render the graph as an indented tree, one root per top-level line
pub fn render_tree(index: &GraphIndex) -> String {
    let mut out = String::new();
    for root in index.roots() {
        out.push_str(index.name(root));
        out.push('\n');
        render_dependents(index, root, "", &mut out);
    }
    out
}

fn render_dependents(index: &GraphIndex, idx: usize, prefix: &str, out: &mut String) {
    let dependents = index.dependents(idx);
    for (pos, &child) in dependents.iter().enumerate() {
        let last = pos + 1 == dependents.len();
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        let _ = writeln!(out, "{}{}{}", prefix, branch, index.name(child));
        render_dependents(index, child, &format!("{}{}", prefix, indent), out);
    }
}
