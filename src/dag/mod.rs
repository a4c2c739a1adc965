//! DAG Module - dependency graph structure
//!
//! Contains the graph representation and validation:
//! - `cycle`: DFS cycle detection over the task set
//! - `index`: GraphIndex with interned task indices, in-degrees and dependents
//! - `render`: diagnostic tree rendering
//!
//! GraphIndex is immutable after construction; each run copies the
//! in-degree counters it consumes.

mod cycle;
mod index;
mod render;

pub use cycle::{find_cycle, has_cycle};
pub use index::GraphIndex;
pub use render::render_tree;
