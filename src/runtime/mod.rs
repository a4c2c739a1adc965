//! Runtime Module - concurrent DAG execution
//!
//! Contains the execution components:
//! - `runner`: public engine, construction-time validation and run lifecycle
//! - `scheduler`: coordinator owning in-degree counters (Kahn's algorithm)
//! - `unit`: one dispatched task, from input assembly to its completion report
//!
//! This module represents the "how" - runtime execution.
//! For static structure, see the `dag` module.

mod runner;
mod scheduler;
mod unit;

// Re-export public types
pub use runner::Runner;
