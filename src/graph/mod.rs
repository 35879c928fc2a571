// src/graph/mod.rs

//! Task graph: references, alias expansion and alias graph validation.
//!
//! - [`invocation`] parses references (`newer:task:target`) and defines the
//!   concrete [`Invocation`] steps.
//! - [`expander`] flattens aliases depth-first, detecting cycles and unknown
//!   references before anything runs.
//! - [`alias_graph`] validates all aliases at once with `petgraph`.

pub mod alias_graph;
pub mod expander;
pub mod invocation;

pub use alias_graph::validate_aliases;
pub use expander::Expander;
pub use invocation::{Invocation, Reference, NEWER_PREFIX, WATCH_TASK};
