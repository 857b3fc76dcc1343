// src/dag/mod.rs

//! Dependency graph and the concurrent scheduler that walks it.
//!
//! - [`graph`] holds vertices, their two adjacency sets and their status.
//! - [`cycle`] proves a graph acyclic before anything runs.
//! - [`traversal`] describes the deploy and destroy walking directions.
//! - [`context`] is the cancellation context handed to callbacks.
//! - [`scheduler`] runs one callback per vertex in dependency order.
//! - [`plan`] computes execution waves for dry runs.

pub mod context;
pub mod cycle;
pub mod graph;
pub mod plan;
pub mod scheduler;
pub mod traversal;

use std::collections::BTreeMap;

pub use context::RunContext;
pub use cycle::Cycle;
pub use graph::{Adjacency, Graph, Offer, Status, UnitName, UnitSpec, Vertex};
pub use plan::plan_waves;
pub use scheduler::{RunOptions, RunReport, Scheduler, run_in_dependency_order};
pub use traversal::{DEPLOY, DESTROY, TraversalConfig};

/// Key a list of unit specs by name. Later duplicates replace earlier ones.
pub fn unit_map(units: impl IntoIterator<Item = UnitSpec>) -> BTreeMap<UnitName, UnitSpec> {
    units
        .into_iter()
        .map(|spec| (spec.name.clone(), spec))
        .collect()
}
