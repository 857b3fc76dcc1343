// src/dag/traversal.rs

//! Direction-specific parameters for the scheduler.
//!
//! The scheduler walks the graph the same way in both directions; only the
//! roles of `dependencies`/`dependents` and of the two statuses swap.

use crate::errors::Result;
use crate::types::Direction;

use super::graph::{Adjacency, Graph, Offer, Status, UnitName};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalConfig {
    pub direction: Direction,
    /// Status every vertex starts the run with.
    pub initial_status: Status,
    /// Status a vertex is moved to once its callback succeeds.
    pub target_status: Status,
    /// A predecessor at this status keeps a vertex from running.
    pub blocking_status: Status,
    /// Predecessor set checked for readiness.
    blocking: Adjacency,
    /// Set re-offered after a vertex completes.
    adjacent: Adjacency,
}

/// Dependencies before dependents.
pub const DEPLOY: TraversalConfig = TraversalConfig {
    direction: Direction::Deploy,
    initial_status: Status::Pending,
    target_status: Status::Active,
    blocking_status: Status::Pending,
    blocking: Adjacency::Dependencies,
    adjacent: Adjacency::Dependents,
};

/// Dependents before dependencies.
pub const DESTROY: TraversalConfig = TraversalConfig {
    direction: Direction::Destroy,
    initial_status: Status::Active,
    target_status: Status::Pending,
    blocking_status: Status::Active,
    blocking: Adjacency::Dependents,
    adjacent: Adjacency::Dependencies,
};

impl TraversalConfig {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Deploy => DEPLOY,
            Direction::Destroy => DESTROY,
        }
    }

    /// Vertices that can start immediately: leaves when deploying, roots when
    /// destroying.
    pub fn extremity_nodes(&self, graph: &Graph) -> Vec<UnitName> {
        graph.without(self.blocking)
    }

    /// Vertices to re-examine once `key` completes.
    pub fn adjacent_nodes(&self, graph: &Graph, key: &str) -> Vec<UnitName> {
        graph.neighbors(key, self.adjacent)
    }

    /// Predecessors of `key` still at the blocking status. Non-empty means
    /// "not ready".
    pub fn blocking_neighbors(&self, graph: &Graph, key: &str) -> Vec<UnitName> {
        graph.filter_by_status(key, self.blocking, self.blocking_status)
    }

    /// Readiness check plus claim, see [`Graph::offer`].
    pub fn offer(&self, graph: &Graph, key: &str) -> Result<Offer> {
        graph.offer(key, self.blocking, self.blocking_status)
    }
}
