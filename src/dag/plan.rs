// src/dag/plan.rs

//! Execution waves for `plan` and `--dry-run`.
//!
//! A wave groups the units whose longest chain of blocking predecessors has
//! the same length. Every unit of wave `n` can start once waves `0..n` are
//! done, which is the earliest the scheduler would launch it.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, RolloutError};
use crate::types::Direction;

use super::graph::{Graph, UnitName, UnitSpec};
use super::traversal::TraversalConfig;

/// Group `units` into waves in the order `direction` would run them.
///
/// Unknown dependencies and cycles are reported exactly as a real run would
/// report them.
pub fn plan_waves(
    units: &BTreeMap<UnitName, UnitSpec>,
    direction: Direction,
) -> Result<Vec<Vec<UnitName>>> {
    let traversal = TraversalConfig::for_direction(direction);
    Graph::from_units(units, traversal.initial_status)?.detect_cycle()?;

    // Edge a -> b means "a must finish before b starts".
    let mut order: DiGraphMap<&str, ()> = DiGraphMap::new();
    for name in units.keys() {
        order.add_node(name.as_str());
    }
    for (name, spec) in units.iter() {
        for dep in spec.depends_on.iter() {
            match direction {
                Direction::Deploy => order.add_edge(dep.as_str(), name.as_str(), ()),
                Direction::Destroy => order.add_edge(name.as_str(), dep.as_str(), ()),
            };
        }
    }

    let sorted = toposort(&order, None).map_err(|cycle| {
        RolloutError::ConfigError(format!(
            "dependency cycle involving unit '{}'",
            cycle.node_id()
        ))
    })?;

    let mut level: HashMap<&str, usize> = HashMap::with_capacity(sorted.len());
    for node in sorted.iter().copied() {
        let depth = order
            .neighbors_directed(node, petgraph::Direction::Incoming)
            .filter_map(|pred| level.get(pred).map(|d| d + 1))
            .max()
            .unwrap_or(0);
        level.insert(node, depth);
    }

    let depth = level.values().copied().max().map_or(0, |max| max + 1);
    let mut waves: Vec<Vec<UnitName>> = vec![Vec::new(); depth];
    for (name, wave) in level {
        waves[wave].push(name.to_string());
    }
    for wave in waves.iter_mut() {
        wave.sort();
    }

    Ok(waves)
}
