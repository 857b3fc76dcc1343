// src/dag/cycle.rs

//! Cycle detection over the `dependencies` edges of a [`Graph`].
//!
//! Classic three-colour DFS: white vertices are unvisited, gray vertices are
//! on the current DFS stack and black vertices are fully explored. Reaching a
//! gray vertex again means a back edge, and the stack from that vertex onward
//! is the cycle.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::debug;

use super::graph::{Graph, UnitName};

/// A dependency cycle, as the exact sequence of units that closes on itself.
///
/// The first and last entries are the same unit, e.g. `["A", "B", "A"]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cycle found: {}", .path.join(" -> "))]
pub struct Cycle {
    path: Vec<UnitName>,
}

impl Cycle {
    pub fn path(&self) -> &[UnitName] {
        &self.path
    }

    pub fn into_path(self) -> Vec<UnitName> {
        self.path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl Graph {
    /// Prove the graph acyclic, or return the first cycle found.
    ///
    /// Vertices are explored in key order, so the reported path is stable
    /// across runs for the same unit set. O(V + E).
    pub fn detect_cycle(&self) -> Result<(), Cycle> {
        let adjacency = self.dependency_lists();
        let mut colors: HashMap<&str, Color> = HashMap::with_capacity(adjacency.len());
        let mut stack: Vec<&str> = Vec::new();

        for key in adjacency.keys() {
            if color_of(&colors, key) == Color::White {
                if let Some(path) = visit(key, &adjacency, &mut colors, &mut stack) {
                    debug!(?path, "dependency cycle detected");
                    return Err(Cycle { path });
                }
            }
        }

        Ok(())
    }
}

fn color_of(colors: &HashMap<&str, Color>, key: &str) -> Color {
    colors.get(key).copied().unwrap_or(Color::White)
}

fn visit<'a>(
    key: &'a str,
    adjacency: &'a BTreeMap<UnitName, Vec<UnitName>>,
    colors: &mut HashMap<&'a str, Color>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<UnitName>> {
    colors.insert(key, Color::Gray);
    stack.push(key);

    for dep in adjacency.get(key).into_iter().flatten() {
        match color_of(colors, dep) {
            Color::Gray => {
                let start = stack.iter().position(|k| *k == dep.as_str()).unwrap_or(0);
                let mut path: Vec<UnitName> =
                    stack[start..].iter().map(|k| k.to_string()).collect();
                path.push(dep.clone());
                return Some(path);
            }
            Color::White => {
                if let Some(path) = visit(dep, adjacency, colors, stack) {
                    return Some(path);
                }
            }
            Color::Black => {}
        }
    }

    stack.pop();
    colors.insert(key, Color::Black);
    None
}
