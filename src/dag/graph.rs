// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::errors::{Result, RolloutError};

/// Canonical unit name type used throughout the DAG.
pub type UnitName = String;

/// One deployable unit and the units it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpec {
    pub name: UnitName,
    pub depends_on: Vec<UnitName>,
}

impl UnitSpec {
    pub fn new(name: impl Into<UnitName>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<UnitName>,
    {
        self.depends_on.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Lifecycle status of a vertex within one run.
///
/// A deploy run drives vertices from `Pending` to `Active`; a destroy run
/// drives them from `Active` back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Active,
}

/// Which adjacency set of a vertex to look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacency {
    /// Units this vertex depends on.
    Dependencies,
    /// Units that depend on this vertex.
    Dependents,
}

/// Node of the dependency graph.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub key: UnitName,
    pub status: Status,
    pub dependencies: BTreeSet<UnitName>,
    pub dependents: BTreeSet<UnitName>,
    /// Set once the scheduler has launched this vertex in the current run.
    pub launched: bool,
}

impl Vertex {
    fn new(key: UnitName, status: Status) -> Self {
        Self {
            key,
            status,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            launched: false,
        }
    }

    fn adjacent(&self, adjacency: Adjacency) -> &BTreeSet<UnitName> {
        match adjacency {
            Adjacency::Dependencies => &self.dependencies,
            Adjacency::Dependents => &self.dependents,
        }
    }
}

/// Result of offering a vertex to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offer {
    /// Every blocking neighbour has moved on; the caller now owns the launch.
    Launch,
    /// Some neighbours are still at the blocking status.
    Blocked(Vec<UnitName>),
    /// The vertex was already launched by an earlier offer.
    AlreadyLaunched,
}

/// Dependency graph for one run.
///
/// Structure is fixed once built; only vertex status (and the launched flag)
/// changes afterwards. A single mutex guards both, so readiness checks never
/// observe a half-applied status update.
#[derive(Debug, Default)]
pub struct Graph {
    vertices: Mutex<BTreeMap<UnitName, Vertex>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a unit map, every vertex starting at `initial_status`.
    ///
    /// Fails with `UnknownUnit` if a `depends_on` entry names a unit that is
    /// not part of `units`.
    pub fn from_units(units: &BTreeMap<UnitName, UnitSpec>, initial_status: Status) -> Result<Self> {
        let graph = Graph::new();

        for name in units.keys() {
            graph.add_vertex(name.clone(), initial_status);
        }

        for (name, spec) in units.iter() {
            for dep in spec.depends_on.iter() {
                graph.add_edge(name, dep).map_err(|err| match err {
                    RolloutError::UnknownUnit(missing) => RolloutError::ConfigError(format!(
                        "unit '{name}' has unknown dependency '{missing}' in `depends_on`"
                    )),
                    other => other,
                })?;
            }
        }

        Ok(graph)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<UnitName, Vertex>> {
        // A panic while holding the lock cannot leave a vertex half-written:
        // every critical section is a plain field assignment or a read.
        self.vertices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a vertex. Returns `false` if the key was already present, in
    /// which case the existing vertex is left untouched.
    pub fn add_vertex(&self, key: impl Into<UnitName>, status: Status) -> bool {
        let key = key.into();
        let mut vertices = self.lock();
        if vertices.contains_key(&key) {
            return false;
        }
        vertices.insert(key.clone(), Vertex::new(key, status));
        true
    }

    /// Record that `from` depends on `to`.
    ///
    /// Inserts `to` into `from.dependencies` and `from` into `to.dependents`.
    /// Adding the same edge twice is a no-op.
    pub fn add_edge(&self, from: &str, to: &str) -> Result<()> {
        let mut vertices = self.lock();

        if !vertices.contains_key(from) {
            return Err(RolloutError::UnknownUnit(from.to_string()));
        }
        if !vertices.contains_key(to) {
            return Err(RolloutError::UnknownUnit(to.to_string()));
        }

        if let Some(source) = vertices.get_mut(from) {
            if !source.dependencies.insert(to.to_string()) {
                return Ok(());
            }
        }
        if let Some(destination) = vertices.get_mut(to) {
            destination.dependents.insert(from.to_string());
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// All vertex keys in sorted order.
    pub fn keys(&self) -> Vec<UnitName> {
        self.lock().keys().cloned().collect()
    }

    /// Snapshot of a single vertex.
    pub fn vertex(&self, key: &str) -> Option<Vertex> {
        self.lock().get(key).cloned()
    }

    /// Vertices with no dependencies.
    pub fn leaves(&self) -> Vec<UnitName> {
        self.without(Adjacency::Dependencies)
    }

    /// Vertices nothing depends on.
    pub fn roots(&self) -> Vec<UnitName> {
        self.without(Adjacency::Dependents)
    }

    /// Vertices whose given adjacency set is empty.
    pub fn without(&self, adjacency: Adjacency) -> Vec<UnitName> {
        self.lock()
            .values()
            .filter(|v| v.adjacent(adjacency).is_empty())
            .map(|v| v.key.clone())
            .collect()
    }

    /// Immediate neighbours of `key` in the given direction.
    pub fn neighbors(&self, key: &str, adjacency: Adjacency) -> Vec<UnitName> {
        self.lock()
            .get(key)
            .map(|v| v.adjacent(adjacency).iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Neighbours of `key` in the given direction that are at `status`.
    pub fn filter_by_status(&self, key: &str, adjacency: Adjacency, status: Status) -> Vec<UnitName> {
        let vertices = self.lock();
        blocking_in(&vertices, key, adjacency, status)
    }

    pub fn status_of(&self, key: &str) -> Option<Status> {
        self.lock().get(key).map(|v| v.status)
    }

    pub fn update_status(&self, key: &str, status: Status) -> Result<()> {
        let mut vertices = self.lock();
        let vertex = vertices
            .get_mut(key)
            .ok_or_else(|| RolloutError::UnknownUnit(key.to_string()))?;
        vertex.status = status;
        Ok(())
    }

    /// Check readiness and claim the vertex in one critical section.
    ///
    /// Two offers can both observe an empty blocking set; only the first of
    /// them gets `Offer::Launch`.
    pub fn offer(&self, key: &str, adjacency: Adjacency, blocking_status: Status) -> Result<Offer> {
        let mut vertices = self.lock();

        let blocking = blocking_in(&vertices, key, adjacency, blocking_status);
        let vertex = vertices
            .get_mut(key)
            .ok_or_else(|| RolloutError::UnknownUnit(key.to_string()))?;

        if vertex.launched {
            return Ok(Offer::AlreadyLaunched);
        }
        if !blocking.is_empty() {
            return Ok(Offer::Blocked(blocking));
        }

        vertex.launched = true;
        Ok(Offer::Launch)
    }

    /// Undo a launch claim for a vertex whose callback never ran.
    pub fn release(&self, key: &str) {
        if let Some(vertex) = self.lock().get_mut(key) {
            vertex.launched = false;
        }
    }

    /// Keys of vertices that have not been launched in this run.
    pub fn not_launched(&self) -> Vec<UnitName> {
        self.lock()
            .values()
            .filter(|v| !v.launched)
            .map(|v| v.key.clone())
            .collect()
    }

    /// Copy of the `dependencies` adjacency, used by the cycle detector so the
    /// DFS does not hold the lock while recursing.
    pub(crate) fn dependency_lists(&self) -> BTreeMap<UnitName, Vec<UnitName>> {
        self.lock()
            .values()
            .map(|v| (v.key.clone(), v.dependencies.iter().cloned().collect()))
            .collect()
    }
}

fn blocking_in(
    vertices: &BTreeMap<UnitName, Vertex>,
    key: &str,
    adjacency: Adjacency,
    status: Status,
) -> Vec<UnitName> {
    let Some(vertex) = vertices.get(key) else {
        return Vec::new();
    };

    vertex
        .adjacent(adjacency)
        .iter()
        .filter(|neighbor| vertices.get(*neighbor).is_some_and(|n| n.status == status))
        .cloned()
        .collect()
}
