// src/types.rs

use std::fmt;

use serde::Deserialize;

/// Direction of a dependency-ordered run.
///
/// - `Deploy`: every unit runs after all of its dependencies.
/// - `Destroy`: every unit runs after all of its dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Deploy,
    Destroy,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Deploy => f.write_str("deploy"),
            Direction::Destroy => f.write_str("destroy"),
        }
    }
}

/// Kind of an `[app.<name>]` unit, from its `type = "..."` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    /// Container service: image build + push, then a deploy command.
    Ecs,
    /// Serverless bundle, packaged and shipped by its deploy command.
    Serverless,
    /// Logical grouping with no resources of its own.
    Alias,
    /// Helm chart release.
    Helm,
}

impl Default for AppKind {
    fn default() -> Self {
        AppKind::Ecs
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppKind::Ecs => "ecs",
            AppKind::Serverless => "serverless",
            AppKind::Alias => "alias",
            AppKind::Helm => "helm",
        };
        f.write_str(s)
    }
}

/// A single lifecycle step of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Build,
    Push,
    Deploy,
    Destroy,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Build => "build",
            Phase::Push => "push",
            Phase::Deploy => "deploy",
            Phase::Destroy => "destroy",
        };
        f.write_str(s)
    }
}
