// src/engine/mod.rs

//! Whole-project operations on top of the scheduler.
//!
//! An [`Operation`] is split into stages, one per config section. Each stage
//! is a single dependency-ordered run whose callback executes a fixed list of
//! phases for one unit. The shape of each stage is described by [`Stage`],
//! which is also what `plan` prints.

pub mod runtime;

use std::fmt;

use crate::config::Section;
use crate::dag::UnitName;
use crate::types::{Direction, Phase};

pub use runtime::Engine;

/// What the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Deploy,
    Destroy,
    Build,
    Push,
}

impl Operation {
    /// Walking direction of every stage of this operation.
    pub fn direction(self) -> Direction {
        match self {
            Operation::Destroy => Direction::Destroy,
            Operation::Deploy | Operation::Build | Operation::Push => Direction::Deploy,
        }
    }

    /// Phases run for a unit of `section`, in order.
    pub fn phases(self, section: Section) -> &'static [Phase] {
        match (self, section) {
            (Operation::Deploy, Section::App) => &[Phase::Build, Phase::Push, Phase::Deploy],
            (Operation::Deploy, Section::Infra) => &[Phase::Deploy],
            (Operation::Destroy, _) => &[Phase::Destroy],
            (Operation::Build, Section::App) => &[Phase::Build],
            (Operation::Push, Section::App) => &[Phase::Push],
            (Operation::Build | Operation::Push, Section::Infra) => &[],
        }
    }

    /// Sections in the order their stages run. Infrastructure comes up
    /// before the apps and goes down after them.
    pub fn sections(self) -> &'static [Section] {
        match self {
            Operation::Deploy => &[Section::Infra, Section::App],
            Operation::Destroy => &[Section::App, Section::Infra],
            Operation::Build | Operation::Push => &[Section::App],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Deploy => "deploy",
            Operation::Destroy => "destroy",
            Operation::Build => "build",
            Operation::Push => "push",
        };
        f.write_str(s)
    }
}

/// One stage of an operation as it would run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub section: Section,
    pub direction: Direction,
    pub phases: &'static [Phase],
    /// Units grouped by the earliest point they could start.
    pub waves: Vec<Vec<UnitName>>,
}
