// src/exec/runner.rs

//! Pluggable command runner abstraction.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use crate::dag::{RunContext, UnitName};
use crate::types::Phase;

pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// One fully rendered command for one phase of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub unit: UnitName,
    pub phase: Phase,
    /// Shell command line, placeholders already substituted.
    pub command: String,
    /// Working directory; `None` inherits the current one.
    pub workdir: Option<PathBuf>,
    /// Extra environment variables on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

/// Trait abstracting how phase commands are executed.
///
/// Implementations should return promptly once `ctx` is cancelled.
pub trait CommandRunner: Send + Sync + Debug {
    fn run<'a>(&'a self, ctx: &'a RunContext, request: CommandRequest) -> CommandFuture<'a>;
}
