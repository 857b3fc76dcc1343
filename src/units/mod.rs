// src/units/mod.rs

//! Unit kinds and what each phase does for them.
//!
//! [`Unit`] is a closed set of kinds behind one capability trait,
//! [`UnitManager`]. The engine picks the unit once per scheduler callback and
//! never looks at the kind again.

pub mod template;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{AppConfig, ConfigFile, InfraConfig};
use crate::dag::{RunContext, UnitName};
use crate::exec::{CommandRequest, CommandRunner};
use crate::types::{AppKind, Phase};

pub use template::Placeholders;

pub type PhaseFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// The four lifecycle operations every unit kind supports.
///
/// A kind that has nothing to do for a phase completes immediately.
pub trait UnitManager: Send + Sync {
    fn build<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a>;
    fn push<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a>;
    fn deploy<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a>;
    fn destroy<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a>;
}

/// Shell commands for each phase of a command-backed unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhaseCommands {
    pub build: Option<String>,
    pub push: Option<String>,
    pub deploy: Option<String>,
    pub destroy: Option<String>,
}

impl PhaseCommands {
    pub fn get(&self, phase: Phase) -> Option<&str> {
        let command = match phase {
            Phase::Build => self.build.as_deref(),
            Phase::Push => self.push.as_deref(),
            Phase::Deploy => self.deploy.as_deref(),
            Phase::Destroy => self.destroy.as_deref(),
        };
        command.filter(|cmd| !cmd.trim().is_empty())
    }
}

/// A unit whose phases are shell commands.
#[derive(Debug, Clone)]
pub struct CommandUnit {
    pub name: UnitName,
    pub commands: PhaseCommands,
    pub placeholders: Placeholders,
    pub workdir: PathBuf,
    pub env: BTreeMap<String, String>,
    pub timeout: Option<Duration>,
}

impl CommandUnit {
    /// The request `phase` would send to the runner, or `None` when no
    /// command is configured for it.
    pub fn request(&self, phase: Phase) -> Option<CommandRequest> {
        let template = self.commands.get(phase)?;

        let mut env = self.placeholders.env_vars();
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));

        Some(CommandRequest {
            unit: self.name.clone(),
            phase,
            command: self.placeholders.render(template),
            workdir: Some(self.workdir.clone()),
            env,
            timeout: self.timeout,
        })
    }

    fn run<'a>(
        &'a self,
        phase: Phase,
        ctx: &'a RunContext,
        runner: &'a dyn CommandRunner,
    ) -> PhaseFuture<'a> {
        Box::pin(async move {
            match self.request(phase) {
                Some(request) => runner.run(ctx, request).await,
                None => {
                    debug!(unit = %self.name, phase = %phase, "no command configured; skipping");
                    Ok(())
                }
            }
        })
    }
}

/// Logical grouping with no resources of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasUnit {
    pub name: UnitName,
}

/// Every kind of deployable unit.
#[derive(Debug, Clone)]
pub enum Unit {
    /// `type = "ecs"`: image build and push, then a service deploy.
    ContainerService(CommandUnit),
    /// `type = "serverless"`.
    ServerlessBundle(CommandUnit),
    /// `type = "alias"`.
    Alias(AliasUnit),
    /// `type = "helm"`.
    HelmChart(CommandUnit),
    /// Any `[infra.<name>]` stack.
    InfraStack(CommandUnit),
}

impl Unit {
    pub fn from_app(name: &str, app: &AppConfig, config: &ConfigFile) -> Self {
        let path = app.path.clone().unwrap_or_else(|| format!("apps/{name}"));
        let command_unit = || CommandUnit {
            name: name.to_string(),
            commands: PhaseCommands {
                build: app.build.clone(),
                push: app.push.clone(),
                deploy: app.deploy.clone(),
                destroy: app.destroy.clone(),
            },
            placeholders: placeholders(name, &path, config),
            workdir: config.root.clone(),
            env: app.env.clone(),
            timeout: app.timeout(),
        };

        match app.kind {
            AppKind::Ecs => Unit::ContainerService(command_unit()),
            AppKind::Serverless => Unit::ServerlessBundle(command_unit()),
            AppKind::Helm => Unit::HelmChart(command_unit()),
            AppKind::Alias => Unit::Alias(AliasUnit {
                name: name.to_string(),
            }),
        }
    }

    pub fn from_infra(name: &str, infra: &InfraConfig, config: &ConfigFile) -> Self {
        let path = infra.path.clone().unwrap_or_else(|| format!("infra/{name}"));
        Unit::InfraStack(CommandUnit {
            name: name.to_string(),
            commands: PhaseCommands {
                build: None,
                push: None,
                deploy: infra.deploy.clone(),
                destroy: infra.destroy.clone(),
            },
            placeholders: placeholders(name, &path, config),
            workdir: config.root.clone(),
            env: infra.env.clone(),
            timeout: infra.timeout(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Unit::Alias(alias) => &alias.name,
            Unit::ContainerService(u)
            | Unit::ServerlessBundle(u)
            | Unit::HelmChart(u)
            | Unit::InfraStack(u) => &u.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Unit::ContainerService(_) => "ecs",
            Unit::ServerlessBundle(_) => "serverless",
            Unit::Alias(_) => "alias",
            Unit::HelmChart(_) => "helm",
            Unit::InfraStack(_) => "infra",
        }
    }

    /// Whether `phase` does anything at all for this kind.
    pub fn supports(&self, phase: Phase) -> bool {
        match self {
            Unit::ContainerService(_) => true,
            Unit::Alias(_) => false,
            Unit::ServerlessBundle(_) | Unit::HelmChart(_) | Unit::InfraStack(_) => {
                matches!(phase, Phase::Deploy | Phase::Destroy)
            }
        }
    }

    /// The request `phase` would send to the runner; `None` when the phase is
    /// a no-op for this unit.
    pub fn request(&self, phase: Phase) -> Option<CommandRequest> {
        match self {
            Unit::Alias(_) => None,
            Unit::ContainerService(u)
            | Unit::ServerlessBundle(u)
            | Unit::HelmChart(u)
            | Unit::InfraStack(u) => {
                if self.supports(phase) {
                    u.request(phase)
                } else {
                    None
                }
            }
        }
    }

    /// Dispatch to the matching [`UnitManager`] method.
    pub fn run_phase<'a>(
        &'a self,
        phase: Phase,
        ctx: &'a RunContext,
        runner: &'a dyn CommandRunner,
    ) -> PhaseFuture<'a> {
        match phase {
            Phase::Build => self.build(ctx, runner),
            Phase::Push => self.push(ctx, runner),
            Phase::Deploy => self.deploy(ctx, runner),
            Phase::Destroy => self.destroy(ctx, runner),
        }
    }

    fn phase<'a>(
        &'a self,
        phase: Phase,
        ctx: &'a RunContext,
        runner: &'a dyn CommandRunner,
    ) -> PhaseFuture<'a> {
        match self {
            Unit::Alias(alias) => Box::pin(async move {
                if matches!(phase, Phase::Deploy | Phase::Destroy) {
                    info!(unit = %alias.name, phase = %phase, "alias {} completed", phase);
                }
                Ok(())
            }),
            Unit::ContainerService(u)
            | Unit::ServerlessBundle(u)
            | Unit::HelmChart(u)
            | Unit::InfraStack(u) => {
                if self.supports(phase) {
                    u.run(phase, ctx, runner)
                } else {
                    let kind = self.kind();
                    Box::pin(async move {
                        debug!(unit = %u.name, phase = %phase, kind, "phase is a no-op for this kind");
                        Ok(())
                    })
                }
            }
        }
    }
}

impl UnitManager for Unit {
    fn build<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a> {
        self.phase(Phase::Build, ctx, runner)
    }

    fn push<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a> {
        self.phase(Phase::Push, ctx, runner)
    }

    fn deploy<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a> {
        self.phase(Phase::Deploy, ctx, runner)
    }

    fn destroy<'a>(&'a self, ctx: &'a RunContext, runner: &'a dyn CommandRunner) -> PhaseFuture<'a> {
        self.phase(Phase::Destroy, ctx, runner)
    }
}

fn placeholders(name: &str, path: &str, config: &ConfigFile) -> Placeholders {
    Placeholders {
        name: name.to_string(),
        env: config.project.env.clone(),
        namespace: config.project.namespace.clone(),
        tag: config.project.tag.clone(),
        path: path.to_string(),
    }
}
