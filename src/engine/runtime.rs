// src/engine/runtime.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{info, warn};

use crate::config::{ConfigFile, Section};
use crate::dag::{RunContext, RunOptions, UnitName, UnitSpec, plan_waves, run_in_dependency_order};
use crate::errors::{Result, RolloutError};
use crate::exec::CommandRunner;
use crate::types::Phase;
use crate::units::Unit;

use super::{Operation, Stage};

/// Units and dependency map of one config section.
#[derive(Debug)]
struct SectionUnits {
    units: Arc<BTreeMap<UnitName, Unit>>,
    specs: BTreeMap<UnitName, UnitSpec>,
}

/// Runs operations over every unit of a validated config.
///
/// The engine owns no mutable state; each call builds a fresh graph per
/// stage, so one engine can run several operations in a row.
pub struct Engine {
    infra: SectionUnits,
    apps: SectionUnits,
    runner: Arc<dyn CommandRunner>,
    options: RunOptions,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("infra", &self.infra.specs.keys())
            .field("apps", &self.apps.specs.keys())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build every unit of `config`, using the `[project]` run options.
    pub fn new(config: &ConfigFile, runner: Arc<dyn CommandRunner>) -> Self {
        let infra = config
            .infra
            .iter()
            .map(|(name, cfg)| (name.clone(), Unit::from_infra(name, cfg, config)))
            .collect();
        let apps = config
            .app
            .iter()
            .map(|(name, cfg)| (name.clone(), Unit::from_app(name, cfg, config)))
            .collect();

        Self {
            infra: SectionUnits {
                units: Arc::new(infra),
                specs: config.unit_specs(Section::Infra),
            },
            apps: SectionUnits {
                units: Arc::new(apps),
                specs: config.unit_specs(Section::App),
            },
            runner,
            options: config.run_options(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> RunOptions {
        self.options
    }

    /// Look a unit up in either section.
    pub fn unit(&self, name: &str) -> Option<&Unit> {
        self.apps
            .units
            .get(name)
            .or_else(|| self.infra.units.get(name))
    }

    fn section(&self, section: Section) -> &SectionUnits {
        match section {
            Section::Infra => &self.infra,
            Section::App => &self.apps,
        }
    }

    /// Run `operation` over every unit, stage by stage.
    ///
    /// A failed or interrupted stage ends the operation; later stages never
    /// start.
    pub async fn run_all(&self, ctx: &RunContext, operation: Operation) -> Result<()> {
        info!(%operation, "starting operation over all units");

        for &section in operation.sections() {
            let phases = operation.phases(section);
            let group = self.section(section);
            if phases.is_empty() || group.specs.is_empty() {
                continue;
            }

            info!(%operation, %section, units = group.specs.len(), "starting stage");
            self.run_stage(ctx, operation, group, phases).await?;
        }

        info!(%operation, "operation completed");
        Ok(())
    }

    async fn run_stage(
        &self,
        ctx: &RunContext,
        operation: Operation,
        group: &SectionUnits,
        phases: &'static [Phase],
    ) -> Result<()> {
        let units = Arc::clone(&group.units);
        let runner = Arc::clone(&self.runner);

        run_in_dependency_order(
            ctx,
            &group.specs,
            operation.direction(),
            self.options,
            move |ctx, name| {
                let units = Arc::clone(&units);
                let runner = Arc::clone(&runner);
                async move {
                    let unit = units
                        .get(&name)
                        .ok_or_else(|| anyhow!("unit '{name}' has no definition"))?;
                    for &phase in phases {
                        unit.run_phase(phase, &ctx, runner.as_ref()).await?;
                    }
                    Ok::<(), anyhow::Error>(())
                }
            },
        )
        .await
    }

    /// Run `operation` for one unit only, ignoring its dependencies.
    pub async fn run_unit(&self, ctx: &RunContext, operation: Operation, name: &str) -> Result<()> {
        let (section, unit) = if let Some(unit) = self.apps.units.get(name) {
            (Section::App, unit)
        } else if let Some(unit) = self.infra.units.get(name) {
            (Section::Infra, unit)
        } else {
            return Err(RolloutError::UnknownUnit(name.to_string()));
        };

        let phases = operation.phases(section);
        if phases.is_empty() {
            warn!(%operation, unit = %name, %section, "operation does not apply to this unit");
            return Ok(());
        }

        info!(%operation, unit = %name, kind = unit.kind(), "running single unit");
        for &phase in phases {
            if ctx.is_cancelled() {
                return Err(RolloutError::Interrupted);
            }
            unit.run_phase(phase, ctx, self.runner.as_ref())
                .await
                .map_err(|error| RolloutError::UnitFailed {
                    unit: name.to_string(),
                    error,
                })?;
        }

        info!(%operation, unit = %name, "unit completed");
        Ok(())
    }

    /// The stages `operation` would run, without running anything.
    pub fn plan(&self, operation: Operation) -> Result<Vec<Stage>> {
        let mut stages = Vec::new();

        for &section in operation.sections() {
            let phases = operation.phases(section);
            let group = self.section(section);
            if phases.is_empty() || group.specs.is_empty() {
                continue;
            }

            stages.push(Stage {
                section,
                direction: operation.direction(),
                phases,
                waves: plan_waves(&group.specs, operation.direction())?,
            });
        }

        Ok(stages)
    }
}
