// src/config/validate.rs

use std::collections::BTreeMap;

use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile, Section};
use crate::dag::{Graph, Status, UnitName, UnitSpec};
use crate::errors::{Result, RolloutError};
use crate::types::AppKind;

/// Unit names end up in shell commands and environment variables.
pub const UNIT_NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.-]*$";

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RolloutError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_units(cfg)?;
    validate_project(cfg)?;
    validate_unit_names(cfg)?;
    validate_dependencies(cfg)?;
    validate_commands(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_units(cfg: &RawConfigFile) -> Result<()> {
    if cfg.app.is_empty() && cfg.infra.is_empty() {
        return Err(RolloutError::ConfigError(
            "config must contain at least one [app.<name>] or [infra.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.max_concurrency == Some(0) {
        return Err(RolloutError::ConfigError(
            "[project].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.project.tag.trim().is_empty() {
        return Err(RolloutError::ConfigError(
            "[project].tag must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_unit_names(cfg: &RawConfigFile) -> Result<()> {
    let pattern = Regex::new(UNIT_NAME_PATTERN)
        .map_err(|err| RolloutError::ConfigError(format!("invalid unit name pattern: {err}")))?;

    let names = cfg
        .infra
        .keys()
        .map(|name| (Section::Infra, name))
        .chain(cfg.app.keys().map(|name| (Section::App, name)));

    for (section, name) in names {
        if !pattern.is_match(name) {
            return Err(RolloutError::ConfigError(format!(
                "invalid unit name '{name}' in [{section}.{name}]: must match {UNIT_NAME_PATTERN}"
            )));
        }
    }

    if let Some(name) = cfg.app.keys().find(|name| cfg.infra.contains_key(*name)) {
        return Err(RolloutError::ConfigError(format!(
            "unit '{name}' is defined in both [app] and [infra]"
        )));
    }

    Ok(())
}

fn validate_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, app) in cfg.app.iter() {
        check_deps(Section::App, name, &app.depends_on, |dep| cfg.app.contains_key(dep), |dep| {
            cfg.infra.contains_key(dep)
        })?;
    }
    for (name, infra) in cfg.infra.iter() {
        check_deps(Section::Infra, name, &infra.depends_on, |dep| cfg.infra.contains_key(dep), |dep| {
            cfg.app.contains_key(dep)
        })?;
    }
    Ok(())
}

fn check_deps(
    section: Section,
    name: &str,
    deps: &[String],
    in_section: impl Fn(&str) -> bool,
    in_other_section: impl Fn(&str) -> bool,
) -> Result<()> {
    for dep in deps {
        if in_section(dep) {
            continue;
        }
        let reason = if in_other_section(dep) {
            "dependencies cannot cross the [app]/[infra] boundary"
        } else {
            "no such unit"
        };
        return Err(RolloutError::ConfigError(format!(
            "{section} '{name}' has unknown dependency '{dep}' in `depends_on` ({reason})"
        )));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, app) in cfg.app.iter() {
        if app.kind != AppKind::Alias && is_blank(&app.deploy) {
            return Err(RolloutError::ConfigError(format!(
                "app '{name}' of type {} needs a `deploy` command",
                app.kind
            )));
        }
    }
    for (name, infra) in cfg.infra.iter() {
        if is_blank(&infra.deploy) {
            return Err(RolloutError::ConfigError(format!(
                "infra '{name}' needs a `deploy` command"
            )));
        }
    }
    Ok(())
}

fn is_blank(command: &Option<String>) -> bool {
    command.as_deref().is_none_or(|c| c.trim().is_empty())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    check_acyclic(cfg.infra.iter().map(|(name, infra)| (name, &infra.depends_on)))?;
    check_acyclic(cfg.app.iter().map(|(name, app)| (name, &app.depends_on)))?;
    Ok(())
}

fn check_acyclic<'a>(units: impl Iterator<Item = (&'a String, &'a Vec<String>)>) -> Result<()> {
    let specs: BTreeMap<UnitName, UnitSpec> = units
        .map(|(name, deps)| (name.clone(), UnitSpec::new(name.clone()).depends_on(deps.iter().cloned())))
        .collect();

    Graph::from_units(&specs, Status::Pending)?.detect_cycle()?;
    Ok(())
}

/// Validate an already constructed `ConfigFile` again, e.g. after tests
/// mutate its public fields.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    validate_raw_config(&RawConfigFile {
        project: cfg.project.clone(),
        infra: cfg.infra.clone(),
        app: cfg.app.clone(),
    })
}
