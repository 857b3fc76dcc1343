// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::{RunOptions, UnitName, UnitSpec};
use crate::types::AppKind;

/// Configuration exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [project]
/// namespace = "acme"
/// env = "dev"
///
/// [infra.network]
/// deploy = "terraform apply -auto-approve"
///
/// [app.api]
/// depends_on = ["db"]
/// deploy = "ecs-deploy {name} {tag}"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    /// Infrastructure stacks from `[infra.<name>]`.
    #[serde(default)]
    pub infra: BTreeMap<String, InfraConfig>,

    /// Applications from `[app.<name>]`.
    #[serde(default)]
    pub app: BTreeMap<String, AppConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holding one means the
/// unit names, dependencies and commands have been checked and both sections
/// are acyclic.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub infra: BTreeMap<String, InfraConfig>,
    pub app: BTreeMap<String, AppConfig>,
    /// Directory commands run in; the directory holding the config file.
    pub root: PathBuf,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            infra: raw.infra,
            app: raw.app,
            root: PathBuf::from("."),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Dependency map of one section, as the scheduler consumes it.
    pub fn unit_specs(&self, section: Section) -> BTreeMap<UnitName, UnitSpec> {
        match section {
            Section::Infra => specs(&self.infra, |cfg| &cfg.depends_on),
            Section::App => specs(&self.app, |cfg| &cfg.depends_on),
        }
    }

    /// Which section a unit name belongs to.
    pub fn section_of(&self, name: &str) -> Option<Section> {
        if self.app.contains_key(name) {
            Some(Section::App)
        } else if self.infra.contains_key(name) {
            Some(Section::Infra)
        } else {
            None
        }
    }

    pub fn unit_count(&self) -> usize {
        self.app.len() + self.infra.len()
    }

    /// Scheduler options from `[project]`.
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_concurrency: self.project.max_concurrency,
            fail_stop: self.project.fail_stop,
        }
    }
}

fn specs<T>(
    units: &BTreeMap<String, T>,
    deps: impl Fn(&T) -> &Vec<String>,
) -> BTreeMap<UnitName, UnitSpec> {
    units
        .iter()
        .map(|(name, cfg)| {
            let spec = UnitSpec::new(name.clone()).depends_on(deps(cfg).iter().cloned());
            (name.clone(), spec)
        })
        .collect()
}

/// The two unit sections of a config file. Dependencies never cross them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Infra,
    App,
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Section::Infra => f.write_str("infra"),
            Section::App => f.write_str("app"),
        }
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_env")]
    pub env: String,

    /// Image / release tag substituted for `{tag}`.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Upper bound on units running at the same time; unbounded when absent.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Stop launching new units after the first failure.
    #[serde(default)]
    pub fail_stop: bool,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            env: default_env(),
            tag: default_tag(),
            max_concurrency: None,
            fail_stop: false,
        }
    }
}

/// `[app.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// `type = "ecs" | "serverless" | "alias" | "helm"`.
    #[serde(default, rename = "type")]
    pub kind: AppKind,

    /// Apps that must be deployed before this one.
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Source directory, substituted for `{path}`. Defaults to `apps/<name>`.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub push: Option<String>,

    #[serde(default)]
    pub deploy: Option<String>,

    #[serde(default)]
    pub destroy: Option<String>,

    /// Per-command timeout in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Extra environment variables for every command of this app.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[infra.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InfraConfig {
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Stack directory, substituted for `{path}`. Defaults to `infra/<name>`.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub deploy: Option<String>,

    #[serde(default)]
    pub destroy: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl InfraConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
