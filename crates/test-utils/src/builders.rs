#![allow(dead_code)]

use std::collections::BTreeMap;

use rollout::config::{AppConfig, ConfigFile, InfraConfig, ProjectSection, RawConfigFile};
use rollout::dag::{UnitName, UnitSpec};
use rollout::types::AppKind;

/// Builder for the `name -> UnitSpec` map the scheduler consumes.
#[derive(Debug, Default)]
pub struct UnitSetBuilder {
    units: BTreeMap<UnitName, UnitSpec>,
}

impl UnitSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name`, depending on every unit in `deps`.
    pub fn unit(mut self, name: &str, deps: &[&str]) -> Self {
        let spec = UnitSpec::new(name).depends_on(deps.iter().copied());
        self.units.insert(name.to_string(), spec);
        self
    }

    pub fn build(self) -> BTreeMap<UnitName, UnitSpec> {
        self.units
    }
}

/// `C -> B -> A` (C depends on B, B depends on A).
pub fn chain() -> BTreeMap<UnitName, UnitSpec> {
    UnitSetBuilder::new()
        .unit("A", &[])
        .unit("B", &["A"])
        .unit("C", &["B"])
        .build()
}

/// `D` depends on `B` and `C`, both of which depend on `A`.
pub fn diamond() -> BTreeMap<UnitName, UnitSpec> {
    UnitSetBuilder::new()
        .unit("A", &[])
        .unit("B", &["A"])
        .unit("C", &["A"])
        .unit("D", &["B", "C"])
        .build()
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection::default(),
                infra: BTreeMap::new(),
                app: BTreeMap::new(),
            },
        }
    }

    pub fn with_project(mut self, namespace: &str, env: &str) -> Self {
        self.config.project.namespace = namespace.to_string();
        self.config.project.env = env.to_string();
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.config.project.tag = tag.to_string();
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.config.project.max_concurrency = Some(n);
        self
    }

    pub fn with_fail_stop(mut self, val: bool) -> Self {
        self.config.project.fail_stop = val;
        self
    }

    pub fn with_app(mut self, name: &str, app: AppConfig) -> Self {
        self.config.app.insert(name.to_string(), app);
        self
    }

    pub fn with_infra(mut self, name: &str, infra: InfraConfig) -> Self {
        self.config.infra.insert(name.to_string(), infra);
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `AppConfig`.
pub struct AppConfigBuilder {
    app: AppConfig,
}

impl AppConfigBuilder {
    pub fn new(kind: AppKind) -> Self {
        Self {
            app: AppConfig {
                kind,
                ..AppConfig::default()
            },
        }
    }

    /// An `ecs` app with a command for every phase: `build {name}`,
    /// `push {name}`, `deploy {name}`, `destroy {name}`.
    pub fn ecs() -> Self {
        Self::new(AppKind::Ecs)
            .build_cmd("build {name}")
            .push_cmd("push {name}")
            .deploy_cmd("deploy {name}")
            .destroy_cmd("destroy {name}")
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.app.depends_on.push(dep.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.app.path = Some(path.to_string());
        self
    }

    pub fn build_cmd(mut self, cmd: &str) -> Self {
        self.app.build = Some(cmd.to_string());
        self
    }

    pub fn push_cmd(mut self, cmd: &str) -> Self {
        self.app.push = Some(cmd.to_string());
        self
    }

    pub fn deploy_cmd(mut self, cmd: &str) -> Self {
        self.app.deploy = Some(cmd.to_string());
        self
    }

    pub fn destroy_cmd(mut self, cmd: &str) -> Self {
        self.app.destroy = Some(cmd.to_string());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.app.timeout_secs = Some(secs);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.app.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> AppConfig {
        self.app
    }
}

/// Builder for `InfraConfig`.
pub struct InfraConfigBuilder {
    infra: InfraConfig,
}

impl InfraConfigBuilder {
    /// A stack with `deploy {name}` / `destroy {name}` commands.
    pub fn new() -> Self {
        Self {
            infra: InfraConfig {
                deploy: Some("deploy {name}".to_string()),
                destroy: Some("destroy {name}".to_string()),
                ..InfraConfig::default()
            },
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.infra.depends_on.push(dep.to_string());
        self
    }

    pub fn deploy_cmd(mut self, cmd: &str) -> Self {
        self.infra.deploy = Some(cmd.to_string());
        self
    }

    pub fn destroy_cmd(mut self, cmd: &str) -> Self {
        self.infra.destroy = Some(cmd.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.infra.path = Some(path.to_string());
        self
    }

    pub fn build(self) -> InfraConfig {
        self.infra
    }
}

impl Default for InfraConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
