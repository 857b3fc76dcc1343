// tests/integration/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;
use rollout::config::{Section, load_and_validate};
use rollout::errors::RolloutError;
use rollout::types::AppKind;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

fn config_error(contents: &str) -> String {
    let file = write_config(contents);
    match load_and_validate(file.path()) {
        Err(RolloutError::ConfigError(msg)) => msg,
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_full_config_is_parsed_with_defaults() {
    let file = write_config(
        r#"
[project]
namespace = "acme"

[infra.network]
deploy = "terraform apply"

[app.db]
type = "helm"
deploy = "helm upgrade --install db charts/db"

[app.api]
depends_on = ["db"]
deploy = "ecs-deploy api"
timeout_secs = 30
env = { LOG_LEVEL = "debug" }
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.project.namespace, "acme");
    assert_eq!(cfg.project.env, "dev");
    assert_eq!(cfg.project.tag, "latest");
    assert_eq!(cfg.project.max_concurrency, None);
    assert!(!cfg.project.fail_stop);

    assert_eq!(cfg.app["db"].kind, AppKind::Helm);
    assert_eq!(cfg.app["api"].kind, AppKind::Ecs);
    assert_eq!(cfg.app["api"].timeout_secs, Some(30));
    assert_eq!(cfg.app["api"].env["LOG_LEVEL"], "debug");

    assert_eq!(cfg.section_of("api"), Some(Section::App));
    assert_eq!(cfg.section_of("network"), Some(Section::Infra));
    assert_eq!(cfg.section_of("ghost"), None);

    let specs = cfg.unit_specs(Section::App);
    assert_eq!(specs["api"].depends_on, vec!["db"]);
    assert_eq!(cfg.root, file.path().parent().unwrap());
}

#[test]
fn test_dag_cycle_returns_structured_error() {
    let file = write_config(
        r#"
[app.A]
deploy = "echo A"
depends_on = ["B"]

[app.B]
deploy = "echo B"
depends_on = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(RolloutError::DagCycle(cycle)) => {
            assert_eq!(cycle.to_string(), "cycle found: A -> B -> A");
        }
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let file = write_config(
        r#"
[infra.net]
deploy = "echo net"
depends_on = ["net"]
"#,
    );

    let err = load_and_validate(file.path()).unwrap_err();
    assert_eq!(err.to_string(), "cycle found: net -> net");
}

#[test]
fn test_unknown_dependency_returns_config_error() {
    let msg = config_error(
        r#"
[app.api]
deploy = "echo api"
depends_on = ["db"]
"#,
    );
    assert!(msg.contains("unknown dependency 'db'"), "{msg}");
}

#[test]
fn test_cross_section_dependency_is_rejected() {
    let msg = config_error(
        r#"
[infra.network]
deploy = "echo net"

[app.api]
deploy = "echo api"
depends_on = ["network"]
"#,
    );
    assert!(msg.contains("[app]/[infra]"), "{msg}");
}

#[test]
fn test_empty_config_is_rejected() {
    let msg = config_error("[project]\nnamespace = \"acme\"\n");
    assert!(msg.contains("at least one"), "{msg}");
}

#[test]
fn test_invalid_unit_name_is_rejected() {
    let msg = config_error(
        r#"
[app."-bad"]
deploy = "echo bad"
"#,
    );
    assert!(msg.contains("invalid unit name '-bad'"), "{msg}");
}

#[test]
fn test_missing_deploy_command_is_rejected_except_for_alias() {
    let msg = config_error(
        r#"
[app.api]
build = "docker build ."
"#,
    );
    assert!(msg.contains("needs a `deploy` command"), "{msg}");

    let file = write_config(
        r#"
[app.group]
type = "alias"
"#,
    );
    assert!(load_and_validate(file.path()).is_ok());
}

#[test]
fn test_zero_max_concurrency_is_rejected() {
    let msg = config_error(
        r#"
[project]
max_concurrency = 0

[app.api]
deploy = "echo api"
"#,
    );
    assert!(msg.contains("max_concurrency"), "{msg}");
}

#[test]
fn test_duplicate_name_across_sections_is_rejected() {
    let msg = config_error(
        r#"
[infra.shared]
deploy = "echo infra"

[app.shared]
deploy = "echo app"
"#,
    );
    assert!(msg.contains("both [app] and [infra]"), "{msg}");
}

#[test]
fn test_unknown_app_type_is_a_toml_error() {
    let file = write_config(
        r#"
[app.api]
type = "lambda"
deploy = "echo api"
"#,
    );
    assert!(matches!(
        load_and_validate(file.path()),
        Err(RolloutError::TomlError(_))
    ));
}

#[test]
fn test_revalidating_a_mutated_config_catches_new_errors() {
    let file = write_config(
        r#"
[app.api]
deploy = "echo api"
"#,
    );
    let mut cfg = load_and_validate(file.path()).unwrap();
    assert!(rollout::config::validate::validate_config(&cfg).is_ok());

    cfg.app.get_mut("api").unwrap().depends_on.push("ghost".to_string());
    assert!(matches!(
        rollout::config::validate::validate_config(&cfg),
        Err(RolloutError::ConfigError(_))
    ));
}
