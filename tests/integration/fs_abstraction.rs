// tests/integration/fs_abstraction.rs

use std::path::{Path, PathBuf};

use rollout::config::load_and_validate_with;
use rollout::errors::RolloutError;
use rollout::fs::FileSystem;
use rollout::fs::mock::MockFileSystem;

const CONFIG: &str = r#"
[project]
namespace = "acme"

[app.api]
deploy = "echo api"
"#;

#[test]
fn test_mock_fs_basics() {
    let fs = MockFileSystem::new();
    fs.add_file("project/rollout.toml", CONFIG);

    assert!(fs.is_file(Path::new("project/rollout.toml")));
    assert!(fs.exists(Path::new("project")));
    assert!(!fs.is_file(Path::new("project")));
    assert!(fs.read_to_string(Path::new("project")).is_err());
    assert_eq!(fs.read_to_string(Path::new("project/rollout.toml")).unwrap(), CONFIG);

    assert!(fs.remove_file("project/rollout.toml"));
    assert!(!fs.exists(Path::new("project")));
}

#[test]
fn test_loader_reads_through_mock_fs() {
    let fs = MockFileSystem::new();
    fs.add_file("configs/rollout.toml", CONFIG);

    let cfg = load_and_validate_with(&fs, "configs/rollout.toml").unwrap();

    assert_eq!(cfg.project.namespace, "acme");
    assert!(cfg.app.contains_key("api"));
    assert_eq!(cfg.root, PathBuf::from("configs"));
}

#[test]
fn test_bare_file_name_runs_commands_in_current_dir() {
    let fs = MockFileSystem::new();
    fs.add_file("rollout.toml", CONFIG);

    let cfg = load_and_validate_with(&fs, "rollout.toml").unwrap();
    assert_eq!(cfg.root, PathBuf::from("."));
}

#[test]
fn test_missing_file_is_reported() {
    let fs = MockFileSystem::new();

    match load_and_validate_with(&fs, "nope.toml") {
        Err(RolloutError::Other(err)) => {
            assert!(format!("{err:#}").contains("nope.toml"));
        }
        other => panic!("expected Other error, got {other:?}"),
    }
}

#[test]
fn test_invalid_toml_is_a_toml_error() {
    let fs = MockFileSystem::new();
    fs.add_file("rollout.toml", "[app.api\ndeploy = 1");

    assert!(matches!(
        load_and_validate_with(&fs, "rollout.toml"),
        Err(RolloutError::TomlError(_))
    ));
}
