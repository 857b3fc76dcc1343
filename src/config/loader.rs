// src/config/loader.rs

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "ROLLOUT_CONFIG";

/// Config file used when neither `--config` nor `ROLLOUT_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "rollout.toml";

fn load_raw(fs: &dyn FileSystem, path: &Path) -> Result<RawConfigFile> {
    let contents = fs
        .read_to_string(path)
        .with_context(|| format!("loading config {}", path.display()))?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from disk and validate it.
///
/// This is the recommended entry point for the rest of the application.
/// Commands of the returned config run in the directory holding the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    load_and_validate_with(&RealFileSystem, path)
}

/// Same as [`load_and_validate`], reading through `fs`.
pub fn load_and_validate_with(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_raw(fs, path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config.with_root(config_root_dir(path)))
}

/// Resolve the config path: `ROLLOUT_CONFIG` if set, else `rollout.toml` in
/// the current working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// "configs/rollout.toml" gives "configs"; a bare file name gives ".".
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
