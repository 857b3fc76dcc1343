// src/config/mod.rs

//! Configuration loading and validation for rollout.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file through the [`crate::fs::FileSystem`] abstraction (`loader.rs`).
//! - Validate names, dependencies, commands and acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_and_validate_with};
pub use model::{AppConfig, ConfigFile, InfraConfig, ProjectSection, RawConfigFile, Section};
