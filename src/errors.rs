// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::dag::Cycle;

#[derive(Error, Debug)]
pub enum RolloutError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unit not found: {0}")]
    UnknownUnit(String),

    #[error(transparent)]
    DagCycle(#[from] Cycle),

    /// A unit's callback failed. `error` is the callback's own error.
    #[error("unit '{unit}' failed: {error:#}")]
    UnitFailed { unit: String, error: anyhow::Error },

    #[error("run interrupted before all units completed")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RolloutError>;
