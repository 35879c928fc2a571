// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// A file mapping could not be resolved (missing `cwd`, bad glob).
    #[error("Resolution error for {path:?}: {reason}")]
    Resolution { path: PathBuf, reason: String },

    #[error("Unknown target '{target}' for task '{task}'")]
    UnknownTarget { task: String, target: String },

    #[error("Unknown task or alias: {0}")]
    UnknownTask(String),

    /// The payload is the cycle itself, e.g. `build -> assets -> build`.
    #[error("Cyclic alias: {0}")]
    CyclicAlias(String),

    #[error("Runner failed for '{invocation}': {message}")]
    RunnerFailure { invocation: String, message: String },

    #[error("Watch run failed for binding '{binding}': {message}")]
    WatchRunFailure { binding: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskgraphError>;
