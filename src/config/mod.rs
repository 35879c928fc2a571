// src/config/mod.rs

//! Configuration loading and validation for taskgraph.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate structural invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path, load_from_str};
pub use model::{
    BindingOptions, ConfigFile, ConfigSection, FileMappingConfig, FilesConfig, LiveReloadSetting,
    RawConfigFile, StringOrList, TargetConfig, TaskConfig, WatchBindingConfig, WatchSection,
};
