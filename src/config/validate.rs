// src/config/validate.rs

use globset::Glob;
use tracing::warn;

use crate::config::model::{ConfigFile, FilesConfig, RawConfigFile, TargetConfig};
use crate::errors::{Result, TaskgraphError};
use crate::graph::invocation::WATCH_TASK;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

/// Structural validation only. Alias references and cycles are checked by the
/// expander, where they get their dedicated error variants.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_work(cfg)?;
    validate_names(cfg)?;
    validate_aliases(cfg)?;
    validate_targets(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn ensure_has_work(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() && cfg.alias.is_empty() {
        return Err(TaskgraphError::ConfigError(
            "config must contain at least one [task.<name>] or [alias] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.task.keys().chain(cfg.alias.keys()) {
        if name.trim().is_empty() {
            return Err(TaskgraphError::ConfigError(
                "task and alias names must not be empty".to_string(),
            ));
        }
        if name.contains(':') {
            return Err(TaskgraphError::ConfigError(format!(
                "name '{}' must not contain ':' (reserved as task:target separator)",
                name
            )));
        }
    }

    if cfg.task.contains_key(WATCH_TASK) || cfg.alias.contains_key(WATCH_TASK) {
        return Err(TaskgraphError::ConfigError(format!(
            "'{}' is reserved for the watch loop; configure it under [watch]",
            WATCH_TASK
        )));
    }

    for name in cfg.alias.keys() {
        if cfg.task.contains_key(name) {
            warn!(alias = %name, "alias shadows a task of the same name");
        }
    }

    Ok(())
}

fn validate_aliases(cfg: &RawConfigFile) -> Result<()> {
    for (name, body) in cfg.alias.iter() {
        if body.is_empty() {
            return Err(TaskgraphError::ConfigError(format!(
                "alias '{}' has an empty task list",
                name
            )));
        }
        if body.iter().any(|r| r.trim().is_empty()) {
            return Err(TaskgraphError::ConfigError(format!(
                "alias '{}' contains an empty reference",
                name
            )));
        }
    }
    Ok(())
}

fn validate_targets(cfg: &RawConfigFile) -> Result<()> {
    for (task_name, task) in cfg.task.iter() {
        let mut seen = std::collections::HashSet::new();
        for (target_name, target) in task.targets.iter() {
            if !seen.insert(target_name.as_str()) {
                return Err(TaskgraphError::ConfigError(format!(
                    "task '{}' declares target '{}' twice",
                    task_name, target_name
                )));
            }
            validate_target(task_name, target_name, target)?;
        }
    }
    Ok(())
}

fn validate_target(task: &str, target: &str, cfg: &TargetConfig) -> Result<()> {
    if cfg.files.is_some() && cfg.src.is_some() {
        return Err(TaskgraphError::ConfigError(format!(
            "target '{}:{}' sets both `files` and `src`; use one of them",
            task, target
        )));
    }

    match &cfg.files {
        Some(FilesConfig::List(list)) => {
            for mapping in list {
                if mapping.src.to_vec().is_empty() {
                    return Err(TaskgraphError::ConfigError(format!(
                        "target '{}:{}' has a file mapping with no `src`",
                        task, target
                    )));
                }
            }
        }
        Some(FilesConfig::Compact(map)) => {
            if map.iter().any(|(dest, _)| dest.trim().is_empty()) {
                return Err(TaskgraphError::ConfigError(format!(
                    "target '{}:{}' has an empty destination in `files`",
                    task, target
                )));
            }
        }
        None => {}
    }

    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    for (name, binding) in cfg.watch.bindings.iter() {
        let patterns = binding.files.to_vec();
        if patterns.is_empty() {
            return Err(TaskgraphError::ConfigError(format!(
                "watch binding '{}' must declare at least one `files` pattern",
                name
            )));
        }
        for pat in patterns {
            let pat = pat.strip_prefix('!').unwrap_or(&pat);
            Glob::new(pat).map_err(|e| {
                TaskgraphError::ConfigError(format!(
                    "watch binding '{}' has invalid pattern '{}': {}",
                    name, pat, e
                ))
            })?;
        }
    }
    Ok(())
}
