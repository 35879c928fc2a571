// src/registry/mod.rs

//! Target registry: per task, the ordered targets with their options and
//! file mappings.

pub mod merge;

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{Result, TaskgraphError};
use crate::resolve::{mappings_for_target, FileMapping};
use crate::types::MergePolicy;

pub use merge::merge_options;

/// What the dispatcher needs to run one `task[:target]` invocation.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub task: String,
    pub target: Option<String>,
    /// Name of the registered runner to call.
    pub runner: String,
    /// Task defaults with target options merged over them.
    pub options: toml::Table,
    pub mappings: Vec<FileMapping>,
}

#[derive(Debug, Clone)]
struct TaskEntry {
    runner: String,
    options: toml::Table,
    targets: Vec<(String, TargetEntry)>,
}

#[derive(Debug, Clone)]
struct TargetEntry {
    options: toml::Table,
    mappings: Vec<FileMapping>,
}

/// Immutable after construction in production: built once from the
/// [`ConfigFile`]. The `register*` methods exist for programmatic setups
/// and tests.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    policy: MergePolicy,
    tasks: BTreeMap<String, TaskEntry>,
}

impl TargetRegistry {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            tasks: BTreeMap::new(),
        }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut registry = Self::new(cfg.config_section().option_merge);

        for (name, task) in cfg.tasks().iter() {
            registry.register_task(name, task.runner_name(name), task.options.clone());
            for (target_name, target) in task.targets.iter() {
                registry.register(
                    name,
                    target_name,
                    target.options.clone(),
                    mappings_for_target(target),
                );
            }
        }

        registry
    }

    /// Declare a task with its runner and default options.
    pub fn register_task(&mut self, task: &str, runner: &str, options: toml::Table) {
        let entry = self.tasks.entry(task.to_string()).or_insert_with(|| TaskEntry {
            runner: runner.to_string(),
            options: toml::Table::new(),
            targets: Vec::new(),
        });
        entry.runner = runner.to_string();
        entry.options = options;
    }

    /// Register (or replace) a target. Unknown tasks are created with the
    /// task name as runner and no default options.
    pub fn register(
        &mut self,
        task: &str,
        target: &str,
        options: toml::Table,
        mappings: Vec<FileMapping>,
    ) {
        let entry = self.tasks.entry(task.to_string()).or_insert_with(|| TaskEntry {
            runner: task.to_string(),
            options: toml::Table::new(),
            targets: Vec::new(),
        });

        let new_target = TargetEntry { options, mappings };
        match entry.targets.iter().position(|(name, _)| name == target) {
            Some(idx) => entry.targets[idx].1 = new_target,
            None => entry.targets.push((target.to_string(), new_target)),
        }

        debug!(task = %task, target = %target, "registered target");
    }

    pub fn has_task(&self, task: &str) -> bool {
        self.tasks.contains_key(task)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Target names of `task` in registration order.
    pub fn target_names(&self, task: &str) -> Option<Vec<&str>> {
        self.tasks
            .get(task)
            .map(|t| t.targets.iter().map(|(n, _)| n.as_str()).collect())
    }

    pub fn runner_of(&self, task: &str) -> Option<&str> {
        self.tasks.get(task).map(|t| t.runner.as_str())
    }

    /// Merged options and mappings for `task:target`, or for a task without
    /// targets when `target` is `None`.
    pub fn get(&self, task: &str, target: Option<&str>) -> Result<ResolvedTarget> {
        let entry = self
            .tasks
            .get(task)
            .ok_or_else(|| TaskgraphError::UnknownTask(task.to_string()))?;

        let Some(target) = target else {
            return Ok(ResolvedTarget {
                task: task.to_string(),
                target: None,
                runner: entry.runner.clone(),
                options: entry.options.clone(),
                mappings: Vec::new(),
            });
        };

        let (_, target_entry) = entry
            .targets
            .iter()
            .find(|(name, _)| name == target)
            .ok_or_else(|| TaskgraphError::UnknownTarget {
                task: task.to_string(),
                target: target.to_string(),
            })?;

        Ok(ResolvedTarget {
            task: task.to_string(),
            target: Some(target.to_string()),
            runner: entry.runner.clone(),
            options: merge_options(&entry.options, &target_entry.options, self.policy),
            mappings: target_entry.mappings.clone(),
        })
    }
}
