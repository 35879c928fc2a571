#![allow(dead_code)]

use taskgraph::config::{
    BindingOptions, ConfigFile, FileMappingConfig, FilesConfig, RawConfigFile, StringOrList,
    TargetConfig, TaskConfig, WatchBindingConfig,
};
use taskgraph::types::MergePolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_alias(mut self, name: &str, body: &[&str]) -> Self {
        self.config.alias.insert(
            name.to_string(),
            body.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_binding(mut self, name: &str, binding: WatchBindingConfig) -> Self {
        self.config.watch.bindings.push((name.to_string(), binding));
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.config.config.option_merge = policy;
        self
    }

    /// Keep incremental records in memory instead of `.taskgraph/cache`.
    pub fn with_memory_cache(mut self) -> Self {
        self.config.config.cache_storage = taskgraph::types::CacheStorageMode::Memory;
        self
    }

    pub fn raw(self) -> RawConfigFile {
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

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn runner(mut self, runner: &str) -> Self {
        self.task.runner = Some(runner.to_string());
        self
    }

    pub fn options(mut self, toml_src: &str) -> Self {
        self.task.options = toml::from_str(toml_src).expect("task options parse");
        self
    }

    pub fn target(mut self, name: &str, target: TargetConfig) -> Self {
        self.task.targets.push((name.to_string(), target));
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    pub fn new() -> Self {
        Self {
            target: TargetConfig::default(),
        }
    }

    /// Inline mapping: `cwd`, `dest`, expanded `src` patterns.
    pub fn expanded(mut self, cwd: &str, dest: &str, src: &[&str]) -> Self {
        self.target.cwd = Some(cwd.to_string());
        self.target.dest = Some(dest.to_string());
        self.target.expand = true;
        self.target.src = Some(list(src));
        self
    }

    /// Inline literal `src` paths.
    pub fn literal(mut self, src: &[&str]) -> Self {
        self.target.src = Some(list(src));
        self
    }

    pub fn mapping(mut self, mapping: FileMappingConfig) -> Self {
        match &mut self.target.files {
            Some(FilesConfig::List(list)) => list.push(mapping),
            _ => self.target.files = Some(FilesConfig::List(vec![mapping])),
        }
        self
    }

    pub fn options(mut self, toml_src: &str) -> Self {
        self.target.options = toml::from_str(toml_src).expect("target options parse");
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }
}

impl Default for TargetConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Watch binding with the given patterns and task references.
pub fn binding(files: &[&str], tasks: &[&str], debounce_ms: u64, spawn: bool) -> WatchBindingConfig {
    WatchBindingConfig {
        files: list(files),
        tasks: tasks.iter().map(|s| s.to_string()).collect(),
        options: BindingOptions {
            spawn: Some(spawn),
            livereload: None,
            debounce_delay: Some(debounce_ms),
        },
    }
}

fn list(items: &[&str]) -> StringOrList {
    StringOrList::Many(items.iter().map(|s| s.to_string()).collect())
}
