// src/config/model.rs

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use crate::types::{CacheStorageMode, ExtDot, MergePolicy, PathFilter};

/// Default live-reload port when a binding sets `livereload = true`.
pub const DEFAULT_LIVERELOAD_PORT: u16 = 35729;

/// Default debounce window for watch bindings, in milliseconds.
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 500;

/// Top-level configuration exactly as deserialized from TOML.
///
/// ```toml
/// [config]
/// option_merge = "shallow"
///
/// [alias]
/// default = ["build"]
/// build = ["clean:dev", "newer:svgmin:dev", "svgstore:dev"]
///
/// [task.svgmin]
/// runner = "exec"
/// [task.svgmin.options]
/// cmd = "svgo {input} -o {output}"
/// per_file = true
///
/// [[task.svgmin.target.dev.files]]
/// cwd = "source/img/icons"
/// dest = "build/tmp/svgmin/icons"
/// expand = true
/// src = ["*.svg"]
/// ```
///
/// Use [`ConfigFile::try_from`] to obtain a validated configuration.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// `[alias]`: alias name -> ordered references.
    #[serde(default)]
    pub alias: BTreeMap<String, Vec<String>>,

    /// `[task.<name>]` sections.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated, immutable configuration.
///
/// Constructed once at startup and shared by reference with the registry,
/// the expander and the dispatcher.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    alias: BTreeMap<String, Vec<String>>,
    task: BTreeMap<String, TaskConfig>,
    watch: WatchSection,
}

impl ConfigFile {
    /// Build a `ConfigFile` without running validation.
    ///
    /// Only `config::validate` should call this.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            config: raw.config,
            alias: raw.alias,
            task: raw.task,
            watch: raw.watch,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn aliases(&self) -> &BTreeMap<String, Vec<String>> {
        &self.alias
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn watch_section(&self) -> &WatchSection {
        &self.watch
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"shallow"` (default) or `"deep"`.
    #[serde(default)]
    pub option_merge: MergePolicy,

    /// `"file"` (default) or `"memory"`.
    #[serde(default)]
    pub cache_storage: CacheStorageMode,

    /// Cache record location, relative to the project root.
    #[serde(default = "default_cache_file")]
    pub cache_file: String,

    /// Host the live-reload channel binds to.
    #[serde(default = "default_livereload_host")]
    pub livereload_host: String,
}

fn default_cache_file() -> String {
    ".taskgraph/cache".to_string()
}

fn default_livereload_host() -> String {
    "127.0.0.1".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            option_merge: MergePolicy::default(),
            cache_storage: CacheStorageMode::default(),
            cache_file: default_cache_file(),
            livereload_host: default_livereload_host(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Registered runner to invoke; defaults to the task name.
    #[serde(default)]
    pub runner: Option<String>,

    /// Task-level default options.
    #[serde(default)]
    pub options: toml::Table,

    /// Targets in declaration order.
    #[serde(default, rename = "target", deserialize_with = "ordered_entries")]
    pub targets: Vec<(String, TargetConfig)>,
}

impl TaskConfig {
    /// Name of the runner this task dispatches to.
    pub fn runner_name<'a>(&'a self, task_name: &'a str) -> &'a str {
        self.runner.as_deref().unwrap_or(task_name)
    }

    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

/// `[task.<name>.target.<target>]` section.
///
/// A target either carries a single mapping inline (`src`, `cwd`, `dest`,
/// ...) or a `files` list / compact table, or nothing at all.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TargetConfig {
    #[serde(default)]
    pub options: toml::Table,

    #[serde(default)]
    pub files: Option<FilesConfig>,

    #[serde(default)]
    pub src: Option<StringOrList>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub flatten: bool,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub ext_dot: ExtDot,
    #[serde(default)]
    pub filter: Option<PathFilter>,
}

/// `files = ...` of a target.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilesConfig {
    /// `[[task.x.target.y.files]]` entries.
    List(Vec<FileMappingConfig>),
    /// `"dest/file" = ["src/patterns/*"]`: many inputs into one output.
    /// Destinations keep document order.
    Compact(#[serde(deserialize_with = "ordered_entries")] Vec<(String, StringOrList)>),
}

/// One declared file mapping.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileMappingConfig {
    pub src: StringOrList,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub dest: Option<String>,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub flatten: bool,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub ext_dot: ExtDot,
    #[serde(default)]
    pub filter: Option<PathFilter>,
}

/// `"pattern"` or `["a", "b"]`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringOrList::One(s) => vec![s.clone()],
            StringOrList::Many(v) => v.clone(),
        }
    }
}

impl Default for StringOrList {
    fn default() -> Self {
        StringOrList::Many(Vec::new())
    }
}

impl From<&str> for StringOrList {
    fn from(s: &str) -> Self {
        StringOrList::One(s.to_string())
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(v: Vec<String>) -> Self {
        StringOrList::Many(v)
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchSection {
    /// Defaults applied to every binding.
    #[serde(default)]
    pub options: BindingOptions,

    /// Bindings in declaration order.
    #[serde(default, rename = "binding", deserialize_with = "ordered_entries")]
    pub bindings: Vec<(String, WatchBindingConfig)>,
}

/// `[watch.binding.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchBindingConfig {
    /// Glob patterns relative to the project root; `!` negates.
    pub files: StringOrList,

    /// Alias / task references to run on change. May be empty for bindings
    /// that only notify live-reload clients.
    #[serde(default)]
    pub tasks: Vec<String>,

    #[serde(default)]
    pub options: BindingOptions,
}

/// Per-binding options, all optional so they can layer over
/// `[watch.options]`.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
pub struct BindingOptions {
    #[serde(default)]
    pub spawn: Option<bool>,
    #[serde(default)]
    pub livereload: Option<LiveReloadSetting>,
    /// Milliseconds.
    #[serde(default)]
    pub debounce_delay: Option<u64>,
}

impl BindingOptions {
    /// Layer `self` over `defaults`: keys set here win.
    pub fn over(self, defaults: BindingOptions) -> BindingOptions {
        BindingOptions {
            spawn: self.spawn.or(defaults.spawn),
            livereload: self.livereload.or(defaults.livereload),
            debounce_delay: self.debounce_delay.or(defaults.debounce_delay),
        }
    }

    pub fn effective_spawn(&self) -> bool {
        self.spawn.unwrap_or(true)
    }

    pub fn effective_debounce_ms(&self) -> u64 {
        self.debounce_delay.unwrap_or(DEFAULT_DEBOUNCE_DELAY_MS)
    }

    /// Live-reload port, if enabled.
    pub fn livereload_port(&self) -> Option<u16> {
        match self.livereload {
            None | Some(LiveReloadSetting::Enabled(false)) => None,
            Some(LiveReloadSetting::Enabled(true)) => Some(DEFAULT_LIVERELOAD_PORT),
            Some(LiveReloadSetting::Port(port)) => Some(port),
        }
    }
}

/// `livereload = true | false | <port>`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LiveReloadSetting {
    Enabled(bool),
    Port(u16),
}

/// Deserialize a TOML table into `(key, value)` pairs, keeping document
/// order.
fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct OrderedVisitor<T>(std::marker::PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a table of named entries")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::new();
            while let Some((key, value)) = map.next_entry::<String, T>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVisitor(std::marker::PhantomData))
}
