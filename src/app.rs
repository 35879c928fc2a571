// src/app.rs

//! A loaded project: configuration, registries, cache store and filesystem,
//! plus the top-level "run these names" operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::config::model::ConfigFile;
use crate::dispatch::{Dispatcher, RunReport};
use crate::engine::{WatchEvent, WatchRuntime};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::graph::{Expander, Invocation};
use crate::incremental::{open_store, CacheStore, SharedCacheStore};
use crate::registry::TargetRegistry;
use crate::runner::RunnerRegistry;
use crate::watch::{build_bindings, spawn_watcher, WatchBinding};

/// Capacity of the watch runtime's event channel.
const WATCH_CHANNEL_CAPACITY: usize = 256;

/// Everything needed to expand and run references against one project.
///
/// Immutable after construction; the dispatcher and watch runs share it
/// through `Arc`s.
pub struct Taskgraph {
    config: ConfigFile,
    targets: Arc<TargetRegistry>,
    runners: Arc<RunnerRegistry>,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    cache: SharedCacheStore,
}

impl std::fmt::Debug for Taskgraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Taskgraph")
            .field("root", &self.root)
            .field("runners", &self.runners)
            .finish_non_exhaustive()
    }
}

impl Taskgraph {
    /// Build the registries from `config`. The cache store follows
    /// `[config] cache_storage`.
    pub fn new(
        config: ConfigFile,
        root: impl Into<PathBuf>,
        runners: RunnerRegistry,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        let root = root.into();
        let targets = TargetRegistry::from_config(&config);
        let cache = open_store(config.config_section(), &root, fs.clone());
        Self {
            config,
            targets: Arc::new(targets),
            runners: Arc::new(runners),
            fs,
            root,
            cache,
        }
    }

    /// Replace the configured cache store.
    pub fn with_cache_store(mut self, store: Box<dyn CacheStore>) -> Self {
        self.cache = Arc::new(Mutex::new(store));
        self
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn expander(&self) -> Expander<'_> {
        Expander::new(self.config.aliases(), &self.targets)
    }

    /// Expand CLI-style references into one invocation sequence.
    pub fn expand<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Invocation>> {
        self.expander().expand_all(names)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            Arc::clone(&self.targets),
            Arc::clone(&self.runners),
            Arc::clone(&self.fs),
            self.root.clone(),
            Arc::clone(&self.cache),
        )
    }

    pub fn watch_bindings(&self) -> Result<Vec<WatchBinding>> {
        build_bindings(self.config.watch_section(), &self.expander())
    }

    /// Expand `names` and run the resulting sequence.
    ///
    /// Everything is expanded and checked before the first runner starts. If
    /// the sequence contains `watch`, the invocations before it run first and
    /// then the watch loop takes over until Ctrl-C; invocations after `watch`
    /// never run.
    pub async fn execute<S: AsRef<str>>(&self, names: &[S]) -> Result<RunReport> {
        let sequence = self.expand(names)?;
        let watch_at = sequence.iter().position(Invocation::is_watch);
        let before = &sequence[..watch_at.unwrap_or(sequence.len())];

        if let Some(idx) = watch_at {
            let ignored = sequence.len() - idx - 1;
            if ignored > 0 {
                warn!(ignored, "invocations after 'watch' never run");
            }
        }

        let dispatcher = self.dispatcher();
        dispatcher.preflight(before)?;

        let bindings = match watch_at {
            Some(_) => {
                let bindings = self.watch_bindings()?;
                for binding in bindings.iter() {
                    dispatcher.preflight(&binding.sequence)?;
                }
                Some(bindings)
            }
            None => None,
        };

        self.prune_cache().await;

        let report = dispatcher.run(before).await?;
        info!("run report:\n{report}");

        if let Some(bindings) = bindings {
            self.watch(bindings).await?;
        }

        Ok(report)
    }

    /// Run the watch loop over `bindings` until Ctrl-C.
    pub async fn watch(&self, bindings: Vec<WatchBinding>) -> Result<()> {
        if bindings.is_empty() {
            warn!("no watch bindings configured; nothing to watch");
            return Ok(());
        }

        let (tx, rx) = mpsc::channel::<WatchEvent>(WATCH_CHANNEL_CAPACITY);

        let profiles = bindings.iter().map(|b| b.profile.clone()).collect();
        let _watcher = spawn_watcher(&self.root, profiles, tx.clone())?;

        // Ctrl-C → graceful shutdown.
        {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                    return;
                }
                let _ = tx.send(WatchEvent::ShutdownRequested).await;
            });
        }

        let mut runtime = WatchRuntime::new(bindings, self.dispatcher(), tx, rx);
        runtime
            .start_livereload(&self.config.config_section().livereload_host)
            .await?;
        runtime.run().await
    }

    /// Drop cache records of targets that no longer exist.
    async fn prune_cache(&self) {
        let scopes: Vec<String> = self
            .targets
            .task_names()
            .flat_map(|task| {
                let targets = self.targets.target_names(task).unwrap_or_default();
                let mut ids: Vec<String> = targets
                    .into_iter()
                    .map(|t| Invocation::new(task, Some(t)).id())
                    .collect();
                ids.push(Invocation::new(task, None).id());
                ids
            })
            .collect();
        let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();

        if let Err(e) = self.cache.lock().await.prune(&scopes) {
            warn!("failed to prune stale cache records: {e:#}");
        }
    }
}
