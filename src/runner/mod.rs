// src/runner/mod.rs

//! Pluggable runners.
//!
//! A runner is the implementation behind a task: the dispatcher hands it the
//! merged options and resolved file pairs of one invocation and awaits the
//! returned future before moving on.
//!
//! - [`RunnerRegistry`] maps runner names to implementations, populated by
//!   explicit registration at startup.
//! - [`sync_runner`] / [`async_runner`] adapt plain closures.
//! - [`builtin`] holds the runners shipped with taskgraph.

pub mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use crate::fs::FileSystem;
use crate::graph::Invocation;
use crate::resolve::FilePair;

/// Future returned by [`Runner::run`].
pub type RunFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Everything a runner receives for one invocation.
#[derive(Clone)]
pub struct RunContext {
    pub invocation: Invocation,
    /// Task defaults merged with target options.
    pub options: toml::Table,
    /// Resolved (and, for incremental runs, filtered) file pairs.
    pub pairs: Vec<FilePair>,
    /// Project root; external commands run here.
    pub root: PathBuf,
    pub fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("invocation", &self.invocation)
            .field("pairs", &self.pairs.len())
            .finish_non_exhaustive()
    }
}

impl RunContext {
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    pub fn option_int(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| v.as_integer())
    }

    pub fn inputs(&self) -> impl Iterator<Item = &std::path::Path> {
        self.pairs.iter().map(|p| p.input.as_path())
    }
}

/// Implementation behind a task.
///
/// Synchronous runners complete inside the returned future; asynchronous
/// runners resolve it when their work signals completion. Either way the
/// dispatcher awaits it before the next invocation starts.
pub trait Runner: Send + Sync {
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a>;
}

struct SyncFnRunner<F>(F);

impl<F> Runner for SyncFnRunner<F>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync,
{
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin(std::future::ready((self.0)(ctx)))
    }
}

struct AsyncFnRunner<F>(F);

impl<F, Fut> Runner for AsyncFnRunner<F>
where
    F: Fn(RunContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin((self.0)(ctx.clone()))
    }
}

/// Wrap a closure that completes synchronously.
pub fn sync_runner<F>(f: F) -> Arc<dyn Runner>
where
    F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(SyncFnRunner(f))
}

/// Wrap a closure returning a future that signals completion.
pub fn async_runner<F, Fut>(f: F) -> Arc<dyn Runner>
where
    F: Fn(RunContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(AsyncFnRunner(f))
}

/// Runner name -> implementation.
#[derive(Clone, Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn Runner>>,
}

impl fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.runners.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("RunnerRegistry").field("runners", &names).finish()
    }
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in runner registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register (or replace) a runner under `name`.
    pub fn register(&mut self, name: &str, runner: Arc<dyn Runner>) -> &mut Self {
        self.runners.insert(name.to_string(), runner);
        self
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&RunContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(name, sync_runner(f))
    }

    pub fn register_async<F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register(name, async_runner(f))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Runner>> {
        self.runners.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runners.contains_key(name)
    }
}
