// src/dispatch/mod.rs

//! Runner dispatch: executes an expanded invocation sequence strictly in
//! order.
//!
//! For each invocation the dispatcher resolves the target's file mappings,
//! narrows them to changed inputs for `newer:` invocations, calls the
//! registered runner and awaits its completion. The incremental record is
//! persisted only after the runner succeeded, so a failed run is retried in
//! full next time.

pub mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::errors::{Result, TaskgraphError};
use crate::fs::FileSystem;
use crate::graph::Invocation;
use crate::incremental::{filter_changed, SharedCacheStore};
use crate::registry::{ResolvedTarget, TargetRegistry};
use crate::resolve::Resolver;
use crate::runner::{RunContext, RunnerRegistry};

pub use report::{InvocationOutcome, RunReport, StepReport};

/// Merged option making runner failures non-fatal.
pub const FORCE_OPTION: &str = "force";
/// Merged option adding a content hash to incremental signatures.
pub const USE_HASH_OPTION: &str = "use_hash";

/// Cheap to clone: every field is shared, so watch runs can move a copy into
/// a spawned task.
#[derive(Clone)]
pub struct Dispatcher {
    targets: Arc<TargetRegistry>,
    runners: Arc<RunnerRegistry>,
    resolver: Resolver,
    cache: SharedCacheStore,
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("root", &self.resolver.root())
            .field("runners", &self.runners)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new(
        targets: Arc<TargetRegistry>,
        runners: Arc<RunnerRegistry>,
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        cache: SharedCacheStore,
    ) -> Self {
        Self {
            targets,
            runners,
            resolver: Resolver::new(fs.clone(), root),
            cache,
            fs,
        }
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn root(&self) -> &std::path::Path {
        self.resolver.root()
    }

    /// Check that every invocation names a known target with a registered
    /// runner. Runs before any side effect.
    pub fn preflight(&self, sequence: &[Invocation]) -> Result<()> {
        for invocation in sequence.iter() {
            if invocation.is_watch() {
                continue;
            }
            let resolved = self
                .targets
                .get(&invocation.task, invocation.target.as_deref())?;
            if !self.runners.contains(&resolved.runner) {
                return Err(TaskgraphError::ConfigError(format!(
                    "no runner registered as '{}' (needed by '{}')",
                    resolved.runner,
                    invocation.id()
                )));
            }
        }
        Ok(())
    }

    /// Run `sequence` in order.
    ///
    /// The first fatal failure stops the sequence; later invocations never
    /// start. Watch invocations are not executed here; see
    /// [`crate::engine::WatchRuntime`].
    pub fn run<'a>(
        &'a self,
        sequence: &'a [Invocation],
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<RunReport>> + Send + 'a>> {
        Box::pin(self.run_inner(sequence))
    }

    async fn run_inner(&self, sequence: &[Invocation]) -> Result<RunReport> {
        self.preflight(sequence)?;

        let started = Instant::now();
        let mut report = RunReport::default();

        for invocation in sequence.iter() {
            if invocation.is_watch() {
                return Err(TaskgraphError::ConfigError(format!(
                    "'{}' hands control to the watch loop and cannot be dispatched directly",
                    invocation
                )));
            }

            let step_started = Instant::now();
            let resolved = self
                .targets
                .get(&invocation.task, invocation.target.as_deref())?;
            let force = resolved
                .options
                .get(FORCE_OPTION)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            info!(invocation = %invocation, runner = %resolved.runner, "running");

            let outcome = match self.execute(invocation, resolved).await {
                Ok(outcome) => outcome,
                Err(TaskgraphError::RunnerFailure { message, .. }) if force => {
                    warn!(
                        invocation = %invocation,
                        error = %message,
                        "runner failed; continuing because force = true"
                    );
                    InvocationOutcome::FailedNonFatal { message }
                }
                Err(err) => {
                    error!(invocation = %invocation, error = %err, "invocation failed; stopping");
                    return Err(err);
                }
            };

            let elapsed = step_started.elapsed();
            debug!(
                invocation = %invocation,
                elapsed_ms = elapsed.as_millis() as u64,
                outcome = ?outcome,
                "invocation finished"
            );
            report.steps.push(StepReport {
                invocation: invocation.clone(),
                outcome,
                elapsed,
            });
        }

        report.elapsed = started.elapsed();
        info!(
            invocations = report.steps.len(),
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed_non_fatal = report.failed_non_fatal(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "sequence finished"
        );
        Ok(report)
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        resolved: ResolvedTarget,
    ) -> Result<InvocationOutcome> {
        let runner = self.runners.get(&resolved.runner).ok_or_else(|| {
            TaskgraphError::ConfigError(format!("no runner registered as '{}'", resolved.runner))
        })?;

        let mut pairs = self.resolver.resolve_all(&resolved.mappings)?;

        let mut pending_record = None;
        if invocation.incremental {
            let use_hash = resolved
                .options
                .get(USE_HASH_OPTION)
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let scope = invocation.id();

            let record = self.cache.lock().await.load(&scope)?;
            let outcome = filter_changed(self.fs.as_ref(), &pairs, record.as_ref(), use_hash)?;

            debug!(
                invocation = %invocation,
                resolved = pairs.len(),
                changed = outcome.changed.len(),
                "incremental filter applied"
            );

            if outcome.changed.is_empty() {
                info!(invocation = %invocation, "no changed inputs; skipping");
                return Ok(InvocationOutcome::Skipped);
            }
            pairs = outcome.changed;
            pending_record = Some((scope, outcome.updated));
        }

        let files = pairs.len();
        let ctx = RunContext {
            invocation: invocation.clone(),
            options: resolved.options,
            pairs,
            root: self.resolver.root().to_path_buf(),
            fs: self.fs.clone(),
        };

        runner
            .run(&ctx)
            .await
            .map_err(|err| TaskgraphError::RunnerFailure {
                invocation: invocation.id(),
                message: format!("{err:#}"),
            })?;

        if let Some((scope, record)) = pending_record {
            self.cache.lock().await.save(&scope, &record)?;
        }

        Ok(InvocationOutcome::Succeeded { files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::incremental::{CacheStore, MemoryCacheStore};
    use crate::resolve::FileMapping;
    use crate::types::MergePolicy;
    use std::sync::Mutex;
    use tokio::sync::Mutex as AsyncMutex;

    fn dispatcher(fs: &MockFileSystem, targets: TargetRegistry, runners: RunnerRegistry) -> Dispatcher {
        let store: Box<dyn CacheStore> = Box::new(MemoryCacheStore::new());
        Dispatcher::new(
            Arc::new(targets),
            Arc::new(runners),
            Arc::new(fs.clone()),
            "/proj",
            Arc::new(AsyncMutex::new(store)),
        )
    }

    #[tokio::test]
    async fn preflight_rejects_missing_runner_before_any_side_effect() {
        let fs = MockFileSystem::new();
        let calls = Arc::new(Mutex::new(0));

        let mut targets = TargetRegistry::new(MergePolicy::Shallow);
        targets.register("clean", "dev", toml::Table::new(), vec![]);
        targets.register("imagemin", "dev", toml::Table::new(), vec![]);

        let mut runners = RunnerRegistry::new();
        let c = calls.clone();
        runners.register_fn("clean", move |_| {
            *c.lock().unwrap() += 1;
            Ok(())
        });

        let d = dispatcher(&fs, targets, runners);
        let seq = vec![
            Invocation::new("clean", Some("dev")),
            Invocation::new("imagemin", Some("dev")),
        ];

        match d.run(&seq).await {
            Err(TaskgraphError::ConfigError(msg)) => assert!(msg.contains("imagemin")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn incremental_run_skips_when_nothing_changed() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/a.js", "a");

        let mut targets = TargetRegistry::new(MergePolicy::Shallow);
        targets.register(
            "copy",
            "js",
            toml::Table::new(),
            vec![FileMapping::expanded("src", "dist", &["**/*.js"])],
        );

        let d = dispatcher(&fs, targets, RunnerRegistry::with_builtins());
        let mut inv = Invocation::new("copy", Some("js"));
        inv.incremental = true;
        let seq = vec![inv];

        let first = d.run(&seq).await.unwrap();
        assert_eq!(first.steps[0].outcome, InvocationOutcome::Succeeded { files: 1 });

        let second = d.run(&seq).await.unwrap();
        assert_eq!(second.steps[0].outcome, InvocationOutcome::Skipped);
    }
}
