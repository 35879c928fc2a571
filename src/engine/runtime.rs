// src/engine/runtime.rs

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::errors::{Result, TaskgraphError};
use crate::watch::{LiveReloadServer, WatchBinding};

use super::core::WatchCore;
use super::{BindingId, RunResult, WatchCommand, WatchEvent};

/// Drives the watch core in response to `WatchEvent`s and runs binding
/// sequences through the [`Dispatcher`].
///
/// This is a pure IO shell around `WatchCore`, which holds all the loop
/// semantics. It arms debounce timers, runs bindings and talks to the
/// live-reload servers.
pub struct WatchRuntime {
    core: WatchCore,
    bindings: Arc<Vec<WatchBinding>>,
    dispatcher: Dispatcher,
    event_tx: mpsc::Sender<WatchEvent>,
    event_rx: mpsc::Receiver<WatchEvent>,
    /// Events produced by the shell itself (inline run completions), handled
    /// before the channel is read again.
    backlog: VecDeque<WatchEvent>,
    livereload: HashMap<u16, LiveReloadServer>,
}

impl fmt::Debug for WatchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl WatchRuntime {
    pub fn new(
        bindings: Vec<WatchBinding>,
        dispatcher: Dispatcher,
        event_tx: mpsc::Sender<WatchEvent>,
        event_rx: mpsc::Receiver<WatchEvent>,
    ) -> Self {
        let core = WatchCore::new(bindings.iter().map(WatchBinding::settings));
        Self {
            core,
            bindings: Arc::new(bindings),
            dispatcher,
            event_tx,
            event_rx,
            backlog: VecDeque::new(),
            livereload: HashMap::new(),
        }
    }

    /// Bind one live-reload server per distinct port used by the bindings.
    pub async fn start_livereload(&mut self, host: &str) -> Result<()> {
        for binding in self.bindings.iter() {
            let Some(port) = binding.livereload_port() else {
                continue;
            };
            if self.livereload.contains_key(&port) {
                continue;
            }
            let server = LiveReloadServer::bind(host, port).await?;
            self.livereload.insert(port, server);
        }
        Ok(())
    }

    /// Main event loop.
    ///
    /// Runs until `ShutdownRequested` arrives. Failed binding runs are
    /// logged and never end the loop.
    pub async fn run(mut self) -> Result<()> {
        info!(bindings = self.bindings.len(), "watch loop started");

        loop {
            let event = match self.backlog.pop_front() {
                Some(e) => e,
                None => match self.event_rx.recv().await {
                    Some(e) => e,
                    None => {
                        info!("watch event channel closed; exiting");
                        break;
                    }
                },
            };

            debug!(?event, "watch runtime received event");

            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await;
            }

            if !step.keep_running {
                info!("shutdown requested; stopping watch loop");
                break;
            }
        }

        info!("watch loop exiting");
        Ok(())
    }

    async fn execute_command(&mut self, command: WatchCommand) {
        match command {
            WatchCommand::StartDebounce {
                binding,
                generation,
                delay,
            } => {
                let tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx
                        .send(WatchEvent::DebounceElapsed {
                            binding,
                            generation,
                        })
                        .await;
                });
            }
            WatchCommand::RunBinding { binding, changed } => {
                self.run_binding(binding, changed).await;
            }
            WatchCommand::NotifyLiveReload { binding, paths } => {
                self.notify_livereload(binding, &paths);
            }
        }
    }

    async fn run_binding(&mut self, id: BindingId, changed: Vec<String>) {
        let Some(binding) = self.bindings.get(id) else {
            warn!(binding = id, "run requested for unknown binding");
            return;
        };

        info!(
            binding = %binding.name,
            changed = ?changed,
            spawn = binding.spawn(),
            "running watch binding"
        );

        if binding.spawn() {
            // Isolated: a panic inside the run is caught at the join handle.
            let dispatcher = self.dispatcher.clone();
            let bindings = Arc::clone(&self.bindings);
            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                let name = bindings[id].name.clone();
                let sequence = bindings[id].sequence.clone();
                let handle =
                    tokio::spawn(async move { dispatcher.run(&sequence).await.map(|_| ()) });
                let result = match handle.await {
                    Ok(Ok(())) => RunResult::Succeeded,
                    Ok(Err(err)) => report_failure(&name, err.to_string()),
                    Err(join_err) => report_failure(&name, format!("run aborted: {join_err}")),
                };
                let _ = tx
                    .send(WatchEvent::RunFinished {
                        binding: id,
                        result,
                    })
                    .await;
            });
            return;
        }

        // In-process: the loop waits for the run, and a panic propagates.
        let result = match self.dispatcher.run(&binding.sequence).await {
            Ok(_) => RunResult::Succeeded,
            Err(err) => report_failure(&binding.name, err.to_string()),
        };
        self.backlog.push_front(WatchEvent::RunFinished {
            binding: id,
            result,
        });
    }

    fn notify_livereload(&self, id: BindingId, paths: &[String]) {
        let Some(binding) = self.bindings.get(id) else {
            return;
        };
        let server = binding
            .livereload_port()
            .and_then(|port| self.livereload.get(&port));
        match server {
            Some(server) => {
                server.notify(&binding.name, paths);
            }
            None => debug!(binding = %binding.name, "no live-reload server for binding"),
        }
    }
}

fn report_failure(binding: &str, message: String) -> RunResult {
    let err = TaskgraphError::WatchRunFailure {
        binding: binding.to_string(),
        message,
    };
    error!(error = %err, "watch run failed; returning to idle");
    RunResult::Failed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::BindingOptions;
    use crate::fs::mock::MockFileSystem;
    use crate::graph::Invocation;
    use crate::incremental::{CacheStore, MemoryCacheStore};
    use crate::registry::TargetRegistry;
    use crate::runner::RunnerRegistry;
    use crate::types::MergePolicy;
    use crate::watch::BindingProfile;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn binding(spawn: bool, debounce_ms: u64) -> WatchBinding {
        WatchBinding {
            name: "js".into(),
            profile: BindingProfile::new("js", &["source/js/**/*".to_string()]).unwrap(),
            sequence: vec![Invocation::new("uglify", Some("dev"))],
            options: BindingOptions {
                spawn: Some(spawn),
                livereload: None,
                debounce_delay: Some(debounce_ms),
            },
        }
    }

    /// Dispatcher whose `uglify` runner reports each call on `done` and
    /// fails on the calls listed in `fail_on`.
    fn dispatcher(done: mpsc::UnboundedSender<usize>, fail_on: &'static [usize]) -> Dispatcher {
        let mut targets = TargetRegistry::new(MergePolicy::Shallow);
        targets.register("uglify", "dev", toml::Table::new(), vec![]);

        let calls = Arc::new(AtomicUsize::new(0));
        let mut runners = RunnerRegistry::new();
        runners.register_fn("uglify", move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = done.send(n);
            if fail_on.contains(&n) {
                anyhow::bail!("minifier crashed on call {n}");
            }
            Ok(())
        });

        let store: Box<dyn CacheStore> = Box::new(MemoryCacheStore::new());
        Dispatcher::new(
            Arc::new(targets),
            Arc::new(runners),
            Arc::new(MockFileSystem::new()),
            "/proj",
            Arc::new(tokio::sync::Mutex::new(store)),
        )
    }

    fn changed(path: &str) -> WatchEvent {
        WatchEvent::FileChanged {
            binding: 0,
            path: path.into(),
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<usize>) -> usize {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("run did not happen in time")
            .expect("runner channel closed")
    }

    #[tokio::test]
    async fn zero_debounce_runs_once_per_event() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(16);
        let runtime = WatchRuntime::new(vec![binding(true, 0)], dispatcher(done_tx, &[]), tx.clone(), rx);
        let handle = tokio::spawn(runtime.run());

        for i in 1..=3 {
            tx.send(changed(&format!("source/js/f{i}.js"))).await.unwrap();
            assert_eq!(next(&mut done_rx).await, i);
            // Let the completion reach the core before the next change.
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        tx.send(WatchEvent::ShutdownRequested).await.unwrap();
        handle.await.unwrap().unwrap();
        assert!(done_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_run_keeps_the_loop_alive() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(16);
        let runtime = WatchRuntime::new(vec![binding(false, 0)], dispatcher(done_tx, &[1]), tx.clone(), rx);
        let handle = tokio::spawn(runtime.run());

        tx.send(changed("source/js/a.js")).await.unwrap();
        assert_eq!(next(&mut done_rx).await, 1);

        tx.send(changed("source/js/a.js")).await.unwrap();
        assert_eq!(next(&mut done_rx).await, 2);

        tx.send(WatchEvent::ShutdownRequested).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn debounce_collapses_a_burst_into_one_run() {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let (tx, rx) = mpsc::channel(16);
        let runtime = WatchRuntime::new(vec![binding(true, 50)], dispatcher(done_tx, &[]), tx.clone(), rx);
        let handle = tokio::spawn(runtime.run());

        for name in ["a", "b", "c"] {
            tx.send(changed(&format!("source/js/{name}.js"))).await.unwrap();
        }
        assert_eq!(next(&mut done_rx).await, 1);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(done_rx.try_recv().is_err());

        tx.send(WatchEvent::ShutdownRequested).await.unwrap();
        handle.await.unwrap().unwrap();
    }
}
