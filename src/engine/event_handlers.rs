// src/engine/event_handlers.rs

//! Event handling logic for the watch core.

use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::state::{BindingState, Phase};
use crate::engine::{BindingId, RunResult};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchCommand {
    /// Send `DebounceElapsed { binding, generation }` after `delay`.
    StartDebounce {
        binding: BindingId,
        generation: u64,
        delay: Duration,
    },
    /// Run the binding's task sequence. `changed` lists the paths that
    /// triggered it.
    RunBinding {
        binding: BindingId,
        changed: Vec<String>,
    },
    NotifyLiveReload {
        binding: BindingId,
        paths: Vec<String>,
    },
}

/// Decision returned by the core after handling a single `WatchEvent`.
#[derive(Debug, Clone)]
pub struct WatchStep {
    pub commands: Vec<WatchCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl WatchStep {
    pub(crate) fn continue_with(commands: Vec<WatchCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// Handle a changed path for a binding.
///
/// - Running: remember the path and mark a re-run; the in-flight run is not
///   interrupted.
/// - Idle or debouncing with zero delay: run now.
/// - Otherwise: (re)start the debounce window.
pub fn handle_file_changed(state: &mut BindingState, id: BindingId, path: String) -> Vec<WatchCommand> {
    state.pending.insert(path);

    match state.phase {
        Phase::Running { .. } => {
            debug!(binding = id, "change during run; re-run queued");
            state.phase = Phase::Running { rerun_pending: true };
            Vec::new()
        }
        Phase::Idle | Phase::Debouncing => {
            if state.settings.debounce.is_zero() {
                return start_run(state, id);
            }
            state.generation += 1;
            state.phase = Phase::Debouncing;
            vec![WatchCommand::StartDebounce {
                binding: id,
                generation: state.generation,
                delay: state.settings.debounce,
            }]
        }
    }
}

/// Handle a debounce timer. Timers from superseded generations are ignored.
pub fn handle_debounce_elapsed(state: &mut BindingState, id: BindingId, generation: u64) -> Vec<WatchCommand> {
    if state.phase != Phase::Debouncing || generation != state.generation {
        debug!(
            binding = id,
            generation,
            current = state.generation,
            "stale debounce timer ignored"
        );
        return Vec::new();
    }
    start_run(state, id)
}

/// Handle completion of a binding run.
///
/// On success a live-reload notification is emitted for the processed paths
/// (when enabled). Either way the binding returns to idle, or immediately
/// starts the coalesced re-run.
pub fn handle_run_finished(state: &mut BindingState, id: BindingId, result: RunResult) -> Vec<WatchCommand> {
    let Phase::Running { rerun_pending } = state.phase else {
        warn!(binding = id, phase = ?state.phase, "run finished for a binding that was not running");
        return Vec::new();
    };

    let mut commands = Vec::new();
    let processed = std::mem::take(&mut state.in_flight);

    match result {
        RunResult::Succeeded => {
            if state.settings.livereload {
                commands.push(WatchCommand::NotifyLiveReload {
                    binding: id,
                    paths: processed,
                });
            }
        }
        RunResult::Failed(message) => {
            debug!(binding = id, error = %message, "run failed; returning to idle");
        }
    }

    state.phase = Phase::Idle;
    if rerun_pending && !state.pending.is_empty() {
        commands.extend(start_run(state, id));
    }
    commands
}

fn start_run(state: &mut BindingState, id: BindingId) -> Vec<WatchCommand> {
    let changed = state.pending.take();

    if !state.settings.has_tasks {
        state.phase = Phase::Idle;
        if state.settings.livereload {
            return vec![WatchCommand::NotifyLiveReload {
                binding: id,
                paths: changed,
            }];
        }
        return Vec::new();
    }

    state.in_flight = changed.clone();
    state.phase = Phase::Running {
        rerun_pending: false,
    };
    state.runs_started += 1;
    vec![WatchCommand::RunBinding {
        binding: id,
        changed,
    }]
}
