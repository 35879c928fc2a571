// src/engine/core.rs

//! Pure core watch state machine.
//!
//! This module contains a synchronous, deterministic "core" that consumes
//! [`WatchEvent`]s and produces:
//! - updated per-binding state
//! - a list of [`WatchCommand`]s describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::WatchRuntime`) is responsible
//! for reading events from channels, arming timers, running bindings and
//! handling Ctrl-C.
//!
//! The core is unit tested without any Tokio, channels, filesystem, or
//! processes.

use tracing::warn;

use crate::engine::event_handlers::{
    handle_debounce_elapsed, handle_file_changed, handle_run_finished, WatchCommand, WatchStep,
};
use crate::engine::state::BindingState;
use crate::engine::{BindingId, BindingSettings, WatchEvent};

#[derive(Debug)]
pub struct WatchCore {
    bindings: Vec<BindingState>,
}

impl WatchCore {
    /// One state per binding, indexed by [`BindingId`].
    pub fn new(settings: impl IntoIterator<Item = BindingSettings>) -> Self {
        Self {
            bindings: settings.into_iter().map(BindingState::new).collect(),
        }
    }

    pub fn binding(&self, id: BindingId) -> Option<&BindingState> {
        self.bindings.get(id)
    }

    /// True when no binding is debouncing or running.
    pub fn is_idle(&self) -> bool {
        self.bindings
            .iter()
            .all(|b| b.phase() == crate::engine::Phase::Idle)
    }

    /// Handle a single event, updating state and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, event: WatchEvent) -> WatchStep {
        let (id, commands) = match event {
            WatchEvent::ShutdownRequested => {
                return WatchStep {
                    commands: Vec::new(),
                    keep_running: false,
                };
            }
            WatchEvent::FileChanged { binding, path } => {
                (binding, self.with_binding(binding, |s| handle_file_changed(s, binding, path)))
            }
            WatchEvent::DebounceElapsed {
                binding,
                generation,
            } => (
                binding,
                self.with_binding(binding, |s| handle_debounce_elapsed(s, binding, generation)),
            ),
            WatchEvent::RunFinished { binding, result } => {
                (binding, self.with_binding(binding, |s| handle_run_finished(s, binding, result)))
            }
        };

        if commands.is_none() {
            warn!(binding = id, "event for unknown binding ignored");
        }
        WatchStep::continue_with(commands.unwrap_or_default())
    }

    fn with_binding(
        &mut self,
        id: BindingId,
        f: impl FnOnce(&mut BindingState) -> Vec<WatchCommand>,
    ) -> Option<Vec<WatchCommand>> {
        self.bindings.get_mut(id).map(f)
    }
}
