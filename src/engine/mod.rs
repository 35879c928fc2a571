// src/engine/mod.rs

//! Watch loop engine.
//!
//! This module ties together:
//! - per-binding debounce and in-flight coalescing
//! - the main runtime event loop that reacts to:
//!   - file changes routed to bindings
//!   - debounce timers firing
//!   - binding runs finishing
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::time::Duration;

/// Index of a watch binding in declaration order.
pub type BindingId = usize;

/// How a binding run ended, as reported back to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    Succeeded,
    Failed(String),
}

/// Static per-binding settings the core needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingSettings {
    /// Zero runs immediately on every event.
    pub debounce: Duration,
    /// Bindings without tasks only notify live-reload clients.
    pub has_tasks: bool,
    pub livereload: bool,
}

/// Events flowing into the runtime from the watcher, timers and runs.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A path (relative to the project root) matched a binding.
    FileChanged { binding: BindingId, path: String },
    /// A debounce timer started for `generation` fired.
    DebounceElapsed { binding: BindingId, generation: u64 },
    RunFinished { binding: BindingId, result: RunResult },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;
pub mod state;

pub use self::core::WatchCore;
pub use event_handlers::{WatchCommand, WatchStep};
pub use runtime::WatchRuntime;
pub use state::{BindingState, ChangeSet, Phase};
