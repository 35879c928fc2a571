// src/watch/mod.rs

//! File watching for the watch loop.
//!
//! This module is responsible for:
//! - Compiling each binding's file patterns (`!pattern` excludes).
//! - Expanding each binding's task references into a run sequence.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that routes
//!   changed paths to bindings.
//! - The live-reload notification server.
//!
//! It does not debounce or run anything; that is the engine's job.

pub mod binding;
pub mod event_handler;
pub mod livereload;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use binding::{build_bindings, WatchBinding};
pub use livereload::LiveReloadServer;
pub use patterns::BindingProfile;
pub use watcher::{spawn_watcher, WatcherHandle};
