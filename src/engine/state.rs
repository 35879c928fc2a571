// src/engine/state.rs

use std::collections::HashSet;

use crate::engine::BindingSettings;

/// Lifecycle of a single binding.
///
/// `Idle -> Debouncing -> Running -> Idle`, or `Idle -> Running` directly
/// when the debounce delay is zero. A failed run also returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    /// `rerun_pending` is set when changes arrived during the run; they are
    /// coalesced into one run started as soon as this one finishes.
    Running { rerun_pending: bool },
}

/// Changed paths waiting for the next run of a binding.
///
/// Keeps first-seen order and collapses repeated events for the same path.
#[derive(Debug, Default, Clone)]
pub struct ChangeSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl ChangeSet {
    pub fn insert(&mut self, path: String) {
        if self.seen.insert(path.clone()) {
            self.order.push(path);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Take all pending paths, leaving the set empty.
    pub fn take(&mut self) -> Vec<String> {
        self.seen.clear();
        std::mem::take(&mut self.order)
    }
}

/// Mutable state of one binding inside the core.
#[derive(Debug)]
pub struct BindingState {
    pub(crate) settings: BindingSettings,
    pub(crate) phase: Phase,
    /// Bumped on every debounced event; only the timer carrying the latest
    /// generation starts a run.
    pub(crate) generation: u64,
    pub(crate) pending: ChangeSet,
    /// Paths handed to the run currently in flight.
    pub(crate) in_flight: Vec<String>,
    pub(crate) runs_started: u64,
}

impl BindingState {
    pub fn new(settings: BindingSettings) -> Self {
        Self {
            settings,
            phase: Phase::Idle,
            generation: 0,
            pending: ChangeSet::default(),
            in_flight: Vec::new(),
            runs_started: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn runs_started(&self) -> u64 {
        self.runs_started
    }
}
