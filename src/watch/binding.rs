// src/watch/binding.rs

use std::time::Duration;

use tracing::debug;

use crate::config::model::{BindingOptions, WatchSection};
use crate::engine::BindingSettings;
use crate::errors::{Result, TaskgraphError};
use crate::graph::{Expander, Invocation};
use crate::watch::patterns::BindingProfile;

/// A watch binding ready to run: compiled patterns, the expanded task
/// sequence and options layered over `[watch.options]`.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub name: String,
    pub profile: BindingProfile,
    pub sequence: Vec<Invocation>,
    pub options: BindingOptions,
}

impl WatchBinding {
    pub fn spawn(&self) -> bool {
        self.options.effective_spawn()
    }

    pub fn livereload_port(&self) -> Option<u16> {
        self.options.livereload_port()
    }

    pub fn settings(&self) -> BindingSettings {
        BindingSettings {
            debounce: Duration::from_millis(self.options.effective_debounce_ms()),
            has_tasks: !self.sequence.is_empty(),
            livereload: self.livereload_port().is_some(),
        }
    }
}

/// Compile every binding of `section`, expanding its task references.
///
/// Expansion happens up front so a bad reference fails before the loop
/// starts. A binding may not hand control to the watch loop itself.
pub fn build_bindings(section: &WatchSection, expander: &Expander<'_>) -> Result<Vec<WatchBinding>> {
    section
        .bindings
        .iter()
        .map(|(name, cfg)| {
            let sequence = expander.expand_all(&cfg.tasks)?;
            if sequence.iter().any(Invocation::is_watch) {
                return Err(TaskgraphError::ConfigError(format!(
                    "watch binding '{name}' cannot run the watch task"
                )));
            }

            let profile = BindingProfile::new(name.as_str(), &cfg.files.to_vec())?;
            let options = cfg.options.over(section.options);

            debug!(
                binding = %name,
                invocations = sequence.len(),
                spawn = options.effective_spawn(),
                debounce_ms = options.effective_debounce_ms(),
                "compiled watch binding"
            );

            Ok(WatchBinding {
                name: name.clone(),
                profile,
                sequence,
                options,
            })
        })
        .collect()
}
