// src/graph/expander.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{Result, TaskgraphError};
use crate::graph::invocation::{Invocation, Reference, WATCH_TASK};
use crate::registry::TargetRegistry;

/// Expands aliases into flat, ordered invocation sequences.
///
/// Expansion is depth-first, left to right. Every reference is checked
/// against the registry here, so a bad reference aborts the whole run before
/// any runner executes.
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    aliases: &'a BTreeMap<String, Vec<String>>,
    registry: &'a TargetRegistry,
}

impl<'a> Expander<'a> {
    pub fn new(aliases: &'a BTreeMap<String, Vec<String>>, registry: &'a TargetRegistry) -> Self {
        Self { aliases, registry }
    }

    /// Expand a single alias / task / `task:target` reference.
    pub fn expand(&self, reference: &str) -> Result<Vec<Invocation>> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        self.expand_into(reference, false, &mut stack, &mut out)?;
        debug!(
            reference = %reference,
            invocations = out.len(),
            "expanded reference"
        );
        Ok(out)
    }

    /// Expand several references, concatenating their sequences.
    pub fn expand_all<S: AsRef<str>>(&self, references: &[S]) -> Result<Vec<Invocation>> {
        let mut out = Vec::new();
        for reference in references {
            out.extend(self.expand(reference.as_ref())?);
        }
        Ok(out)
    }

    fn expand_into(
        &self,
        raw: &str,
        inherited_incremental: bool,
        stack: &mut Vec<String>,
        out: &mut Vec<Invocation>,
    ) -> Result<()> {
        let reference = Reference::parse(raw);
        let incremental = inherited_incremental || reference.incremental;

        if reference.target.is_none() {
            if let Some(body) = self.aliases.get(&reference.name) {
                if let Some(pos) = stack.iter().position(|n| *n == reference.name) {
                    let mut cycle: Vec<&str> = stack[pos..].iter().map(String::as_str).collect();
                    cycle.push(&reference.name);
                    return Err(TaskgraphError::CyclicAlias(cycle.join(" -> ")));
                }

                stack.push(reference.name.clone());
                for child in body {
                    self.expand_into(child, incremental, stack, out)?;
                }
                stack.pop();
                return Ok(());
            }
        }

        if reference.name == WATCH_TASK {
            out.push(Invocation {
                task: WATCH_TASK.to_string(),
                target: reference.target,
                incremental: false,
            });
            return Ok(());
        }

        let Some(targets) = self.registry.target_names(&reference.name) else {
            return Err(TaskgraphError::UnknownTask(raw.trim().to_string()));
        };

        match reference.target {
            Some(target) => {
                if !targets.contains(&target.as_str()) {
                    return Err(TaskgraphError::UnknownTarget {
                        task: reference.name,
                        target,
                    });
                }
                out.push(Invocation {
                    task: reference.name,
                    target: Some(target),
                    incremental,
                });
            }
            None if targets.is_empty() => {
                out.push(Invocation {
                    task: reference.name,
                    target: None,
                    incremental,
                });
            }
            None => {
                for target in targets {
                    out.push(Invocation {
                        task: reference.name.clone(),
                        target: Some(target.to_string()),
                        incremental,
                    });
                }
            }
        }

        Ok(())
    }
}
