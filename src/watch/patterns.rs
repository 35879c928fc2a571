// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

/// Compiled file patterns of one watch binding.
///
/// Patterns are relative to the project root; `!pattern` entries exclude.
/// The watcher passes relative paths (e.g. `"source/js/app.js"`) into
/// [`BindingProfile::matches`].
#[derive(Clone)]
pub struct BindingProfile {
    name: String,
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl fmt::Debug for BindingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingProfile")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BindingProfile {
    pub fn new(name: impl Into<String>, patterns: &[String]) -> Result<Self> {
        let name = name.into();
        let (excludes, includes): (Vec<&str>, Vec<&str>) = patterns
            .iter()
            .map(String::as_str)
            .partition(|p| p.starts_with('!'));
        let excludes: Vec<&str> = excludes.iter().map(|p| &p[1..]).collect();

        let include = build_globset(&includes)
            .with_context(|| format!("building watch globset for binding {name}"))?;
        let exclude = if excludes.is_empty() {
            None
        } else {
            Some(
                build_globset(&excludes)
                    .with_context(|| format!("building exclude globset for binding {name}"))?,
            )
        };

        Ok(Self {
            name,
            include,
            exclude,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if this binding is interested in `rel_path`.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// `*` stops at `/`, matching the resolver.
fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
