// src/resolve/mod.rs

//! Pattern resolution: file mappings -> ordered `(input, output)` pairs.
//!
//! - [`mapping`] holds the validated [`FileMapping`] declaration.
//! - [`patterns`] compiles globs and walks directory trees.
//! - [`paths`] computes output paths (`dest`, `flatten`, `ext`).

pub mod mapping;
pub mod paths;
pub mod patterns;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, TaskgraphError};
use crate::fs::FileSystem;
use crate::types::PathFilter;

pub use mapping::{mappings_for_target, Dest, FileMapping};

/// A resolved input and the output path derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePair {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Expands file mappings against a project root.
#[derive(Debug, Clone)]
pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl Resolver {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve one mapping.
    ///
    /// - Patterns expand left to right; matches of each pattern follow the
    ///   sorted directory walk. The first occurrence of an input wins.
    /// - `!pattern` removes earlier matches.
    /// - Globs match files only; directories are produced by literal paths
    ///   or by `filter = "isDirectory"`.
    /// - No match is not an error; a missing `cwd` is, unless every pattern is
    ///   literal.
    pub fn resolve(&self, mapping: &FileMapping) -> Result<Vec<FilePair>> {
        let base = match &mapping.cwd {
            Some(cwd) => self.root.join(cwd),
            None => self.root.clone(),
        };

        let inputs = if mapping.expand {
            self.expand_patterns(&base, mapping)?
        } else {
            self.literal_paths(&base, mapping)
        };

        let inputs: Vec<PathBuf> = match mapping.filter {
            Some(PathFilter::IsFile) => inputs.into_iter().filter(|p| self.fs.is_file(p)).collect(),
            Some(PathFilter::IsDirectory) => {
                inputs.into_iter().filter(|p| self.fs.is_dir(p)).collect()
            }
            None => inputs,
        };

        let pairs: Vec<FilePair> = inputs
            .into_iter()
            .map(|input| {
                let output = paths::output_path(&self.root, &base, &input, mapping);
                FilePair { input, output }
            })
            .collect();

        debug!(
            cwd = ?mapping.cwd,
            patterns = ?mapping.src,
            resolved = pairs.len(),
            "resolved file mapping"
        );

        Ok(pairs)
    }

    /// Resolve several mappings, concatenating their pairs in order.
    ///
    /// An input may feed several mappings (one source shared by two bundles);
    /// only exact `(input, output)` repeats are dropped.
    pub fn resolve_all(&self, mappings: &[FileMapping]) -> Result<Vec<FilePair>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for mapping in mappings {
            for pair in self.resolve(mapping)? {
                if seen.insert(pair.clone()) {
                    out.push(pair);
                }
            }
        }
        Ok(out)
    }

    fn literal_paths(&self, base: &Path, mapping: &FileMapping) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut out: Vec<PathBuf> = Vec::new();

        for entry in mapping.src.iter() {
            if let Some(negated) = entry.strip_prefix('!') {
                let path = base.join(negated);
                out.retain(|p| *p != path);
                seen.remove(&path);
                continue;
            }

            let path = base.join(entry);
            if !self.fs.exists(&path) {
                debug!(path = ?path, "literal source does not exist; skipping");
                continue;
            }
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }

        out
    }

    fn expand_patterns(&self, base: &Path, mapping: &FileMapping) -> Result<Vec<PathBuf>> {
        let needs_walk = mapping
            .src
            .iter()
            .any(|p| !patterns::is_literal(p.strip_prefix('!').unwrap_or(p)));

        let base_exists = self.fs.is_dir(base);
        if needs_walk && !base_exists {
            return Err(TaskgraphError::Resolution {
                path: base.to_path_buf(),
                reason: "cwd does not exist or is not a directory".to_string(),
            });
        }

        let entries = if needs_walk {
            patterns::walk(self.fs.as_ref(), base).map_err(|e| TaskgraphError::Resolution {
                path: base.to_path_buf(),
                reason: format!("{e:#}"),
            })?
        } else {
            Vec::new()
        };

        let mut seen = HashSet::new();
        let mut out: Vec<PathBuf> = Vec::new();

        for pattern in mapping.src.iter() {
            if let Some(negated) = pattern.strip_prefix('!') {
                let matcher = self.compile(base, negated)?;
                out.retain(|p| {
                    let keep = match p.strip_prefix(base) {
                        Ok(rel) => !matcher.is_match(rel.to_string_lossy().replace('\\', "/")),
                        Err(_) => true,
                    };
                    if !keep {
                        seen.remove(p);
                    }
                    keep
                });
                continue;
            }

            if patterns::is_literal(pattern) {
                let path = base.join(pattern);
                if self.fs.exists(&path) && seen.insert(path.clone()) {
                    out.push(path);
                }
                continue;
            }

            let matcher = self.compile(base, pattern)?;
            let want_dirs = mapping.filter == Some(PathFilter::IsDirectory);
            for entry in entries.iter() {
                if entry.is_dir != want_dirs {
                    continue;
                }
                if matcher.is_match(&entry.rel) && seen.insert(entry.path.clone()) {
                    out.push(entry.path.clone());
                }
            }
        }

        Ok(out)
    }

    fn compile(&self, base: &Path, pattern: &str) -> Result<globset::GlobMatcher> {
        patterns::compile(pattern).map_err(|e| TaskgraphError::Resolution {
            path: base.join(pattern),
            reason: format!("{e:#}"),
        })
    }
}
