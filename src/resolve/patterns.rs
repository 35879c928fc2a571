// src/resolve/patterns.rs

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobMatcher};

use crate::fs::FileSystem;

/// Returns true if `pattern` has no glob metacharacters.
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?', '[', '{'])
}

/// Compile a single pattern. `*` never crosses a `/`; use `**` for that.
pub fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))?;
    Ok(glob.compile_matcher())
}

/// An entry found while walking a directory tree.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// Path relative to the walk base, with forward slashes.
    pub rel: String,
    pub is_dir: bool,
}

/// Walk `base` recursively in pre-order.
///
/// Entries of each directory are sorted by name so the enumeration order is
/// stable across platforms and runs.
pub fn walk(fs: &dyn FileSystem, base: &Path) -> Result<Vec<WalkEntry>> {
    let mut out = Vec::new();
    walk_into(fs, base, base, &mut out)?;
    Ok(out)
}

fn walk_into(fs: &dyn FileSystem, base: &Path, dir: &Path, out: &mut Vec<WalkEntry>) -> Result<()> {
    let mut children = fs.read_dir(dir)?;
    children.sort();

    for path in children {
        let is_dir = fs.is_dir(&path);
        let rel = match path.strip_prefix(base) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        out.push(WalkEntry {
            path: path.clone(),
            rel,
            is_dir,
        });
        if is_dir {
            walk_into(fs, base, &path, out)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_detection() {
        assert!(is_literal("source/js/app.js"));
        assert!(!is_literal("**/*.js"));
        assert!(!is_literal("*.{jpg,png}"));
        assert!(!is_literal("img/[ab].svg"));
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let m = compile("*.svg").unwrap();
        assert!(m.is_match("a.svg"));
        assert!(!m.is_match("sub/a.svg"));

        let m = compile("**/*").unwrap();
        assert!(m.is_match("a.js"));
        assert!(m.is_match("sub/b.js"));
    }
}
