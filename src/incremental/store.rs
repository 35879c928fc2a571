// src/incremental/store.rs

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::incremental::filter::CacheRecord;
use crate::incremental::signature::FileSignature;

/// Abstract storage for per-scope cache records.
///
/// A scope is the `task:target` identity of an invocation.
pub trait CacheStore: Send + Sync {
    fn load(&self, scope: &str) -> Result<Option<CacheRecord>>;
    fn save(&mut self, scope: &str, record: &CacheRecord) -> Result<()>;
    /// Remove records for scopes not in `active_scopes`.
    fn prune(&mut self, active_scopes: &[&str]) -> Result<()>;
}

/// Stores records in a plain-text file, one input per line:
///
/// `scope<TAB>path<TAB>mtime_ns<TAB>len<TAB>hash-or-dash`
pub struct FileCacheStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileCacheStore {
    /// `path` is the cache file itself (e.g. `<root>/.taskgraph/cache`).
    pub fn new(path: PathBuf, fs: Arc<dyn FileSystem>) -> Self {
        Self { path, fs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_all(&self) -> Result<BTreeMap<String, CacheRecord>> {
        if !self.fs.exists(&self.path) {
            return Ok(BTreeMap::new());
        }

        let contents = self
            .fs
            .read_to_string(&self.path)
            .with_context(|| format!("reading cache file at {:?}", self.path))?;

        let mut all: BTreeMap<String, CacheRecord> = BTreeMap::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((scope, path, sig)) => {
                    all.entry(scope).or_default().entries.insert(path, sig);
                }
                None => {
                    warn!(line = lineno + 1, file = ?self.path, "ignoring malformed cache line");
                }
            }
        }
        Ok(all)
    }

    fn save_all(&self, all: &BTreeMap<String, CacheRecord>) -> Result<()> {
        let mut out = String::new();
        for (scope, record) in all.iter() {
            for (path, sig) in record.entries.iter() {
                let hash = sig.hash.as_deref().unwrap_or("-");
                let _ = writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    scope,
                    path.display(),
                    sig.modified_ns,
                    sig.len,
                    hash
                );
            }
        }
        self.fs
            .write(&self.path, out.as_bytes())
            .with_context(|| format!("writing cache file at {:?}", self.path))
    }
}

fn parse_line(line: &str) -> Option<(String, PathBuf, FileSignature)> {
    let mut parts = line.split('\t');
    let scope = parts.next()?.to_string();
    let path = PathBuf::from(parts.next()?);
    let modified_ns = parts.next()?.parse().ok()?;
    let len = parts.next()?.parse().ok()?;
    let hash = match parts.next()? {
        "-" => None,
        h => Some(h.to_string()),
    };
    Some((
        scope,
        path,
        FileSignature {
            modified_ns,
            len,
            hash,
        },
    ))
}

impl CacheStore for FileCacheStore {
    fn load(&self, scope: &str) -> Result<Option<CacheRecord>> {
        let mut all = self.load_all()?;
        Ok(all.remove(scope))
    }

    fn save(&mut self, scope: &str, record: &CacheRecord) -> Result<()> {
        let mut all = self.load_all()?;
        all.insert(scope.to_string(), record.clone());
        self.save_all(&all)?;
        debug!(scope = %scope, entries = record.len(), "stored cache record (file)");
        Ok(())
    }

    fn prune(&mut self, active_scopes: &[&str]) -> Result<()> {
        let mut all = self.load_all()?;
        let initial_len = all.len();
        all.retain(|k, _| active_scopes.contains(&k.as_str()));

        if all.len() < initial_len {
            self.save_all(&all)?;
            info!(
                removed = initial_len - all.len(),
                "pruned stale cache records (file)"
            );
        }
        Ok(())
    }
}

/// Stores records in memory only.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    map: BTreeMap<String, CacheRecord>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, scope: &str) -> Result<Option<CacheRecord>> {
        Ok(self.map.get(scope).cloned())
    }

    fn save(&mut self, scope: &str, record: &CacheRecord) -> Result<()> {
        self.map.insert(scope.to_string(), record.clone());
        debug!(scope = %scope, entries = record.len(), "stored cache record (memory)");
        Ok(())
    }

    fn prune(&mut self, active_scopes: &[&str]) -> Result<()> {
        let initial_len = self.map.len();
        self.map.retain(|k, _| active_scopes.contains(&k.as_str()));
        if self.map.len() < initial_len {
            info!(
                removed = initial_len - self.map.len(),
                "pruned stale cache records (memory)"
            );
        }
        Ok(())
    }
}
