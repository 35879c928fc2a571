// src/incremental/mod.rs

//! "Only changed files" support.
//!
//! - [`signature`] computes per-file signatures (mtime, size, optional
//!   blake3 content hash).
//! - [`filter`] narrows resolved pairs to changed inputs.
//! - [`store`] persists records between runs.

pub mod filter;
pub mod signature;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::model::ConfigSection;
use crate::fs::FileSystem;
use crate::types::CacheStorageMode;

pub use filter::{filter_changed, CacheRecord, FilterOutcome};
pub use signature::{compute_file_hash, signature_of, FileSignature};
pub use store::{CacheStore, FileCacheStore, MemoryCacheStore};

/// Cache store shared by the dispatcher and concurrent watch runs.
///
/// The async mutex gives a single writer at a time.
pub type SharedCacheStore = Arc<Mutex<Box<dyn CacheStore>>>;

/// Build the configured cache store for a project rooted at `root`.
pub fn open_store(cfg: &ConfigSection, root: &Path, fs: Arc<dyn FileSystem>) -> SharedCacheStore {
    let store: Box<dyn CacheStore> = match cfg.cache_storage {
        CacheStorageMode::File => Box::new(FileCacheStore::new(root.join(&cfg.cache_file), fs)),
        CacheStorageMode::Memory => Box::new(MemoryCacheStore::new()),
    };
    Arc::new(Mutex::new(store))
}
