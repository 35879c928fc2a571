// src/incremental/signature.rs

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Recorded state of one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    pub modified_ns: u128,
    pub len: u64,
    /// Content hash, only recorded when the target opts into `use_hash`.
    pub hash: Option<String>,
}

impl FileSignature {
    /// Whether `current` differs from this recorded signature.
    ///
    /// A hash is only compared when both sides carry one.
    pub fn differs_from(&self, current: &FileSignature) -> bool {
        if self.modified_ns != current.modified_ns || self.len != current.len {
            return true;
        }
        match (&self.hash, &current.hash) {
            (Some(old), Some(new)) => old != new,
            _ => false,
        }
    }
}

/// Compute the blake3 hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Current signature of `path`. Directories never get a content hash.
pub fn signature_of(fs: &dyn FileSystem, path: &Path, use_hash: bool) -> Result<FileSignature> {
    let meta = fs.metadata(path)?;
    let hash = if use_hash && fs.is_file(path) {
        Some(compute_file_hash(fs, path)?)
    } else {
        None
    };
    Ok(FileSignature {
        modified_ns: meta.modified_ns,
        len: meta.len,
        hash,
    })
}
