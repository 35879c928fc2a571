// src/incremental/filter.rs

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::incremental::signature::{signature_of, FileSignature};
use crate::resolve::FilePair;

/// Input path -> last seen signature, for one `task:target` scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheRecord {
    pub entries: BTreeMap<PathBuf, FileSignature>,
}

impl CacheRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &std::path::Path) -> Option<&FileSignature> {
        self.entries.get(path)
    }
}

/// Result of [`filter_changed`].
#[derive(Debug, Clone)]
pub struct FilterOutcome {
    /// Pairs whose input is new or differs from the record, plus the pairs
    /// sharing an output with them, in input order.
    pub changed: Vec<FilePair>,
    /// Current state of every examined input. Persist this only after the
    /// runner processed `changed` successfully.
    pub updated: CacheRecord,
}

/// Narrow `pairs` to those whose input changed since `record` was taken.
///
/// Outputs built from several inputs are rebuilt whole: when one input of a
/// shared output changed, every pair writing that output is reported.
/// Without a record every pair is reported changed. Inputs that cannot be
/// inspected (e.g. deleted between resolution and filtering) are reported
/// changed and left out of the updated record.
pub fn filter_changed(
    fs: &dyn FileSystem,
    pairs: &[FilePair],
    record: Option<&CacheRecord>,
    use_hash: bool,
) -> Result<FilterOutcome> {
    let mut dirty_outputs = HashSet::new();
    let mut updated = CacheRecord::new();

    for pair in pairs {
        let current = match signature_of(fs, &pair.input, use_hash) {
            Ok(sig) => sig,
            Err(err) => {
                warn!(path = ?pair.input, error = %err, "cannot read input signature; treating as changed");
                dirty_outputs.insert(pair.output.as_path());
                continue;
            }
        };

        let is_changed = match record.and_then(|r| r.get(&pair.input)) {
            Some(previous) => previous.differs_from(&current),
            None => true,
        };

        if is_changed {
            dirty_outputs.insert(pair.output.as_path());
        }
        updated.entries.insert(pair.input.clone(), current);
    }

    let changed: Vec<FilePair> = pairs
        .iter()
        .filter(|p| dirty_outputs.contains(p.output.as_path()))
        .cloned()
        .collect();

    debug!(
        examined = pairs.len(),
        changed = changed.len(),
        had_record = record.is_some(),
        "incremental filter applied"
    );

    Ok(FilterOutcome { changed, updated })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn pair(input: &str, output: &str) -> FilePair {
        FilePair {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        }
    }

    #[test]
    fn shared_output_is_rebuilt_from_all_inputs() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/a.js", "a;");
        fs.add_file("/proj/src/b.js", "b;");
        fs.add_file("/proj/src/c.js", "c;");
        let pairs = vec![
            pair("/proj/src/a.js", "/proj/dist/bundle.js"),
            pair("/proj/src/b.js", "/proj/dist/bundle.js"),
            pair("/proj/src/c.js", "/proj/dist/c.js"),
        ];
        let record = filter_changed(&fs, &pairs, None, false).unwrap().updated;

        fs.touch("/proj/src/b.js");
        let outcome = filter_changed(&fs, &pairs, Some(&record), false).unwrap();

        assert_eq!(outcome.changed, pairs[..2].to_vec());
    }

    #[test]
    fn one_to_one_pairs_stay_narrowed() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/a.js", "a;");
        fs.add_file("/proj/src/b.js", "b;");
        let pairs = vec![
            pair("/proj/src/a.js", "/proj/dist/a.js"),
            pair("/proj/src/b.js", "/proj/dist/b.js"),
        ];
        let record = filter_changed(&fs, &pairs, None, false).unwrap().updated;

        fs.touch("/proj/src/a.js");
        let outcome = filter_changed(&fs, &pairs, Some(&record), false).unwrap();

        assert_eq!(outcome.changed, vec![pairs[0].clone()]);
    }
}
