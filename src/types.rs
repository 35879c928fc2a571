use std::str::FromStr;

use serde::Deserialize;

/// How target-level options are combined with task-level defaults.
///
/// - `Shallow`: target keys replace task keys of the same name; nested
///   tables are replaced wholesale (default).
/// - `Deep`: nested tables are merged recursively, target values winning on
///   conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    #[default]
    Shallow,
    Deep,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shallow" => Ok(MergePolicy::Shallow),
            "deep" => Ok(MergePolicy::Deep),
            other => Err(format!(
                "invalid option_merge: {other} (expected \"shallow\" or \"deep\")"
            )),
        }
    }
}

/// Where the incremental cache record lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Persist records in a file (`.taskgraph/cache` by default).
    #[default]
    File,
    /// Keep records in memory only (lost on restart).
    Memory,
}

/// `filter` modifier of a file mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PathFilter {
    #[serde(rename = "isFile")]
    IsFile,
    #[serde(rename = "isDirectory")]
    IsDirectory,
}

/// Which dot of a file name starts the extension replaced by `ext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtDot {
    #[default]
    First,
    Last,
}
