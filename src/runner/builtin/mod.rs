// src/runner/builtin/mod.rs

//! Runners shipped with taskgraph.
//!
//! | name             | effect                                            |
//! |------------------|---------------------------------------------------|
//! | `clean`          | remove every input path                           |
//! | `copy`           | copy inputs to outputs (many-to-one concatenates) |
//! | `sync`           | copy only outputs that are missing or stale       |
//! | `string-replace` | regex replacements from `options.replacements`    |
//! | `exec`           | run `options.cmd` through the shell               |

mod exec;
mod files;
mod replace;

use std::sync::Arc;

use crate::runner::RunnerRegistry;

pub use exec::ExecRunner;
pub use files::{CleanRunner, CopyRunner, SyncRunner};
pub use replace::StringReplaceRunner;

pub fn register_all(registry: &mut RunnerRegistry) {
    registry
        .register("clean", Arc::new(CleanRunner))
        .register("copy", Arc::new(CopyRunner))
        .register("sync", Arc::new(SyncRunner))
        .register("string-replace", Arc::new(StringReplaceRunner))
        .register("exec", Arc::new(ExecRunner));
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::fs::mock::MockFileSystem;
    use crate::graph::Invocation;
    use crate::resolve::FilePair;
    use crate::runner::RunContext;

    pub fn pair(input: &str, output: &str) -> FilePair {
        FilePair {
            input: PathBuf::from(input),
            output: PathBuf::from(output),
        }
    }

    pub fn context(fs: &MockFileSystem, options: &str, pairs: Vec<FilePair>) -> RunContext {
        RunContext {
            invocation: Invocation::new("test", Some("dev")),
            options: toml::from_str(options).expect("options parse"),
            pairs,
            root: PathBuf::from("/proj"),
            fs: Arc::new(fs.clone()),
        }
    }
}
