// src/graph/invocation.rs

//! References as written in aliases and watch bindings, and the concrete
//! invocations they expand to.

use std::fmt;

/// Reserved task name that hands control to the watch loop.
pub const WATCH_TASK: &str = "watch";

/// Prefix requesting incremental ("only changed files") execution.
pub const NEWER_PREFIX: &str = "newer:";

/// A parsed reference: `name`, `task:target`, optionally `newer:`-prefixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub target: Option<String>,
    pub incremental: bool,
}

impl Reference {
    pub fn parse(raw: &str) -> Self {
        let mut rest = raw.trim();
        let mut incremental = false;
        while let Some(stripped) = rest.strip_prefix(NEWER_PREFIX) {
            incremental = true;
            rest = stripped;
        }

        let (name, target) = match rest.split_once(':') {
            Some((name, target)) => (name.to_string(), Some(target.to_string())),
            None => (rest.to_string(), None),
        };

        Self {
            name,
            target,
            incremental,
        }
    }
}

/// One concrete `task[:target]` step of an expanded sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invocation {
    pub task: String,
    /// `None` for tasks that declare no targets.
    pub target: Option<String>,
    pub incremental: bool,
}

impl Invocation {
    pub fn new(task: &str, target: Option<&str>) -> Self {
        Self {
            task: task.to_string(),
            target: target.map(str::to_string),
            incremental: false,
        }
    }

    /// `task:target` (or `task`), also used as the cache scope.
    pub fn id(&self) -> String {
        match &self.target {
            Some(target) => format!("{}:{}", self.task, target),
            None => self.task.clone(),
        }
    }

    pub fn is_watch(&self) -> bool {
        self.task == WATCH_TASK
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.incremental {
            f.write_str(NEWER_PREFIX)?;
        }
        f.write_str(&self.id())
    }
}
