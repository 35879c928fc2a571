// src/dispatch/report.rs

use std::fmt;
use std::time::Duration;

use crate::graph::Invocation;

/// How one invocation of a sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Succeeded { files: usize },
    /// Incremental run with no changed inputs; the runner was not called.
    Skipped,
    /// The runner failed but the target set `force = true`.
    FailedNonFatal { message: String },
}

#[derive(Debug, Clone)]
pub struct StepReport {
    pub invocation: Invocation,
    pub outcome: InvocationOutcome,
    pub elapsed: Duration,
}

/// Per-invocation outcomes and timings of one dispatched sequence.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, InvocationOutcome::Succeeded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, InvocationOutcome::Skipped))
    }

    pub fn failed_non_fatal(&self) -> usize {
        self.count(|o| matches!(o, InvocationOutcome::FailedNonFatal { .. }))
    }

    fn count(&self, pred: impl Fn(&InvocationOutcome) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(&s.outcome)).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in self.steps.iter() {
            let outcome = match &step.outcome {
                InvocationOutcome::Succeeded { files } => format!("ok ({files} files)"),
                InvocationOutcome::Skipped => "skipped (no changes)".to_string(),
                InvocationOutcome::FailedNonFatal { message } => format!("failed, forced: {message}"),
            };
            writeln!(
                f,
                "  {:<40} {:>8.2?}  {}",
                step.invocation.to_string(),
                step.elapsed,
                outcome
            )?;
        }
        write!(f, "  total {:.2?}", self.elapsed)
    }
}
