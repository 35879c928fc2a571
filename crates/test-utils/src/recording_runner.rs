use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::bail;
use taskgraph::runner::{sync_runner, Runner};

/// One recorded runner call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// `task:target`, with `newer:` when incremental.
    pub invocation: String,
    pub inputs: Vec<PathBuf>,
}

/// Fake runner that records every call instead of doing real work.
///
/// Calls for invocation ids (`task:target`) registered with
/// [`RecordingRunner::fail_on`] return an error after being recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, invocation_id: &str) {
        self.failing
            .lock()
            .unwrap()
            .insert(invocation_id.to_string());
    }

    /// A `Runner` feeding this recorder; register it under as many names as
    /// needed.
    pub fn runner(&self) -> Arc<dyn Runner> {
        let calls = Arc::clone(&self.calls);
        let failing = Arc::clone(&self.failing);
        sync_runner(move |ctx| {
            let id = ctx.invocation.id();
            calls.lock().unwrap().push(RecordedCall {
                invocation: ctx.invocation.to_string(),
                inputs: ctx.pairs.iter().map(|p| p.input.clone()).collect(),
            });
            if failing.lock().unwrap().contains(&id) {
                bail!("intentional failure in {id}");
            }
            Ok(())
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Invocation names in call order.
    pub fn invocations(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.invocation).collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}
