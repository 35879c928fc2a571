// src/watch/event_handler.rs

//! Routing of file system changes to watch bindings.

use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::WatchEvent;
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::BindingProfile;

/// Turn one changed path into a `FileChanged` event per interested binding.
pub fn route_change(root: &Path, path: &Path, profiles: &[BindingProfile]) -> Vec<WatchEvent> {
    let Some(rel) = relative_str(root, path) else {
        warn!(
            "could not relativize path {:?} against root {:?}",
            path, root
        );
        return Vec::new();
    };

    let events: Vec<WatchEvent> = profiles
        .iter()
        .enumerate()
        .filter(|(_, p)| p.matches(&rel))
        .map(|(id, _)| WatchEvent::FileChanged {
            binding: id,
            path: rel.clone(),
        })
        .collect();

    debug!(?path, rel = %rel, bindings = events.len(), "routed file change");
    events
}

/// Route `path` and forward the resulting events to the runtime.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    profiles: &[BindingProfile],
    runtime_tx: &mpsc::Sender<WatchEvent>,
) {
    for event in route_change(root, path, profiles) {
        if runtime_tx.send(event).await.is_err() {
            debug!("runtime channel closed; dropping file change");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BindingId;

    fn profiles() -> Vec<BindingProfile> {
        vec![
            BindingProfile::new("js", &["source/js/**/*".to_string()]).unwrap(),
            BindingProfile::new("scss", &["source/scss/**/*.scss".to_string()]).unwrap(),
            BindingProfile::new("all-source", &["source/**/*".to_string()]).unwrap(),
        ]
    }

    #[test]
    fn routes_to_every_matching_binding() {
        let events = route_change(
            Path::new("/proj"),
            Path::new("/proj/source/js/app.js"),
            &profiles(),
        );
        let ids: Vec<BindingId> = events
            .iter()
            .map(|e| match e {
                WatchEvent::FileChanged { binding, path } => {
                    assert_eq!(path, "source/js/app.js");
                    *binding
                }
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn paths_outside_root_are_dropped() {
        let events = route_change(Path::new("/proj"), Path::new("/elsewhere/a.js"), &profiles());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn forwards_events_to_runtime() {
        let (tx, mut rx) = mpsc::channel(8);
        process_file_change(
            Path::new("/proj"),
            Path::new("/proj/source/scss/site.scss"),
            &profiles(),
            &tx,
        )
        .await;
        drop(tx);

        let mut got = Vec::new();
        while let Some(WatchEvent::FileChanged { binding, .. }) = rx.recv().await {
            got.push(binding);
        }
        assert_eq!(got, vec![1, 2]);
    }
}
