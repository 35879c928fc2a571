// tests/incremental_filter.rs

use std::path::PathBuf;
use std::sync::Arc;

use taskgraph::fs::mock::MockFileSystem;
use taskgraph::fs::RealFileSystem;
use taskgraph::incremental::{filter_changed, CacheStore, FileCacheStore};
use taskgraph::resolve::{FileMapping, Resolver};
use taskgraph_test_utils::write_tree;
use tempfile::TempDir;

fn icons() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/icons/a.svg", "<svg/>");
    fs.add_file("/proj/icons/b.svg", "<svg/>");
    fs.add_file("/proj/icons/c.svg", "<svg/>");
    fs
}

#[test]
fn nothing_changed_after_a_full_run() {
    let fs = icons();
    let resolver = Resolver::new(Arc::new(fs.clone()), "/proj");
    let pairs = resolver
        .resolve(&FileMapping::expanded("icons", "build", &["*.svg"]))
        .unwrap();

    let first = filter_changed(&fs, &pairs, None, false).unwrap();
    assert_eq!(first.changed.len(), 3);

    let second = filter_changed(&fs, &pairs, Some(&first.updated), false).unwrap();
    assert!(second.changed.is_empty());
}

#[test]
fn touching_one_input_selects_exactly_that_pair() {
    let fs = icons();
    let resolver = Resolver::new(Arc::new(fs.clone()), "/proj");
    let pairs = resolver
        .resolve(&FileMapping::expanded("icons", "build", &["*.svg"]))
        .unwrap();
    let record = filter_changed(&fs, &pairs, None, false).unwrap().updated;

    fs.touch("/proj/icons/b.svg");

    let outcome = filter_changed(&fs, &pairs, Some(&record), false).unwrap();
    assert_eq!(outcome.changed.len(), 1);
    assert_eq!(outcome.changed[0].input, PathBuf::from("/proj/icons/b.svg"));
    assert_eq!(outcome.changed[0].output, PathBuf::from("/proj/build/b.svg"));
}

#[test]
fn new_inputs_count_as_changed() {
    let fs = icons();
    let resolver = Resolver::new(Arc::new(fs.clone()), "/proj");
    let mapping = FileMapping::expanded("icons", "build", &["*.svg"]);
    let pairs = resolver.resolve(&mapping).unwrap();
    let record = filter_changed(&fs, &pairs, None, false).unwrap().updated;

    fs.add_file("/proj/icons/d.svg", "<svg/>");
    let pairs = resolver.resolve(&mapping).unwrap();

    let outcome = filter_changed(&fs, &pairs, Some(&record), false).unwrap();
    let changed: Vec<_> = outcome.changed.iter().map(|p| p.input.clone()).collect();
    assert_eq!(changed, vec![PathBuf::from("/proj/icons/d.svg")]);
    assert_eq!(outcome.updated.len(), 4);
}

#[test]
fn file_store_round_trips_records_per_scope() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("icons/a.svg", "<svg/>"), ("icons/b.svg", "<svg/>")]);

    let fs = Arc::new(RealFileSystem);
    let resolver = Resolver::new(fs.clone(), dir.path());
    let pairs = resolver
        .resolve(&FileMapping::expanded("icons", "build", &["*.svg"]))
        .unwrap();
    let record = filter_changed(fs.as_ref(), &pairs, None, true).unwrap().updated;

    let cache_path = dir.path().join(".taskgraph/cache");
    let mut store = FileCacheStore::new(cache_path.clone(), fs.clone());
    store.save("svgmin:dev", &record).unwrap();

    let reopened = FileCacheStore::new(cache_path, fs.clone());
    let loaded = reopened.load("svgmin:dev").unwrap().expect("record saved");
    assert_eq!(loaded, record);
    assert!(reopened.load("svgmin:dist").unwrap().is_none());

    let outcome = filter_changed(fs.as_ref(), &pairs, Some(&loaded), true).unwrap();
    assert!(outcome.changed.is_empty());
}

#[test]
fn prune_drops_scopes_of_removed_targets() {
    let dir = TempDir::new().unwrap();
    write_tree(dir.path(), &[("a.txt", "a")]);

    let fs = Arc::new(RealFileSystem);
    let resolver = Resolver::new(fs.clone(), dir.path());
    let pairs = resolver.resolve(&FileMapping::literal(&["a.txt"])).unwrap();
    let record = filter_changed(fs.as_ref(), &pairs, None, false).unwrap().updated;

    let mut store = FileCacheStore::new(dir.path().join("cache"), fs.clone());
    store.save("copy:js", &record).unwrap();
    store.save("copy:old", &record).unwrap();

    store.prune(&["copy:js"]).unwrap();

    assert!(store.load("copy:js").unwrap().is_some());
    assert!(store.load("copy:old").unwrap().is_none());
}
