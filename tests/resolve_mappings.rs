// tests/resolve_mappings.rs

use std::path::PathBuf;
use std::sync::Arc;

use taskgraph::config::TargetConfig;
use taskgraph::errors::TaskgraphError;
use taskgraph::fs::mock::MockFileSystem;
use taskgraph::resolve::{mappings_for_target, FileMapping, FilePair, Resolver};
use taskgraph::types::PathFilter;

fn project() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/source/js/a.js", "a");
    fs.add_file("/proj/source/js/sub/b.js", "b");
    fs.add_file("/proj/source/js/vendor/jquery.js", "$");
    fs.add_file("/proj/source/js/notes.txt", "n");
    fs
}

fn pair(input: &str, output: &str) -> FilePair {
    FilePair {
        input: PathBuf::from(input),
        output: PathBuf::from(output),
    }
}

#[test]
fn expanded_mapping_preserves_relative_paths_below_dest() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mapping = FileMapping::expanded("source/js", "dist/js", &["**/*.js", "!vendor/**"]);

    let pairs = resolver.resolve(&mapping).unwrap();

    assert_eq!(
        pairs,
        vec![
            pair("/proj/source/js/a.js", "/proj/dist/js/a.js"),
            pair("/proj/source/js/sub/b.js", "/proj/dist/js/sub/b.js"),
        ]
    );
}

#[test]
fn resolution_is_deterministic() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mapping = FileMapping::expanded("source/js", "dist/js", &["**/*"]);

    let first = resolver.resolve(&mapping).unwrap();
    let second = resolver.resolve(&mapping).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn overlapping_patterns_yield_each_input_once() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mapping = FileMapping::expanded("source/js", "dist/js", &["*.js", "**/*.js", "a.js"]);

    let pairs = resolver.resolve(&mapping).unwrap();
    let inputs: Vec<_> = pairs.iter().map(|p| p.input.clone()).collect();

    assert_eq!(
        inputs,
        vec![
            PathBuf::from("/proj/source/js/a.js"),
            PathBuf::from("/proj/source/js/sub/b.js"),
            PathBuf::from("/proj/source/js/vendor/jquery.js"),
        ]
    );
}

#[test]
fn missing_cwd_is_a_resolution_error() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mapping = FileMapping::expanded("source/missing", "dist", &["**/*.js"]);

    match resolver.resolve(&mapping) {
        Err(TaskgraphError::Resolution { path, .. }) => {
            assert_eq!(path, PathBuf::from("/proj/source/missing"));
        }
        other => panic!("expected Resolution error, got {other:?}"),
    }
}

#[test]
fn no_match_resolves_to_empty() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mapping = FileMapping::expanded("source/js", "dist", &["**/*.coffee"]);

    assert!(resolver.resolve(&mapping).unwrap().is_empty());
}

#[test]
fn flatten_and_ext_rewrite_output_names() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/pages/blog/post.hbs", "p");
    fs.add_file("/proj/pages/index.hbs", "i");
    let resolver = Resolver::new(Arc::new(fs), "/proj");

    let mut mapping = FileMapping::expanded("pages", "build", &["**/*.hbs"]);
    mapping.flatten = true;
    mapping.ext = Some(".html".to_string());

    let outputs: Vec<_> = resolver
        .resolve(&mapping)
        .unwrap()
        .into_iter()
        .map(|p| p.output)
        .collect();

    assert_eq!(
        outputs,
        vec![
            PathBuf::from("/proj/build/post.html"),
            PathBuf::from("/proj/build/index.html"),
        ]
    );
}

#[test]
fn literal_sources_skip_missing_paths_and_stay_in_place() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mapping = FileMapping::literal(&["source/js/a.js", "source/js/gone.js"]);

    let pairs = resolver.resolve(&mapping).unwrap();

    assert_eq!(pairs, vec![pair("/proj/source/js/a.js", "/proj/source/js/a.js")]);
}

#[test]
fn directory_filter_selects_directories() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mut mapping = FileMapping::expanded("source/js", "dist", &["*"]);
    mapping.filter = Some(PathFilter::IsDirectory);

    let inputs: Vec<_> = resolver
        .resolve(&mapping)
        .unwrap()
        .into_iter()
        .map(|p| p.input)
        .collect();

    assert_eq!(
        inputs,
        vec![
            PathBuf::from("/proj/source/js/sub"),
            PathBuf::from("/proj/source/js/vendor"),
        ]
    );
}

#[test]
fn file_filter_drops_literal_directories() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let mut mapping = FileMapping::literal(&["source/js/sub", "source/js/a.js", "source/js/vendor"]);
    mapping.filter = Some(PathFilter::IsFile);

    let pairs = resolver.resolve(&mapping).unwrap();

    assert_eq!(pairs, vec![pair("/proj/source/js/a.js", "/proj/source/js/a.js")]);
}

#[test]
fn compact_destinations_keep_document_order() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/z.js", "z");
    fs.add_file("/proj/src/a.js", "a");
    let cfg: TargetConfig = toml::from_str(
        r#"
[files]
"dist/zeta.js" = "src/z.js"
"dist/alpha.js" = "src/a.js"
"#,
    )
    .unwrap();
    let resolver = Resolver::new(Arc::new(fs), "/proj");

    let outputs: Vec<_> = resolver
        .resolve_all(&mappings_for_target(&cfg))
        .unwrap()
        .into_iter()
        .map(|p| p.output)
        .collect();

    assert_eq!(
        outputs,
        vec![
            PathBuf::from("/proj/dist/zeta.js"),
            PathBuf::from("/proj/dist/alpha.js"),
        ]
    );
}

#[test]
fn resolve_all_keeps_inputs_shared_between_mappings() {
    let fs = project();
    let resolver = Resolver::new(Arc::new(fs), "/proj");
    let first = FileMapping::expanded("source/js", "one", &["a.js"]);
    let second = FileMapping::expanded("source/js", "two", &["*.js"]);

    let pairs = resolver.resolve_all(&[first.clone(), second, first]).unwrap();

    assert_eq!(
        pairs,
        vec![
            pair("/proj/source/js/a.js", "/proj/one/a.js"),
            pair("/proj/source/js/a.js", "/proj/two/a.js"),
        ]
    );
}

#[test]
fn compact_destinations_each_get_their_shared_source() {
    let fs = MockFileSystem::new();
    fs.add_file("/proj/src/shared.js", "s");
    fs.add_file("/proj/src/a.js", "a");
    fs.add_file("/proj/src/b.js", "b");
    let cfg: TargetConfig = toml::from_str(
        r#"
files = { "dist/app.js" = ["src/shared.js", "src/a.js"], "dist/vendor.js" = ["src/shared.js", "src/b.js"] }
"#,
    )
    .unwrap();
    let resolver = Resolver::new(Arc::new(fs), "/proj");

    let pairs = resolver.resolve_all(&mappings_for_target(&cfg)).unwrap();

    assert_eq!(
        pairs,
        vec![
            pair("/proj/src/shared.js", "/proj/dist/app.js"),
            pair("/proj/src/a.js", "/proj/dist/app.js"),
            pair("/proj/src/shared.js", "/proj/dist/vendor.js"),
            pair("/proj/src/b.js", "/proj/dist/vendor.js"),
        ]
    );
}
