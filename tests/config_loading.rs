// tests/config_loading.rs

use std::io::Write;

use taskgraph::config::{load_and_validate, load_from_str, FilesConfig, LiveReloadSetting};
use taskgraph::errors::TaskgraphError;
use taskgraph::types::MergePolicy;
use tempfile::NamedTempFile;

fn load(contents: &str) -> Result<taskgraph::config::ConfigFile, TaskgraphError> {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    load_and_validate(file.path())
}

#[test]
fn full_document_parses_in_declaration_order() {
    let cfg = load(
        r#"
[config]
option_merge = "deep"

[alias]
build = ["clean:dev", "newer:svgmin:dev"]

[task.svgmin]
runner = "exec"
[task.svgmin.options]
cmd = "svgo {input} -o {output}"
per_file = true

[[task.svgmin.target.dev.files]]
cwd = "source/img/icons"
dest = "build/tmp/svgmin/icons"
expand = true
src = ["*.svg"]

[task.svgmin.target.dist]
files = { "dist/sprite.svg" = ["build/tmp/svgmin/icons/*.svg"] }

[task.clean.target.dev]
src = ["build"]

[watch.options]
livereload = 35730

[watch.binding.svg]
files = ["source/img/**/*.svg", "!source/img/dev/*"]
tasks = ["newer:svgmin:dev"]
options = { debounce_delay = 0 }
"#,
    )
    .unwrap();

    assert_eq!(cfg.config_section().option_merge, MergePolicy::Deep);

    let svgmin = &cfg.tasks()["svgmin"];
    assert_eq!(svgmin.runner_name("svgmin"), "exec");
    let targets: Vec<&str> = svgmin.targets.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(targets, vec!["dev", "dist"]);
    assert!(matches!(
        svgmin.target("dev").unwrap().files,
        Some(FilesConfig::List(ref list)) if list.len() == 1
    ));
    assert!(matches!(
        svgmin.target("dist").unwrap().files,
        Some(FilesConfig::Compact(_))
    ));

    let watch = cfg.watch_section();
    assert_eq!(watch.options.livereload, Some(LiveReloadSetting::Port(35730)));
    assert_eq!(watch.bindings.len(), 1);
    assert_eq!(watch.bindings[0].1.options.debounce_delay, Some(0));
}

#[test]
fn empty_document_is_rejected() {
    match load("") {
        Err(TaskgraphError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    assert!(matches!(
        load("[task.clean\nsrc = 1"),
        Err(TaskgraphError::TomlError(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Taskgraph.toml"),
        Err(TaskgraphError::IoError(_))
    ));
}

#[test]
fn names_may_not_contain_the_target_separator() {
    let err = load(
        r#"
[alias]
"build:all" = ["clean"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskgraphError::ConfigError(msg) if msg.contains("':'")));
}

#[test]
fn watch_is_reserved() {
    let err = load(
        r#"
[alias]
watch = ["clean"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskgraphError::ConfigError(msg) if msg.contains("reserved")));
}

#[test]
fn empty_alias_is_rejected() {
    let err = load(
        r#"
[alias]
build = []
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskgraphError::ConfigError(msg) if msg.contains("empty task list")));
}

#[test]
fn target_cannot_mix_files_and_src() {
    let err = load(
        r#"
[task.copy.target.js]
src = ["a.js"]
files = { "dist/all.js" = ["*.js"] }
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskgraphError::ConfigError(msg) if msg.contains("both")));
}

#[test]
fn invalid_watch_pattern_is_rejected() {
    let err = load(
        r#"
[task.copy.target.js]
src = ["a.js"]

[watch.binding.js]
files = ["source/js/[.js"]
tasks = ["copy:js"]
"#,
    )
    .unwrap_err();
    assert!(matches!(err, TaskgraphError::ConfigError(msg) if msg.contains("invalid pattern")));
}

#[test]
fn raw_loading_skips_validation() {
    let raw = load_from_str("").unwrap();
    assert!(raw.task.is_empty());
    assert!(raw.alias.is_empty());
}
