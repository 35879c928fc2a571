// src/runner/builtin/files.rs

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::incremental::compute_file_hash;
use crate::runner::{RunContext, RunFuture, Runner};

/// Removes every input path. Directories go recursively.
#[derive(Debug, Clone, Copy, Default)]
pub struct CleanRunner;

impl Runner for CleanRunner {
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin(async move { clean(ctx) })
    }
}

fn clean(ctx: &RunContext) -> Result<()> {
    let mut removed = 0usize;
    for input in ctx.inputs() {
        if !ctx.fs.exists(input) {
            continue;
        }
        ctx.fs
            .remove(input)
            .with_context(|| format!("cleaning {:?}", input))?;
        removed += 1;
    }
    info!(invocation = %ctx.invocation, removed, "cleaned paths");
    Ok(())
}

/// Copies inputs to outputs.
///
/// Inputs that share one output (a compact `files` table) are concatenated
/// in input order. Directory inputs are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyRunner;

impl Runner for CopyRunner {
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin(async move { copy(ctx) })
    }
}

fn copy(ctx: &RunContext) -> Result<()> {
    let fs = ctx.fs.as_ref();

    // output -> concatenated contents, in first-seen order
    let mut outputs: Vec<(&Path, Vec<u8>)> = Vec::new();
    for pair in ctx.pairs.iter() {
        if fs.is_dir(&pair.input) || pair.input == pair.output {
            continue;
        }
        let bytes = fs.read_bytes(&pair.input)?;
        match outputs.iter_mut().find(|(out, _)| *out == pair.output.as_path()) {
            Some((_, buf)) => buf.extend_from_slice(&bytes),
            None => outputs.push((pair.output.as_path(), bytes)),
        }
    }

    for (output, contents) in outputs.iter() {
        fs.write(output, contents)?;
        debug!(output = ?output, bytes = contents.len(), "wrote file");
    }
    info!(invocation = %ctx.invocation, files = outputs.len(), "copied files");
    Ok(())
}

/// Like [`CopyRunner`] for one-to-one mappings, but leaves outputs whose
/// content already matches untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncRunner;

impl Runner for SyncRunner {
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin(async move { sync(ctx) })
    }
}

fn sync(ctx: &RunContext) -> Result<()> {
    let fs = ctx.fs.as_ref();
    let mut copied = 0usize;
    for pair in ctx.pairs.iter() {
        if fs.is_dir(&pair.input) || pair.input == pair.output {
            continue;
        }
        if is_up_to_date(fs, &pair.input, &pair.output)? {
            continue;
        }
        let bytes = fs.read_bytes(&pair.input)?;
        fs.write(&pair.output, &bytes)?;
        copied += 1;
    }
    info!(
        invocation = %ctx.invocation,
        copied,
        total = ctx.pairs.len(),
        "synced files"
    );
    Ok(())
}

fn is_up_to_date(fs: &dyn FileSystem, input: &Path, output: &Path) -> Result<bool> {
    if !fs.is_file(output) {
        return Ok(false);
    }
    Ok(compute_file_hash(fs, input)? == compute_file_hash(fs, output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;
    use crate::runner::builtin::test_support::{context, pair};

    #[tokio::test]
    async fn clean_removes_files_and_directories() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/dist/app.js", "x");
        fs.add_file("/proj/dist/css/site.css", "y");
        fs.add_file("/proj/keep.txt", "z");

        let ctx = context(
            &fs,
            "",
            vec![pair("/proj/dist", "/proj/dist"), pair("/proj/missing", "/proj/missing")],
        );
        CleanRunner.run(&ctx).await.unwrap();

        assert!(!fs.exists(Path::new("/proj/dist")));
        assert!(!fs.exists(Path::new("/proj/dist/css/site.css")));
        assert!(fs.exists(Path::new("/proj/keep.txt")));
    }

    #[tokio::test]
    async fn copy_concatenates_inputs_sharing_an_output() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/a.js", "a;");
        fs.add_file("/proj/src/b.js", "b;");

        let ctx = context(
            &fs,
            "",
            vec![
                pair("/proj/src/a.js", "/proj/dist/a.js"),
                pair("/proj/src/a.js", "/proj/dist/bundle.js"),
                pair("/proj/src/b.js", "/proj/dist/bundle.js"),
            ],
        );
        CopyRunner.run(&ctx).await.unwrap();

        let fs: &dyn FileSystem = &fs;
        assert_eq!(fs.read_to_string(Path::new("/proj/dist/a.js")).unwrap(), "a;");
        assert_eq!(
            fs.read_to_string(Path::new("/proj/dist/bundle.js")).unwrap(),
            "a;b;"
        );
    }

    #[tokio::test]
    async fn sync_skips_identical_outputs() {
        let fs = MockFileSystem::new();
        fs.add_file("/proj/src/same.txt", "same");
        fs.add_file("/proj/out/same.txt", "same");
        fs.add_file("/proj/src/new.txt", "new");

        let before = FileSystem::metadata(&fs, Path::new("/proj/out/same.txt")).unwrap();
        let ctx = context(
            &fs,
            "",
            vec![
                pair("/proj/src/same.txt", "/proj/out/same.txt"),
                pair("/proj/src/new.txt", "/proj/out/new.txt"),
            ],
        );
        SyncRunner.run(&ctx).await.unwrap();

        let after = FileSystem::metadata(&fs, Path::new("/proj/out/same.txt")).unwrap();
        assert_eq!(before, after);
        assert_eq!(
            FileSystem::read_to_string(&fs, Path::new("/proj/out/new.txt")).unwrap(),
            "new"
        );
    }

    #[tokio::test]
    async fn copy_fails_on_unreadable_input() {
        let fs = MockFileSystem::new();
        let ctx = context(&fs, "", vec![pair("/proj/gone.txt", "/proj/out.txt")]);
        assert!(CopyRunner.run(&ctx).await.is_err());
    }
}
