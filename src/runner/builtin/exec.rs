// src/runner/builtin/exec.rs

//! Shell command runner.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::runner::{RunContext, RunFuture, Runner};

/// Lines of stderr kept for the failure message.
const STDERR_TAIL: usize = 20;

/// Runs `options.cmd` through the platform shell in the project root.
///
/// Options:
/// - `cmd` (required): command line. `{inputs}` expands to every input,
///   shell-quoted and space-separated.
/// - `per_file = true`: run once per pair instead, with `{input}` and
///   `{output}` substituted.
/// - `timeout_secs`: kill the command after this many seconds.
///
/// stdout is inherited; stderr is forwarded line by line and its tail is
/// attached to the error on a non-zero exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecRunner;

impl Runner for ExecRunner {
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin(run_exec(ctx))
    }
}

async fn run_exec(ctx: &RunContext) -> Result<()> {
    let template = ctx
        .option_str("cmd")
        .ok_or_else(|| anyhow!("missing `cmd` option"))?;
    let timeout = match ctx.option_int("timeout_secs") {
        Some(secs) if secs > 0 => Some(Duration::from_secs(secs as u64)),
        Some(secs) => bail!("`timeout_secs` must be positive, got {secs}"),
        None => None,
    };

    if ctx.option_bool("per_file").unwrap_or(false) {
        for pair in ctx.pairs.iter() {
            let cmd = template
                .replace("{input}", &shell_quote(&pair.input))
                .replace("{output}", &shell_quote(&pair.output));
            run_command(ctx, &cmd, timeout).await?;
        }
        return Ok(());
    }

    let inputs: Vec<String> = ctx.inputs().map(shell_quote).collect();
    let cmd = template.replace("{inputs}", &inputs.join(" "));
    run_command(ctx, &cmd, timeout).await
}

async fn run_command(ctx: &RunContext, cmd_line: &str, timeout: Option<Duration>) -> Result<()> {
    info!(
        invocation = %ctx.invocation,
        cmd = %cmd_line,
        "starting command"
    );

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd_line);
        c
    };

    cmd.current_dir(&ctx.root)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{}`", cmd_line))?;

    // Always consume stderr so buffers don't fill.
    let stderr_task = child.stderr.take().map(|stderr| {
        let invocation = ctx.invocation.to_string();
        tokio::spawn(async move {
            let mut tail: Vec<String> = Vec::new();
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                eprintln!("{line}");
                debug!(invocation = %invocation, "stderr: {}", line);
                if tail.len() == STDERR_TAIL {
                    tail.remove(0);
                }
                tail.push(line);
            }
            tail
        })
    });

    let status = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(cmd = %cmd_line, error = %e, "failed to kill timed out command");
                }
                bail!("`{}` timed out after {:?}", cmd_line, limit);
            }
        },
        None => child.wait().await,
    }
    .with_context(|| format!("waiting for `{}`", cmd_line))?;

    let tail = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    };

    let code = status.code().unwrap_or(-1);
    info!(
        invocation = %ctx.invocation,
        exit_code = code,
        success = status.success(),
        "command exited"
    );

    if status.success() {
        return Ok(());
    }

    let mut message = format!("`{}` exited with code {}", cmd_line, code);
    if !tail.is_empty() {
        message.push_str(":\n");
        message.push_str(&tail.join("\n"));
    }
    Err(anyhow!(message))
}

/// Single-quote a path for `sh`.
fn shell_quote(path: &Path) -> String {
    let s = path.to_string_lossy();
    if !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+,:@".contains(c))
    {
        return s.into_owned();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;
    use crate::graph::Invocation;
    use crate::resolve::FilePair;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn ctx(root: &Path, options: &str, pairs: Vec<FilePair>) -> RunContext {
        RunContext {
            invocation: Invocation::new("exec", Some("test")),
            options: toml::from_str(options).unwrap(),
            pairs,
            root: root.to_path_buf(),
            fs: Arc::new(RealFileSystem),
        }
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(shell_quote(Path::new("src/a.js")), "src/a.js");
        assert_eq!(shell_quote(Path::new("my file.js")), "'my file.js'");
        assert_eq!(shell_quote(Path::new("it's.js")), r"'it'\''s.js'");
    }

    #[tokio::test]
    async fn runs_in_project_root_with_inputs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::write(dir.path().join("b.txt"), "B").unwrap();

        let pairs = vec![
            FilePair {
                input: dir.path().join("a.txt"),
                output: dir.path().join("a.txt"),
            },
            FilePair {
                input: dir.path().join("b.txt"),
                output: dir.path().join("b.txt"),
            },
        ];
        let c = ctx(dir.path(), "cmd = 'cat {inputs} > joined.txt'", pairs);
        ExecRunner.run(&c).await.unwrap();

        let joined = std::fs::read_to_string(dir.path().join("joined.txt")).unwrap();
        assert_eq!(joined, "AB");
    }

    #[tokio::test]
    async fn per_file_substitutes_input_and_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("in.txt"), "hello").unwrap();

        let pairs = vec![FilePair {
            input: dir.path().join("in.txt"),
            output: dir.path().join("out.txt"),
        }];
        let c = ctx(
            dir.path(),
            "cmd = 'cp {input} {output}'\nper_file = true",
            pairs,
        );
        ExecRunner.run(&c).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "hello"
        );
    }

    #[tokio::test]
    async fn non_zero_exit_reports_stderr_tail() {
        let dir = TempDir::new().unwrap();
        let c = ctx(dir.path(), "cmd = 'echo broken >&2; exit 3'", Vec::new());

        let err = ExecRunner.run(&c).await.unwrap_err().to_string();
        assert!(err.contains("code 3"), "{err}");
        assert!(err.contains("broken"), "{err}");
    }

    #[tokio::test]
    async fn timeout_kills_the_command() {
        let dir = TempDir::new().unwrap();
        let c = ctx(dir.path(), "cmd = 'sleep 5'\ntimeout_secs = 1", Vec::new());

        let err = ExecRunner.run(&c).await.unwrap_err().to_string();
        assert!(err.contains("timed out"), "{err}");
    }
}
