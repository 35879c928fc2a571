// src/runner/builtin/replace.rs

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use tracing::info;

use crate::runner::{RunContext, RunFuture, Runner};

/// Applies `options.replacements` to each input and writes the output.
///
/// ```toml
/// [task.string-replace.target.svg.options]
/// replacements = [
///   { pattern = "url\\(([^)]+)\\.svg\\)", replacement = "url($1.png)" },
/// ]
/// ```
///
/// Replacements apply in declaration order; `$1` style group references are
/// expanded by `regex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringReplaceRunner;

impl Runner for StringReplaceRunner {
    fn run<'a>(&'a self, ctx: &'a RunContext) -> RunFuture<'a> {
        Box::pin(async move { replace(ctx) })
    }
}

struct Replacement {
    pattern: Regex,
    replacement: String,
}

fn parse_replacements(ctx: &RunContext) -> Result<Vec<Replacement>> {
    let Some(value) = ctx.options.get("replacements") else {
        bail!("missing `replacements` option");
    };
    let entries = value
        .as_array()
        .ok_or_else(|| anyhow!("`replacements` must be an array of tables"))?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let table = entry
                .as_table()
                .ok_or_else(|| anyhow!("replacements[{idx}] must be a table"))?;
            let pattern = table
                .get("pattern")
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("replacements[{idx}] is missing `pattern`"))?;
            let replacement = table
                .get("replacement")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let pattern = Regex::new(pattern)
                .with_context(|| format!("compiling replacements[{idx}].pattern"))?;
            Ok(Replacement {
                pattern,
                replacement: replacement.to_string(),
            })
        })
        .collect()
}

fn replace(ctx: &RunContext) -> Result<()> {
    let replacements = parse_replacements(ctx)?;
    let fs = ctx.fs.as_ref();

    for pair in ctx.pairs.iter() {
        if fs.is_dir(&pair.input) {
            continue;
        }
        let mut text = fs.read_to_string(&pair.input)?;
        for r in replacements.iter() {
            text = r
                .pattern
                .replace_all(&text, r.replacement.as_str())
                .into_owned();
        }
        fs.write(&pair.output, text.as_bytes())?;
    }

    info!(
        invocation = %ctx.invocation,
        files = ctx.pairs.len(),
        rules = replacements.len(),
        "applied replacements"
    );
    Ok(())
}
