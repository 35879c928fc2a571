// src/lib.rs

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod graph;
pub mod incremental;
pub mod logging;
pub mod registry;
pub mod resolve;
pub mod runner;
pub mod types;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::app::Taskgraph;
use crate::cli::CliArgs;
use crate::config::loader::{config_root_dir, load_and_validate};
use crate::fs::RealFileSystem;
use crate::graph::validate_aliases;
use crate::runner::RunnerRegistry;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - target + runner registries
/// - alias expansion
/// - dispatch (and the watch loop when `watch` is requested)
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);

    let app = Taskgraph::new(
        cfg,
        root,
        RunnerRegistry::with_builtins(),
        Arc::new(RealFileSystem),
    );

    if args.list {
        print_list(&app);
        return Ok(());
    }

    if args.dry_run {
        print_dry_run(&app, &args.names)?;
        return Ok(());
    }

    app.execute(&args.names).await?;
    Ok(())
}

/// `--list`: tasks with targets, aliases and watch bindings.
fn print_list(app: &Taskgraph) {
    let cfg = app.config();

    println!("tasks ({}):", cfg.tasks().len());
    for (name, task) in cfg.tasks().iter() {
        let runner = task.runner_name(name);
        if runner == name {
            println!("  - {name}");
        } else {
            println!("  - {name} (runner: {runner})");
        }
        for (target, _) in task.targets.iter() {
            println!("      {name}:{target}");
        }
    }
    println!();

    println!("aliases ({}):", cfg.aliases().len());
    for (name, body) in cfg.aliases().iter() {
        println!("  - {name} = [{}]", body.join(", "));
    }

    let bindings = &cfg.watch_section().bindings;
    if !bindings.is_empty() {
        println!();
        println!("watch bindings ({}):", bindings.len());
        for (name, binding) in bindings.iter() {
            println!(
                "  - {name}: {:?} -> [{}]",
                binding.files.to_vec(),
                binding.tasks.join(", ")
            );
        }
    }
}

/// `--dry-run`: validate all aliases, then print what `names` expands to.
fn print_dry_run(app: &Taskgraph, names: &[String]) -> Result<()> {
    let expander = app.expander();
    let order = validate_aliases(&expander, app.config().aliases())?;
    debug!(aliases = order.len(), "all aliases expand cleanly");

    let sequence = app.expand(names)?;
    app.dispatcher().preflight(&sequence)?;

    println!("taskgraph dry-run: {}", names.join(" "));
    for (idx, invocation) in sequence.iter().enumerate() {
        println!("  {:>3}. {invocation}", idx + 1);
    }

    if sequence.iter().any(|inv| inv.is_watch()) {
        let bindings = app.watch_bindings()?;
        println!();
        println!("watch bindings ({}):", bindings.len());
        for binding in bindings.iter() {
            let steps: Vec<String> = binding.sequence.iter().map(ToString::to_string).collect();
            println!(
                "  - {} (spawn: {}, debounce: {}ms, livereload: {:?})",
                binding.name,
                binding.spawn(),
                binding.options.effective_debounce_ms(),
                binding.livereload_port()
            );
            if !steps.is_empty() {
                println!("      {}", steps.join(" -> "));
            }
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
