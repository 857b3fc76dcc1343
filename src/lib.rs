// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod units;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::{ApplyArgs, CliArgs, Command};
use crate::config::loader::{default_config_path, load_and_validate};
use crate::config::model::{ConfigFile, Section};
use crate::dag::{RunContext, RunOptions};
use crate::engine::{Engine, Operation, Stage};
use crate::exec::ShellRunner;
use crate::types::Phase;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the engine and the shell command runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;
    debug!(config = %config_path.display(), units = cfg.unit_count(), "config loaded");

    let options = run_options(&args, &cfg);
    let engine = Engine::new(&cfg, Arc::new(ShellRunner::new())).with_options(options);

    match args.command {
        Command::Validate => {
            print_summary(&cfg, options);
            Ok(())
        }
        Command::Plan { destroy } => {
            let operation = if destroy {
                Operation::Destroy
            } else {
                Operation::Deploy
            };
            print_plan(operation, &engine.plan(operation)?);
            Ok(())
        }
        Command::Deploy(apply) => run_apply(&engine, Operation::Deploy, apply).await,
        Command::Destroy(apply) => run_apply(&engine, Operation::Destroy, apply).await,
        Command::Build(target) => run_operation(&engine, Operation::Build, target.unit).await,
        Command::Push(target) => run_operation(&engine, Operation::Push, target.unit).await,
    }
}

/// CLI flags override `[project]`.
fn run_options(args: &CliArgs, cfg: &ConfigFile) -> RunOptions {
    let from_config = cfg.run_options();
    RunOptions {
        max_concurrency: args
            .max_concurrency
            .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
            .or(from_config.max_concurrency),
        fail_stop: args.fail_stop || from_config.fail_stop,
    }
}

async fn run_apply(engine: &Engine, operation: Operation, apply: ApplyArgs) -> Result<()> {
    if apply.dry_run {
        match apply.unit.as_deref() {
            Some(name) => print_unit_plan(engine, operation, name)?,
            None => print_plan(operation, &engine.plan(operation)?),
        }
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    if apply.unit.is_none() && !apply.auto_approve {
        warn!(
            %operation,
            "please set flag --auto-approve to {operation} all units; nothing was run"
        );
        return Ok(());
    }

    run_operation(engine, operation, apply.unit).await
}

async fn run_operation(engine: &Engine, operation: Operation, unit: Option<String>) -> Result<()> {
    let ctx = RunContext::new();

    // Ctrl-C → stop launching units and kill running commands.
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl-C received; cancelling run");
            ctx.cancel();
        });
    }

    match unit {
        Some(name) => engine.run_unit(&ctx, operation, &name).await?,
        None => engine.run_all(&ctx, operation).await?,
    }
    Ok(())
}

fn print_summary(cfg: &ConfigFile, options: RunOptions) {
    println!("rollout config is valid");
    println!("  project.namespace = {}", cfg.project.namespace);
    println!("  project.env = {}", cfg.project.env);
    println!("  project.tag = {}", cfg.project.tag);
    match options.max_concurrency {
        Some(n) => println!("  max_concurrency = {n}"),
        None => println!("  max_concurrency = unbounded"),
    }
    println!("  fail_stop = {}", options.fail_stop);
    println!();

    println!("infra ({}):", cfg.infra.len());
    for (name, infra) in cfg.infra.iter() {
        println!("  - {name}");
        if !infra.depends_on.is_empty() {
            println!("      depends_on: {:?}", infra.depends_on);
        }
    }

    println!("apps ({}):", cfg.app.len());
    for (name, app) in cfg.app.iter() {
        println!("  - {name} ({})", app.kind);
        if !app.depends_on.is_empty() {
            println!("      depends_on: {:?}", app.depends_on);
        }
    }
}

fn print_plan(operation: Operation, stages: &[Stage]) {
    println!("rollout plan: {operation}");
    if stages.is_empty() {
        println!("  nothing to do");
        return;
    }

    for stage in stages {
        println!();
        println!(
            "{} ({} order, phases: {})",
            stage.section,
            stage.direction,
            join_phases(stage.phases)
        );
        for (i, wave) in stage.waves.iter().enumerate() {
            println!("  wave {}: {}", i + 1, wave.join(", "));
        }
    }
}

fn print_unit_plan(engine: &Engine, operation: Operation, name: &str) -> Result<()> {
    let unit = engine
        .unit(name)
        .ok_or_else(|| errors::RolloutError::UnknownUnit(name.to_string()))?;
    let section = match unit {
        units::Unit::InfraStack(_) => Section::Infra,
        _ => Section::App,
    };

    println!("rollout plan: {operation} {name} ({})", unit.kind());
    for &phase in operation.phases(section) {
        match unit.request(phase) {
            Some(request) => println!("  {phase}: {}", request.command),
            None => println!("  {phase}: (no-op)"),
        }
    }
    Ok(())
}

fn join_phases(phases: &[Phase]) -> String {
    phases
        .iter()
        .map(|phase| phase.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
