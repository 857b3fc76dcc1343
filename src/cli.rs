// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Command-line arguments for `rollout`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rollout",
    version,
    about = "Build, push, deploy and destroy interdependent units in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `ROLLOUT_CONFIG`, then `rollout.toml` in the current directory.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ROLLOUT_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Maximum number of units running at the same time.
    ///
    /// Overrides `[project].max_concurrency`.
    #[arg(long, global = true, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrency: Option<u64>,

    /// Stop launching new units after the first failure.
    #[arg(long, global = true)]
    pub fail_stop: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Deploy one unit, or everything in dependency order.
    Deploy(ApplyArgs),
    /// Destroy one unit, or everything in reverse dependency order.
    Destroy(ApplyArgs),
    /// Run the build phase of one app, or of every app.
    Build(UnitArg),
    /// Run the push phase of one app, or of every app.
    Push(UnitArg),
    /// Print the execution waves without running anything.
    Plan {
        /// Plan a destroy instead of a deploy.
        #[arg(long)]
        destroy: bool,
    },
    /// Load and validate the config, then print a summary.
    Validate,
}

#[derive(Debug, Clone, Args)]
pub struct ApplyArgs {
    /// Unit to act on. All units when omitted.
    #[arg(value_name = "UNIT")]
    pub unit: Option<String>,

    /// Required to act on all units at once.
    #[arg(long)]
    pub auto_approve: bool,

    /// Print what would run, but don't execute any commands.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct UnitArg {
    /// App to act on. All apps when omitted.
    #[arg(value_name = "UNIT")]
    pub unit: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
