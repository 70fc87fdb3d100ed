//! CLI argument parsing for pipelease.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Pipelease: exclusive edit leases for a shared pipeline catalogue.
///
/// Every process is a client of one store directory:
/// - Leases are time-bounded and kept alive by heartbeats
/// - A crashed editor's lease expires on its own
/// - Watchers poll lock status and catalogue changes cheaply
#[derive(Parser, Debug)]
#[command(name = "pipelease")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Store directory (default: $PIPELEASE_STORE or ./.pipelease).
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Session owner id to act as (default: the id saved in the profile file).
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands for pipelease.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a store directory.
    ///
    /// Creates the lease, catalogue and events directories and a
    /// config.yaml template.
    Init,

    /// Pipeline catalogue commands.
    Pipeline(PipelineCommand),

    /// Lease commands.
    ///
    /// Acquire, renew, release or inspect edit leases directly.
    Lock(LockCommand),

    /// Edit a pipeline interactively.
    ///
    /// Holds the lease and heartbeats until a `save` or `cancel` line is
    /// read from stdin. End of input releases the lease as on unload.
    Edit(EditArgs),

    /// Follow lock status and catalogue changes.
    ///
    /// Runs the lock and summary polls and prints the view whenever it changes.
    Watch(WatchArgs),

    /// Print the catalogue fingerprint (count and names).
    Summary,
}

/// Pipeline subcommands.
#[derive(Parser, Debug)]
pub struct PipelineCommand {
    #[command(subcommand)]
    pub action: PipelineAction,
}

/// Available pipeline actions.
#[derive(Subcommand, Debug)]
pub enum PipelineAction {
    /// Add a pipeline, or replace the settings of an existing one.
    ///
    /// Fails if another session is editing it.
    Add(PipelineAddArgs),

    /// Remove a pipeline.
    ///
    /// Fails if another session is editing it.
    Rm(PipelineNameArgs),

    /// Show one pipeline and its lease.
    Show(PipelineNameArgs),

    /// List pipelines, most recently updated first.
    List,
}

/// Arguments for `pipeline add`.
#[derive(Parser, Debug)]
pub struct PipelineAddArgs {
    /// Pipeline name.
    pub name: String,

    /// Pipeline settings as a JSON object.
    #[arg(long, default_value = "{}")]
    pub settings: String,
}

/// A single pipeline name.
#[derive(Parser, Debug)]
pub struct PipelineNameArgs {
    /// Pipeline name.
    pub name: String,
}

/// Lock subcommands.
#[derive(Parser, Debug)]
pub struct LockCommand {
    #[command(subcommand)]
    pub action: LockAction,
}

/// Available lock actions.
#[derive(Subcommand, Debug)]
pub enum LockAction {
    /// Acquire the lease on a pipeline.
    Acquire(LockAcquireArgs),

    /// Renew a lease held by this session.
    Renew(PipelineNameArgs),

    /// Release a lease held by this session.
    Release(PipelineNameArgs),

    /// Show active leases.
    Status(LockStatusArgs),

    /// Clear a lease regardless of its owner.
    ///
    /// Requires --force flag to prevent accidental clearing.
    Clear(LockClearArgs),

    /// Delete expired lease records.
    Sweep,
}

/// Arguments for `lock acquire`.
#[derive(Parser, Debug)]
pub struct LockAcquireArgs {
    /// Pipeline name.
    pub name: String,

    /// Take the lease even if another session holds it.
    #[arg(long)]
    pub force: bool,
}

/// Arguments for `lock status`.
#[derive(Parser, Debug)]
pub struct LockStatusArgs {
    /// Only show this pipeline.
    pub name: Option<String>,
}

/// Arguments for `lock clear`.
#[derive(Parser, Debug)]
pub struct LockClearArgs {
    /// Pipeline whose lease should be cleared.
    pub name: String,

    /// Force clearing the lease (required for safety).
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the `edit` command.
#[derive(Parser, Debug)]
pub struct EditArgs {
    /// Pipeline name.
    pub name: String,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Lock poll interval in milliseconds (default: config lock_poll_interval_secs).
    #[arg(long)]
    pub lock_interval_ms: Option<u64>,

    /// Summary poll interval in milliseconds (default: config summary_poll_interval_secs).
    #[arg(long)]
    pub summary_interval_ms: Option<u64>,

    /// Fetch and print the view once, then exit.
    #[arg(long)]
    pub once: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
