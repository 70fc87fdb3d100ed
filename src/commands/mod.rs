//! Command implementations for pipelease.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the store session every command except `init`
//! starts from.

mod edit;
mod init;
mod lock;
mod pipeline;
mod summary;
mod watch;

#[cfg(test)]
mod tests;

use crate::api::ControlPlane;
use crate::cli::{Command, GlobalArgs, LockAction, PipelineAction};
use crate::config::Config;
use crate::context::{StoreContext, require_initialized_store};
use crate::error::Result;
use crate::events::EventLog;
use crate::session::{SessionOwnerId, default_profile_path};

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(global: GlobalArgs, command: Command) -> Result<()> {
    match command {
        Command::Init => init::cmd_init(&global),
        Command::Pipeline(cmd) => match cmd.action {
            PipelineAction::Add(args) => pipeline::cmd_add(&open_store(&global)?, args),
            PipelineAction::Rm(args) => pipeline::cmd_rm(&open_store(&global)?, args),
            PipelineAction::Show(args) => pipeline::cmd_show(&open_store(&global)?, args),
            PipelineAction::List => pipeline::cmd_list(&open_store(&global)?),
        },
        Command::Lock(cmd) => match cmd.action {
            LockAction::Acquire(args) => lock::cmd_acquire(&open_store(&global)?, args),
            LockAction::Renew(args) => lock::cmd_renew(&open_store(&global)?, args),
            LockAction::Release(args) => lock::cmd_release(&open_store(&global)?, args),
            LockAction::Status(args) => lock::cmd_status(&open_store(&global)?, args),
            LockAction::Clear(args) => lock::cmd_clear(&open_store(&global)?, args),
            LockAction::Sweep => lock::cmd_sweep(&open_store(&global)?),
        },
        Command::Edit(args) => edit::cmd_edit(open_store(&global)?, args),
        Command::Watch(args) => watch::cmd_watch(open_store(&global)?, args),
        Command::Summary => summary::cmd_summary(&open_store(&global)?),
    }
}

/// An initialized store opened by one CLI process.
pub struct Store {
    pub ctx: StoreContext,
    pub config: Config,
    pub plane: ControlPlane,
    pub events: EventLog,
    pub owner: SessionOwnerId,
}

/// Resolve, validate and open the store named by the global options.
pub fn open_store(global: &GlobalArgs) -> Result<Store> {
    let ctx = require_initialized_store(global.store.as_deref())?;
    let config = ctx.load_config()?;
    let plane = ctx.control_plane(&config)?;
    let events = EventLog::new(ctx.events_file());
    let owner = resolve_owner(global)?;

    Ok(Store {
        ctx,
        config,
        plane,
        events,
        owner,
    })
}

/// `--owner`, else the id persisted in the profile file.
pub fn resolve_owner(global: &GlobalArgs) -> Result<SessionOwnerId> {
    match &global.owner {
        Some(owner) if !owner.trim().is_empty() => Ok(SessionOwnerId::new(owner.trim())),
        _ => SessionOwnerId::load_or_create(default_profile_path()?),
    }
}
