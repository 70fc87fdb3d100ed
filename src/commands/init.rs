//! Implementation of the `pipelease init` command.
//!
//! # What `pipelease init` does
//!
//! 1. Resolves the store directory (`--store`, `$PIPELEASE_STORE`, `./.pipelease`)
//! 2. Creates `leases/`, `catalog/` and `events/`
//! 3. Creates a `config.yaml` template (if missing)
//! 4. Records an `init` event in the audit log

use super::resolve_owner;
use crate::cli::GlobalArgs;
use crate::config::Config;
use crate::context::StoreContext;
use crate::error::{LeaseError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::fs::atomic_write_file;
use serde_json::json;
use std::fs;
use std::path::Path;

/// Execute the `pipelease init` command.
///
/// This command is **idempotent**: running it again never overwrites an
/// existing config, lease or pipeline.
pub fn cmd_init(global: &GlobalArgs) -> Result<()> {
    let ctx = StoreContext::resolve(global.store.as_deref())?;
    let owner = resolve_owner(global)?;

    let config_created = init_store(&ctx)?;

    EventLog::new(ctx.events_file()).record(
        Event::new(EventAction::Init, owner.as_str())
            .with_details(json!({ "config_created": config_created })),
    );

    println!("Initialized pipelease store.");
    println!();
    println!("Store:  {}", ctx.root.display());
    println!("Owner:  {}", owner);
    println!();
    println!("Created directories:");
    println!("  leases/");
    println!("  catalog/");
    println!("  events/");
    if config_created {
        println!("Created config.yaml with default settings.");
    }
    println!();
    println!("You can now add pipelines with `pipelease pipeline add <name>`.");

    Ok(())
}

/// Create the store layout. Returns whether a new config file was written.
pub(crate) fn init_store(ctx: &StoreContext) -> Result<bool> {
    for dir in [&ctx.root, &ctx.leases_dir, &ctx.catalog_dir, &ctx.events_dir()] {
        create_dir(dir)?;
    }

    let config_path = ctx.config_path();
    if config_path.exists() {
        // Surface a broken config now rather than on the next command.
        Config::load(&config_path)?;
        return Ok(false);
    }

    atomic_write_file(&config_path, &config_template()?)?;
    Ok(true)
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        LeaseError::Store(format!(
            "failed to create directory '{}': {}",
            dir.display(),
            e
        ))
    })
}

fn config_template() -> Result<String> {
    Ok(format!(
        "# pipelease store configuration.\n\
         # Every field is optional; removed fields fall back to the defaults below.\n\
         {}",
        Config::default().to_yaml()?
    ))
}
