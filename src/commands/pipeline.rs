//! Implementation of the `pipelease pipeline` commands.
//!
//! `add` and `rm` change a pipeline only while holding its edit lease, so a
//! scripted change can never overwrite a pipeline someone is editing. If this
//! session already held the lease (an open `lock acquire`), it is kept;
//! otherwise it is released again once the change is written.

use super::Store;
use crate::catalog::Pipeline;
use crate::cli::{PipelineAddArgs, PipelineNameArgs};
use crate::error::{LeaseError, Result};
use crate::events::{Event, EventAction};
use crate::lease::LeaseRecord;
use crate::session::SessionOwnerId;
use chrono::Utc;
use serde_json::{Value, json};

/// Execute `pipelease pipeline add`.
pub fn cmd_add(store: &Store, args: PipelineAddArgs) -> Result<()> {
    let settings = parse_settings(&args.settings)?;

    let (created, saved) = with_edit_lease(store, &args.name, || {
        let catalog = store.plane.catalog();
        let created = catalog.get(&args.name)?.is_none();
        let saved = catalog.put(Pipeline::new(&args.name, settings, Utc::now()))?;
        Ok((created, saved))
    })?;

    store.events.record(
        Event::new(EventAction::PipelineAdd, store.owner.as_str())
            .with_resource(&saved.name)
            .with_details(json!({ "created": created })),
    );

    if created {
        println!("Added pipeline '{}'.", saved.name);
    } else {
        println!("Updated pipeline '{}'.", saved.name);
    }
    Ok(())
}

/// Execute `pipelease pipeline rm`.
pub fn cmd_rm(store: &Store, args: PipelineNameArgs) -> Result<()> {
    let removed = with_edit_lease(store, &args.name, || {
        store.plane.catalog().remove(&args.name)
    })?;

    if !removed {
        return Err(LeaseError::UserError(format!(
            "pipeline '{}' not found",
            args.name
        )));
    }

    store.events.record(
        Event::new(EventAction::PipelineRemove, store.owner.as_str()).with_resource(&args.name),
    );
    println!("Removed pipeline '{}'.", args.name);
    Ok(())
}

/// Execute `pipelease pipeline show`.
pub fn cmd_show(store: &Store, args: PipelineNameArgs) -> Result<()> {
    let pipeline = store
        .plane
        .catalog()
        .get(&args.name)?
        .ok_or_else(|| LeaseError::UserError(format!("pipeline '{}' not found", args.name)))?;
    let lease = store.plane.lock_status().status_of(&args.name)?;

    println!("Pipeline: {}", pipeline.name);
    println!("Created:  {}", pipeline.created_at.to_rfc3339());
    println!("Updated:  {}", pipeline.last_updated.to_rfc3339());
    println!("Lease:    {}", lease_column(lease.as_ref(), &store.owner));
    println!();
    println!("Settings:");
    let settings = serde_json::to_string_pretty(&pipeline.settings)
        .map_err(|e| LeaseError::UserError(format!("failed to render settings: {}", e)))?;
    for line in settings.lines() {
        println!("  {}", line);
    }
    Ok(())
}

/// Execute `pipelease pipeline list`.
pub fn cmd_list(store: &Store) -> Result<()> {
    let pipelines = store.plane.catalog().list()?;
    if pipelines.is_empty() {
        println!("No pipelines.");
        return Ok(());
    }

    let leases = store.plane.lock_status().lock_statuses()?;

    println!("{:<32} {:<26} LEASE", "PIPELINE", "UPDATED");
    for pipeline in &pipelines {
        let lease = leases.iter().find(|r| r.resource_id == pipeline.name);
        println!(
            "{:<32} {:<26} {}",
            pipeline.name,
            pipeline.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
            lease_column(lease, &store.owner)
        );
    }
    println!();
    println!("{} pipeline(s)", pipelines.len());
    Ok(())
}

/// Run `change` while holding the edit lease on `name`.
fn with_edit_lease<T>(store: &Store, name: &str, change: impl FnOnce() -> Result<T>) -> Result<T> {
    let leases = store.plane.leases();
    let already_held = leases
        .status_of(name)?
        .is_some_and(|r| r.is_held_by(&store.owner));

    leases.acquire(name, &store.owner)?;
    let result = change();

    if !already_held && let Err(e) = leases.release(name, &store.owner) {
        log::warn!("failed to release '{}' after change: {}", name, e);
    }
    result
}

pub(crate) fn parse_settings(raw: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| LeaseError::UserError(format!("settings must be valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(LeaseError::UserError(
            "settings must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// "free", "you (25s left)" or "alice (1m 5s left)".
pub(crate) fn lease_column(lease: Option<&LeaseRecord>, owner: &SessionOwnerId) -> String {
    let Some(lease) = lease else {
        return "free".to_string();
    };
    let holder = if lease.is_held_by(owner) {
        "you".to_string()
    } else {
        lease.owner_id.to_string()
    };
    format!("{} ({} left)", holder, lease.remaining_string(Utc::now()))
}
