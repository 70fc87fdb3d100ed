//! Implementation of the `pipelease lock` commands.
//!
//! These drive the lease protocol one call at a time as this session's owner,
//! which is useful for scripting and for inspecting a shared store.

use super::Store;
use super::pipeline::lease_column;
use crate::cli::{LockAcquireArgs, LockClearArgs, LockStatusArgs, PipelineNameArgs};
use crate::error::{LeaseError, Result};
use crate::lease::ReleaseOutcome;
use chrono::Utc;

/// Execute `pipelease lock acquire`.
pub fn cmd_acquire(store: &Store, args: LockAcquireArgs) -> Result<()> {
    let leases = store.plane.leases();

    if args.force {
        let (record, displaced) = leases.force_acquire(&args.name, &store.owner)?;
        match displaced {
            Some(previous) if !previous.is_held_by(&store.owner) => println!(
                "Took over lease on '{}' from {} (expires {}).",
                args.name,
                previous.owner_id,
                record.expires_at.to_rfc3339()
            ),
            _ => println!(
                "Acquired lease on '{}' (expires {}).",
                args.name,
                record.expires_at.to_rfc3339()
            ),
        }
        return Ok(());
    }

    let record = leases.acquire(&args.name, &store.owner)?;
    println!(
        "Acquired lease on '{}' (expires {}).",
        args.name,
        record.expires_at.to_rfc3339()
    );
    println!(
        "Run `pipelease lock renew {}` within {}s to keep it.",
        args.name,
        leases.ttl().num_seconds()
    );
    Ok(())
}

/// Execute `pipelease lock renew`.
pub fn cmd_renew(store: &Store, args: PipelineNameArgs) -> Result<()> {
    let record = store.plane.leases().renew(&args.name, &store.owner)?;
    println!(
        "Renewed lease on '{}' (expires {}).",
        args.name,
        record.expires_at.to_rfc3339()
    );
    Ok(())
}

/// Execute `pipelease lock release`.
///
/// Always succeeds; the outcome only changes the message.
pub fn cmd_release(store: &Store, args: PipelineNameArgs) -> Result<()> {
    match store.plane.leases().release(&args.name, &store.owner)? {
        ReleaseOutcome::Released => println!("Released lease on '{}'.", args.name),
        ReleaseOutcome::NotHeld => println!("No active lease on '{}'.", args.name),
        ReleaseOutcome::HeldByOther(owner) => println!(
            "Lease on '{}' is held by {}; left untouched.",
            args.name, owner
        ),
    }
    Ok(())
}

/// Execute `pipelease lock status`.
pub fn cmd_status(store: &Store, args: LockStatusArgs) -> Result<()> {
    let status = store.plane.lock_status();

    if let Some(name) = args.name {
        let lease = status.status_of(&name)?;
        println!("{}: {}", name, lease_column(lease.as_ref(), &store.owner));
        return Ok(());
    }

    let leases = status.lock_statuses()?;
    if leases.is_empty() {
        println!("No active leases.");
        return Ok(());
    }

    let now = Utc::now();
    println!("{:<32} {:<40} EXPIRES IN", "PIPELINE", "OWNER");
    for lease in &leases {
        let owner = if lease.is_held_by(&store.owner) {
            format!("{} (you)", lease.owner_id)
        } else {
            lease.owner_id.to_string()
        };
        println!(
            "{:<32} {:<40} {}",
            lease.resource_id,
            owner,
            lease.remaining_string(now)
        );
    }
    Ok(())
}

/// Execute `pipelease lock clear`.
///
/// Takes the lease over and releases it, so the audit log shows who cleared
/// it and from whom.
pub fn cmd_clear(store: &Store, args: LockClearArgs) -> Result<()> {
    if !args.force {
        return Err(LeaseError::UserError(format!(
            "refusing to clear the lease on '{}' without --force.\n\
             Another session may be editing it; its unsaved changes will be rejected.",
            args.name
        )));
    }

    let leases = store.plane.leases();
    let Some(previous) = leases.status_of(&args.name)? else {
        println!("No active lease on '{}'.", args.name);
        return Ok(());
    };

    leases.force_acquire(&args.name, &store.owner)?;
    leases.release(&args.name, &store.owner)?;
    println!(
        "Cleared lease on '{}' (was held by {}).",
        args.name, previous.owner_id
    );
    Ok(())
}

/// Execute `pipelease lock sweep`.
pub fn cmd_sweep(store: &Store) -> Result<()> {
    let removed = store.plane.leases().sweep_expired()?;
    println!("Removed {} expired lease record(s).", removed);
    Ok(())
}
