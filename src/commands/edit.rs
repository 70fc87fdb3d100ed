//! Implementation of the `pipelease edit` command.
//!
//! Holds the edit lease on one pipeline with a running heartbeat and reads
//! commands from stdin:
//!
//! - `save [<json>]`: write the pipeline (optionally with new settings) and release
//! - `cancel`: release without writing
//! - `status`: print the lease state
//!
//! End of input is treated as the process going away: the lease is released
//! on the unload path, which never waits longer than
//! `unload_release_timeout_ms`.

use super::Store;
use super::pipeline::parse_settings;
use crate::catalog::Pipeline;
use crate::cli::EditArgs;
use crate::client::{CloseReason, EditSession, EditSettings, LeaseClient, UnloadRelease};
use crate::error::{LeaseError, Result};
use crate::events::{Event, EventAction};
use serde_json::json;
use std::io::{self, BufRead};
use std::sync::Arc;

/// How an edit ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EditOutcome {
    Saved,
    Cancelled,
    Terminated(UnloadRelease),
}

/// Execute `pipelease edit`.
pub fn cmd_edit(store: Store, args: EditArgs) -> Result<()> {
    let settings = EditSettings::from_config(&store.config);
    let stdin = io::stdin();
    run_edit(&store, &args.name, settings, stdin.lock())?;
    Ok(())
}

pub(crate) fn run_edit(
    store: &Store,
    name: &str,
    settings: EditSettings,
    input: impl BufRead,
) -> Result<EditOutcome> {
    let catalog = store.plane.catalog();
    let pipeline = catalog
        .get(name)?
        .ok_or_else(|| LeaseError::UserError(format!("pipeline '{}' not found", name)))?;

    let client = Arc::new(LeaseClient::new(
        Arc::new(store.plane.clone()),
        store.plane.leases().clock().clone(),
        store.owner.clone(),
    ));
    let session = EditSession::open(client, name, settings)?;

    println!("Editing '{}' as {}.", name, store.owner);
    println!("Commands: save [<settings json>], cancel, status");

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("failed to read edit input: {}", e);
                break;
            }
        };
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));

        match command {
            "" => {}
            "save" => {
                let settings = if rest.trim().is_empty() {
                    pipeline.settings.clone()
                } else {
                    match parse_settings(rest.trim()) {
                        Ok(settings) => settings,
                        Err(e) => {
                            eprintln!("Error: {}", e);
                            continue;
                        }
                    }
                };

                session.ensure_exclusive()?;
                catalog.put(Pipeline {
                    settings,
                    ..pipeline
                })?;
                store.events.record(
                    Event::new(EventAction::PipelineAdd, store.owner.as_str())
                        .with_resource(name)
                        .with_details(json!({ "edited": true })),
                );
                session.close(CloseReason::Saved)?;
                println!("Saved '{}'.", name);
                return Ok(EditOutcome::Saved);
            }
            "cancel" => {
                session.close(CloseReason::Cancelled)?;
                println!("Cancelled edit of '{}'.", name);
                return Ok(EditOutcome::Cancelled);
            }
            "status" => println!("{}", session.state()),
            other => eprintln!("Unknown command '{}'.", other),
        }
    }

    let released = session.terminate();
    match &released {
        UnloadRelease::Confirmed(_) | UnloadRelease::NothingHeld => {
            println!("Input closed; released '{}'.", name)
        }
        UnloadRelease::BestEffort => println!(
            "Input closed; release of '{}' not confirmed (the lease will expire on its own).",
            name
        ),
    }
    Ok(EditOutcome::Terminated(released))
}
