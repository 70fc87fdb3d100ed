//! Tests for the command implementations against a temporary store.

use super::edit::{EditOutcome, run_edit};
use super::init::init_store;
use super::pipeline::parse_settings;
use super::watch::render_view;
use super::*;
use crate::cli::{LockAcquireArgs, LockClearArgs, PipelineAddArgs, PipelineNameArgs};
use crate::client::{EditSettings, UnloadRelease};
use crate::error::LeaseError;
use crate::events::EventAction;
use crate::lease::ReleaseOutcome;
use crate::poller::ReconciliationPoller;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn global(temp_dir: &TempDir, owner: &str) -> GlobalArgs {
    GlobalArgs {
        store: Some(temp_dir.path().join("store")),
        owner: Some(owner.to_string()),
        verbose: 0,
    }
}

/// Initialize a store and open it as `owner`.
fn store_as(temp_dir: &TempDir, owner: &str) -> Store {
    let global = global(temp_dir, owner);
    let ctx = StoreContext::resolve(global.store.as_deref()).unwrap();
    init_store(&ctx).unwrap();
    open_store(&global).unwrap()
}

fn add(store: &Store, name: &str, settings: &str) -> Result<()> {
    pipeline::cmd_add(
        store,
        PipelineAddArgs {
            name: name.to_string(),
            settings: settings.to_string(),
        },
    )
}

fn name(name: &str) -> PipelineNameArgs {
    PipelineNameArgs {
        name: name.to_string(),
    }
}

fn quick_edit() -> EditSettings {
    EditSettings {
        heartbeat_interval: Duration::from_secs(3600),
        unload_timeout: Duration::from_millis(500),
    }
}

#[test]
fn test_init_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = StoreContext::from_root(temp_dir.path().join("store"));

    assert!(init_store(&ctx).unwrap());
    assert!(ctx.is_initialized());
    assert!(!init_store(&ctx).unwrap());

    let config = ctx.load_config().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_init_rejects_broken_config() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = StoreContext::from_root(temp_dir.path());
    std::fs::write(ctx.config_path(), "lease_ttl_secs: [").unwrap();

    assert!(matches!(init_store(&ctx), Err(LeaseError::UserError(_))));
}

#[test]
fn test_open_store_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    let result = open_store(&global(&temp_dir, "alice"));
    assert!(matches!(result, Err(LeaseError::UserError(_))));
}

#[test]
fn test_explicit_owner_is_trimmed() {
    let temp_dir = TempDir::new().unwrap();
    let owner = resolve_owner(&global(&temp_dir, "  alice ")).unwrap();
    assert_eq!(owner.as_str(), "alice");
}

#[test]
fn test_pipeline_add_leaves_no_lease_behind() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");

    add(&store, "ingest", r#"{"stages": 2}"#).unwrap();

    let saved = store.plane.catalog().get("ingest").unwrap().unwrap();
    assert_eq!(saved.settings, json!({"stages": 2}));
    assert!(store.plane.leases().status_of("ingest").unwrap().is_none());

    let actions: Vec<_> = store
        .events
        .read_all()
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert!(actions.contains(&EventAction::PipelineAdd));
}

#[test]
fn test_pipeline_add_refused_while_another_session_edits() {
    let temp_dir = TempDir::new().unwrap();
    let alice = store_as(&temp_dir, "alice");
    let bob = open_store(&global(&temp_dir, "bob")).unwrap();
    add(&alice, "ingest", "{}").unwrap();

    alice.plane.leases().acquire("ingest", &alice.owner).unwrap();

    let err = add(&bob, "ingest", r#"{"stages": 9}"#).unwrap_err();
    assert!(matches!(err, LeaseError::LockHeld { ref owner, .. } if owner == "alice"));
    let stored = bob.plane.catalog().get("ingest").unwrap().unwrap();
    assert_eq!(stored.settings, json!({}));
}

#[test]
fn test_pipeline_add_keeps_a_lease_already_held() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    lock::cmd_acquire(
        &store,
        LockAcquireArgs {
            name: "ingest".to_string(),
            force: false,
        },
    )
    .unwrap();

    add(&store, "ingest", "{}").unwrap();

    let lease = store.plane.leases().status_of("ingest").unwrap().unwrap();
    assert!(lease.is_held_by(&store.owner));
}

#[test]
fn test_pipeline_add_rejects_bad_settings() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");

    assert!(add(&store, "ingest", "not json").is_err());
    assert!(add(&store, "ingest", "[1, 2]").is_err());
    assert!(store.plane.catalog().get("ingest").unwrap().is_none());
}

#[test]
fn test_pipeline_rm() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    add(&store, "ingest", "{}").unwrap();

    pipeline::cmd_rm(&store, name("ingest")).unwrap();
    assert!(store.plane.catalog().get("ingest").unwrap().is_none());

    let err = pipeline::cmd_rm(&store, name("ingest")).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn test_lock_release_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    store.plane.leases().acquire("ingest", &store.owner).unwrap();

    lock::cmd_release(&store, name("ingest")).unwrap();
    lock::cmd_release(&store, name("ingest")).unwrap();
    assert!(store.plane.leases().status_of("ingest").unwrap().is_none());
}

#[test]
fn test_lock_renew_without_lease_is_lease_loss() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");

    let err = lock::cmd_renew(&store, name("ingest")).unwrap_err();
    assert_eq!(err.exit_code(), crate::exit_codes::LEASE_LOST);
}

#[test]
fn test_lock_clear_requires_force() {
    let temp_dir = TempDir::new().unwrap();
    let alice = store_as(&temp_dir, "alice");
    let admin = open_store(&global(&temp_dir, "admin")).unwrap();
    alice.plane.leases().acquire("ingest", &alice.owner).unwrap();

    let refused = lock::cmd_clear(
        &admin,
        LockClearArgs {
            name: "ingest".to_string(),
            force: false,
        },
    );
    assert!(matches!(refused, Err(LeaseError::UserError(_))));
    assert!(admin.plane.leases().status_of("ingest").unwrap().is_some());

    lock::cmd_clear(
        &admin,
        LockClearArgs {
            name: "ingest".to_string(),
            force: true,
        },
    )
    .unwrap();
    assert!(admin.plane.leases().status_of("ingest").unwrap().is_none());

    // The original holder finds out on its next renew.
    let err = alice.plane.leases().renew("ingest", &alice.owner).unwrap_err();
    assert!(err.is_lease_loss());
}

#[test]
fn test_lock_acquire_force_takes_over() {
    let temp_dir = TempDir::new().unwrap();
    let alice = store_as(&temp_dir, "alice");
    let bob = open_store(&global(&temp_dir, "bob")).unwrap();
    alice.plane.leases().acquire("ingest", &alice.owner).unwrap();

    lock::cmd_acquire(
        &bob,
        LockAcquireArgs {
            name: "ingest".to_string(),
            force: true,
        },
    )
    .unwrap();

    let lease = bob.plane.leases().status_of("ingest").unwrap().unwrap();
    assert!(lease.is_held_by(&bob.owner));
}

#[test]
fn test_edit_save_writes_settings_and_releases() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    add(&store, "ingest", r#"{"stages": 1}"#).unwrap();

    let input = Cursor::new("status\nsave {\"stages\": 4}\n");
    let outcome = run_edit(&store, "ingest", quick_edit(), input).unwrap();

    assert_eq!(outcome, EditOutcome::Saved);
    let saved = store.plane.catalog().get("ingest").unwrap().unwrap();
    assert_eq!(saved.settings, json!({"stages": 4}));
    assert!(store.plane.leases().status_of("ingest").unwrap().is_none());
}

#[test]
fn test_edit_bad_settings_can_be_retried() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    add(&store, "ingest", "{}").unwrap();

    let input = Cursor::new("save [oops\nsave {\"ok\": true}\n");
    let outcome = run_edit(&store, "ingest", quick_edit(), input).unwrap();

    assert_eq!(outcome, EditOutcome::Saved);
    let saved = store.plane.catalog().get("ingest").unwrap().unwrap();
    assert_eq!(saved.settings, json!({"ok": true}));
}

#[test]
fn test_edit_cancel_keeps_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    add(&store, "ingest", r#"{"stages": 1}"#).unwrap();

    let outcome = run_edit(&store, "ingest", quick_edit(), Cursor::new("cancel\n")).unwrap();

    assert_eq!(outcome, EditOutcome::Cancelled);
    let saved = store.plane.catalog().get("ingest").unwrap().unwrap();
    assert_eq!(saved.settings, json!({"stages": 1}));
    assert!(store.plane.leases().status_of("ingest").unwrap().is_none());
}

#[test]
fn test_edit_end_of_input_releases_on_unload_path() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");
    add(&store, "ingest", "{}").unwrap();

    let outcome = run_edit(&store, "ingest", quick_edit(), Cursor::new("")).unwrap();

    assert_eq!(
        outcome,
        EditOutcome::Terminated(UnloadRelease::Confirmed(ReleaseOutcome::Released))
    );
    assert!(store.plane.leases().status_of("ingest").unwrap().is_none());
}

#[test]
fn test_edit_denied_while_another_session_edits() {
    let temp_dir = TempDir::new().unwrap();
    let alice = store_as(&temp_dir, "alice");
    let bob = open_store(&global(&temp_dir, "bob")).unwrap();
    add(&alice, "ingest", "{}").unwrap();
    alice.plane.leases().acquire("ingest", &alice.owner).unwrap();

    let err = run_edit(&bob, "ingest", quick_edit(), Cursor::new("save\n")).unwrap_err();

    assert_eq!(err.exit_code(), crate::exit_codes::LOCK_HELD);
    assert!(err.to_string().contains("alice"));
}

#[test]
fn test_edit_unknown_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_as(&temp_dir, "alice");

    let err = run_edit(&store, "missing", quick_edit(), Cursor::new("")).unwrap_err();
    assert!(matches!(err, LeaseError::UserError(_)));
}

#[test]
fn test_parse_settings_requires_object() {
    assert!(parse_settings(r#"{"a": 1}"#).is_ok());
    assert!(parse_settings("3").is_err());
    assert!(parse_settings("").is_err());
}

#[test]
fn test_render_view_marks_own_and_foreign_leases() {
    let temp_dir = TempDir::new().unwrap();
    let alice = store_as(&temp_dir, "alice");
    let bob = open_store(&global(&temp_dir, "bob")).unwrap();
    add(&alice, "ingest", "{}").unwrap();
    add(&alice, "export", "{}").unwrap();
    add(&alice, "archive", "{}").unwrap();
    alice.plane.leases().acquire("ingest", &alice.owner).unwrap();
    bob.plane.leases().acquire("export", &bob.owner).unwrap();

    let poller = ReconciliationPoller::new(Arc::new(alice.plane.clone()));
    poller.refetch().unwrap();
    let rendered = render_view(&poller.view(), &alice.owner);

    let line = |name: &str| {
        rendered
            .lines()
            .find(|l| l.starts_with(name))
            .unwrap()
            .to_string()
    };
    assert!(line("ingest").contains("you ("));
    assert!(line("export").contains("bob ("));
    assert!(line("archive").ends_with("free"));
}
