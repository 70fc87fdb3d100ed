//! Tests for the lease client, heartbeat, and edit sessions.

use super::*;
use crate::api::{ControlPlane, LeaseApi};
use crate::catalog::MemoryCatalog;
use crate::clock::ManualClock;
use crate::error::{LeaseError, Result};
use crate::lease::{LeaseRecord, LeaseService, MemoryLeaseStore, ReleaseOutcome};
use crate::session::SessionOwnerId;
use chrono::{Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

/// Lease API over a real control plane with switchable transport failures.
struct TestApi {
    inner: ControlPlane,
    fail_acquire: AtomicBool,
    fail_renew: AtomicBool,
    fail_release: AtomicBool,
    release_delay: Mutex<std::time::Duration>,
    renews: AtomicUsize,
    best_effort: Mutex<Vec<String>>,
}

impl TestApi {
    fn transport_error() -> LeaseError {
        LeaseError::Transport("connection refused".to_string())
    }
}

impl LeaseApi for TestApi {
    fn acquire(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord> {
        if self.fail_acquire.load(Ordering::SeqCst) {
            return Err(Self::transport_error());
        }
        self.inner.acquire(resource_id, owner)
    }

    fn renew(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord> {
        self.renews.fetch_add(1, Ordering::SeqCst);
        if self.fail_renew.load(Ordering::SeqCst) {
            return Err(Self::transport_error());
        }
        self.inner.renew(resource_id, owner)
    }

    fn release(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<ReleaseOutcome> {
        let delay = *self.release_delay.lock().unwrap();
        thread::sleep(delay);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(Self::transport_error());
        }
        self.inner.release(resource_id, owner)
    }

    fn release_best_effort(&self, resource_id: &str, owner: &SessionOwnerId) {
        self.best_effort
            .lock()
            .unwrap()
            .push(resource_id.to_string());
        let _ = self.inner.leases().release(resource_id, owner);
    }
}

struct Fixture {
    api: Arc<TestApi>,
    clock: ManualClock,
}

impl Fixture {
    /// TTL of 5 seconds on a manual clock.
    fn new() -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let leases = LeaseService::new(
            Arc::new(MemoryLeaseStore::new()),
            Arc::new(clock.clone()),
            Duration::seconds(5),
        );
        let catalog = Arc::new(MemoryCatalog::new(Arc::new(clock.clone())));
        let api = Arc::new(TestApi {
            inner: ControlPlane::new(leases, catalog),
            fail_acquire: AtomicBool::new(false),
            fail_renew: AtomicBool::new(false),
            fail_release: AtomicBool::new(false),
            release_delay: Mutex::new(std::time::Duration::ZERO),
            renews: AtomicUsize::new(0),
            best_effort: Mutex::new(Vec::new()),
        });
        Self { api, clock }
    }

    fn client(&self, owner: &str) -> Arc<LeaseClient> {
        Arc::new(LeaseClient::new(
            self.api.clone(),
            Arc::new(self.clock.clone()),
            SessionOwnerId::new(owner),
        ))
    }

    fn holder(&self, resource_id: &str) -> Option<String> {
        self.api
            .inner
            .leases()
            .status_of(resource_id)
            .unwrap()
            .map(|r| r.owner_id.to_string())
    }

    fn slow_settings() -> EditSettings {
        EditSettings {
            heartbeat_interval: std::time::Duration::from_secs(3600),
            unload_timeout: std::time::Duration::from_millis(200),
        }
    }
}

#[test]
fn test_acquire_moves_client_to_held() {
    let fx = Fixture::new();
    let client = fx.client("a");
    assert_eq!(client.state(), LeaseState::Idle);

    let record = client.acquire("svc-1").unwrap();

    assert_eq!(client.state(), LeaseState::Held(record));
    assert_eq!(fx.holder("svc-1").as_deref(), Some("a"));
}

#[test]
fn test_conflicting_acquire_is_denied_without_retry() {
    let fx = Fixture::new();
    fx.client("a").acquire("svc-1").unwrap();
    let b = fx.client("b");

    let err = b.acquire("svc-1").unwrap_err();

    assert!(matches!(err, LeaseError::LockHeld { ref owner, .. } if owner == "a"));
    assert!(matches!(b.state(), LeaseState::Denied { ref owner, .. } if owner == "a"));
    assert!(b.state().is_terminal_failure());
    // Denied is terminal for the attempt.
    assert!(matches!(b.acquire("svc-1"), Err(LeaseError::UserError(_))));
}

#[test]
fn test_transport_failure_on_acquire_returns_to_idle() {
    let fx = Fixture::new();
    fx.api.fail_acquire.store(true, Ordering::SeqCst);
    let client = fx.client("a");

    assert!(matches!(
        client.acquire("svc-1"),
        Err(LeaseError::Transport(_))
    ));
    assert_eq!(client.state(), LeaseState::Idle);
}

#[test]
fn test_heartbeat_extends_lease() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();

    fx.clock.advance(Duration::seconds(4));
    let state = client.heartbeat();

    let LeaseState::Held(record) = state else {
        panic!("expected held, got {:?}", state);
    };
    assert_eq!(
        record.expires_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 9).unwrap()
    );
}

#[test]
fn test_heartbeat_after_takeover_moves_to_lost() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();

    fx.api
        .inner
        .leases()
        .force_acquire("svc-1", &SessionOwnerId::new("admin"))
        .unwrap();

    let state = client.heartbeat();
    assert!(matches!(state, LeaseState::Lost { .. }));
    assert!(client.state().is_terminal_failure());
}

#[test]
fn test_heartbeat_after_expiry_moves_to_lost() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();

    fx.clock.advance(Duration::seconds(6));
    assert!(matches!(client.heartbeat(), LeaseState::Lost { .. }));
}

#[test]
fn test_transport_failure_on_renew_is_tolerated_until_expiry() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();
    fx.api.fail_renew.store(true, Ordering::SeqCst);

    fx.clock.advance(Duration::seconds(2));
    assert!(client.heartbeat().is_held());

    fx.clock.advance(Duration::seconds(4));
    let state = client.heartbeat();
    assert!(matches!(
        state,
        LeaseState::Lost { ref reason, .. } if reason.contains("without a confirmed renewal")
    ));
}

#[test]
fn test_no_renew_after_release() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();

    assert_eq!(client.release().unwrap(), ReleaseOutcome::Released);
    let renews_before = fx.api.renews.load(Ordering::SeqCst);

    assert_eq!(client.heartbeat(), LeaseState::Idle);
    assert_eq!(fx.api.renews.load(Ordering::SeqCst), renews_before);
    assert!(fx.holder("svc-1").is_none());
}

#[test]
fn test_release_from_denied_sends_nothing() {
    let fx = Fixture::new();
    fx.client("a").acquire("svc-1").unwrap();
    let b = fx.client("b");
    let _ = b.acquire("svc-1");

    assert_eq!(b.release().unwrap(), ReleaseOutcome::NotHeld);
    assert_eq!(b.state(), LeaseState::Idle);
    assert_eq!(fx.holder("svc-1").as_deref(), Some("a"));
}

#[test]
fn test_failed_release_still_leaves_client_idle() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();
    fx.api.fail_release.store(true, Ordering::SeqCst);

    assert!(client.release().is_err());
    assert_eq!(client.state(), LeaseState::Idle);

    // The orphaned lease expires on its own.
    fx.clock.advance(Duration::seconds(5));
    assert!(fx.client("b").acquire("svc-1").is_ok());
}

#[test]
fn test_edit_session_close_releases() {
    let fx = Fixture::new();
    let session = EditSession::open(fx.client("a"), "svc-1", Fixture::slow_settings()).unwrap();
    assert!(session.is_exclusive());
    assert!(session.ensure_exclusive().is_ok());

    assert_eq!(
        session.close(CloseReason::Saved).unwrap(),
        ReleaseOutcome::Released
    );
    assert!(fx.client("b").acquire("svc-1").is_ok());
}

#[test]
fn test_edit_session_drop_releases() {
    let fx = Fixture::new();
    {
        let _session =
            EditSession::open(fx.client("a"), "svc-1", Fixture::slow_settings()).unwrap();
        assert_eq!(fx.holder("svc-1").as_deref(), Some("a"));
    }
    assert!(fx.holder("svc-1").is_none());
}

#[test]
fn test_edit_session_open_denied() {
    let fx = Fixture::new();
    let _held = EditSession::open(fx.client("a"), "svc-1", Fixture::slow_settings()).unwrap();

    let err = EditSession::open(fx.client("b"), "svc-1", Fixture::slow_settings()).unwrap_err();
    assert!(matches!(err, LeaseError::LockHeld { .. }));
}

#[test]
fn test_ensure_exclusive_fails_after_loss() {
    let fx = Fixture::new();
    let client = fx.client("a");
    let session = EditSession::open(client.clone(), "svc-1", Fixture::slow_settings()).unwrap();

    fx.clock.advance(Duration::seconds(6));
    client.heartbeat();

    assert!(!session.is_exclusive());
    assert!(session.ensure_exclusive().is_err());
}

#[test]
fn test_terminate_confirms_release_when_reachable() {
    let fx = Fixture::new();
    let session = EditSession::open(fx.client("a"), "svc-1", Fixture::slow_settings()).unwrap();

    assert_eq!(
        session.terminate(),
        UnloadRelease::Confirmed(ReleaseOutcome::Released)
    );
    assert!(fx.api.best_effort.lock().unwrap().is_empty());
    assert!(fx.holder("svc-1").is_none());
}

#[test]
fn test_terminate_falls_back_to_best_effort_on_failure() {
    let fx = Fixture::new();
    let session = EditSession::open(fx.client("a"), "svc-1", Fixture::slow_settings()).unwrap();
    fx.api.fail_release.store(true, Ordering::SeqCst);

    assert_eq!(session.terminate(), UnloadRelease::BestEffort);
    assert_eq!(*fx.api.best_effort.lock().unwrap(), vec!["svc-1".to_string()]);
}

#[test]
fn test_terminate_falls_back_when_release_is_slow() {
    let fx = Fixture::new();
    let session = EditSession::open(
        fx.client("a"),
        "svc-1",
        EditSettings {
            heartbeat_interval: std::time::Duration::from_secs(3600),
            unload_timeout: std::time::Duration::from_millis(10),
        },
    )
    .unwrap();
    *fx.api.release_delay.lock().unwrap() = std::time::Duration::from_millis(300);

    let started = std::time::Instant::now();
    assert_eq!(session.terminate(), UnloadRelease::BestEffort);
    assert!(started.elapsed() < std::time::Duration::from_millis(250));
}

#[test]
fn test_terminate_with_nothing_held() {
    let fx = Fixture::new();
    let client = fx.client("a");
    assert_eq!(
        client.release_on_unload(std::time::Duration::from_millis(10)),
        UnloadRelease::NothingHeld
    );
}

#[test]
fn test_heartbeat_thread_renews_until_closed() {
    let fx = Fixture::new();
    let session = EditSession::open(
        fx.client("a"),
        "svc-1",
        EditSettings {
            heartbeat_interval: std::time::Duration::from_millis(5),
            unload_timeout: std::time::Duration::from_millis(200),
        },
    )
    .unwrap();

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while fx.api.renews.load(Ordering::SeqCst) < 3 && std::time::Instant::now() < deadline {
        thread::sleep(std::time::Duration::from_millis(2));
    }
    assert!(fx.api.renews.load(Ordering::SeqCst) >= 3);

    session.close(CloseReason::Cancelled).unwrap();
    let after_close = fx.api.renews.load(Ordering::SeqCst);
    thread::sleep(std::time::Duration::from_millis(30));
    assert_eq!(fx.api.renews.load(Ordering::SeqCst), after_close);
}

#[test]
fn test_heartbeat_thread_exits_when_lease_lost() {
    let fx = Fixture::new();
    let client = fx.client("a");
    client.acquire("svc-1").unwrap();
    fx.clock.advance(Duration::seconds(6));

    let heartbeat = Heartbeat::spawn(client.clone(), std::time::Duration::from_millis(5));
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    while heartbeat.is_running() && std::time::Instant::now() < deadline {
        thread::sleep(std::time::Duration::from_millis(2));
    }

    assert!(!heartbeat.is_running());
    assert!(matches!(client.state(), LeaseState::Lost { .. }));
}
