//! Lease client state machine.

use super::state::{LeaseState, UnloadRelease};
use crate::api::LeaseApi;
use crate::clock::Clock;
use crate::error::{LeaseError, Result};
use crate::lease::{LeaseRecord, ReleaseOutcome};
use crate::session::SessionOwnerId;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

/// Drives one session's acquire, renew and release calls.
///
/// Network calls are made outside the state mutex; every transition after a
/// call first checks that the state has not moved on in the meantime.
pub struct LeaseClient {
    api: Arc<dyn LeaseApi>,
    clock: Arc<dyn Clock>,
    owner: SessionOwnerId,
    state: Mutex<LeaseState>,
}

impl LeaseClient {
    pub fn new(api: Arc<dyn LeaseApi>, clock: Arc<dyn Clock>, owner: SessionOwnerId) -> Self {
        Self {
            api,
            clock,
            owner,
            state: Mutex::new(LeaseState::Idle),
        }
    }

    pub fn owner(&self) -> &SessionOwnerId {
        &self.owner
    }

    pub fn state(&self) -> LeaseState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, LeaseState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Request the lease on `resource_id`. Only valid from `Idle`.
    ///
    /// `LockHeld` moves the client to `Denied` and is returned to the caller
    /// so edit mode can be refused with the holder's name. Transport failures
    /// return the client to `Idle`.
    pub fn acquire(&self, resource_id: &str) -> Result<LeaseRecord> {
        {
            let mut state = self.lock_state();
            if *state != LeaseState::Idle {
                return Err(LeaseError::UserError(format!(
                    "cannot acquire '{}' while {}",
                    resource_id, *state
                )));
            }
            *state = LeaseState::Acquiring {
                resource_id: resource_id.to_string(),
            };
        }

        let result = self.api.acquire(resource_id, &self.owner);

        let mut state = self.lock_state();
        let still_acquiring = matches!(
            &*state,
            LeaseState::Acquiring { resource_id: r } if r == resource_id
        );
        if !still_acquiring {
            // Released while the request was in flight: hand back anything granted.
            if result.is_ok() {
                self.api.release_best_effort(resource_id, &self.owner);
            }
            return Err(LeaseError::UserError(format!(
                "acquire of '{}' abandoned",
                resource_id
            )));
        }

        match result {
            Ok(record) => {
                log::info!("editing '{}' (lease until {})", resource_id, record.expires_at);
                *state = LeaseState::Held(record.clone());
                Ok(record)
            }
            Err(LeaseError::LockHeld {
                resource,
                owner,
                expires_at,
            }) => {
                *state = LeaseState::Denied {
                    resource_id: resource.clone(),
                    owner: owner.clone(),
                    expires_at,
                };
                Err(LeaseError::LockHeld {
                    resource,
                    owner,
                    expires_at,
                })
            }
            Err(e) => {
                *state = LeaseState::Idle;
                Err(e)
            }
        }
    }

    /// One heartbeat: renew the held lease and apply the outcome.
    ///
    /// Does nothing unless the client is `Held`. A `NotOwner`/`NotFound`
    /// answer moves the client to `Lost`. Transport failures are tolerated
    /// while the last confirmed grant is still active; past its expiry the
    /// client can no longer assume exclusivity and moves to `Lost`.
    pub fn heartbeat(&self) -> LeaseState {
        let resource_id = match &*self.lock_state() {
            LeaseState::Held(record) => record.resource_id.clone(),
            other => return other.clone(),
        };

        let result = self.api.renew(&resource_id, &self.owner);

        let mut state = self.lock_state();
        let now = self.clock.now();
        let grant_still_active = match &*state {
            LeaseState::Held(current) if current.resource_id == resource_id => {
                current.is_active(now)
            }
            // Released or otherwise moved on while the renew was in flight.
            other => return other.clone(),
        };

        match result {
            Ok(record) => {
                log::debug!("lease renewed: {}", record);
                *state = LeaseState::Held(record);
            }
            Err(e) if e.is_lease_loss() => {
                log::warn!("lost lease on '{}': {}", resource_id, e);
                *state = LeaseState::Lost {
                    resource_id,
                    reason: e.to_string(),
                };
            }
            Err(e) if grant_still_active => {
                log::warn!(
                    "renew of '{}' failed, retrying on next heartbeat: {}",
                    resource_id,
                    e
                );
            }
            Err(e) => {
                log::warn!("lease on '{}' expired without a confirmed renewal", resource_id);
                *state = LeaseState::Lost {
                    resource_id,
                    reason: format!("lease expired without a confirmed renewal ({})", e),
                };
            }
        }

        state.clone()
    }

    /// Normal release (save, cancel, teardown).
    ///
    /// The client is `Idle` before the call goes out, so no renew is issued
    /// afterwards even if the call fails.
    pub fn release(&self) -> Result<ReleaseOutcome> {
        let previous = std::mem::replace(&mut *self.lock_state(), LeaseState::Idle);

        match previous {
            LeaseState::Held(record) => {
                let outcome = self.api.release(&record.resource_id, &self.owner)?;
                log::info!("released '{}' ({:?})", record.resource_id, outcome);
                Ok(outcome)
            }
            _ => Ok(ReleaseOutcome::NotHeld),
        }
    }

    /// Release on process termination.
    ///
    /// Tries a confirmed release for at most `timeout`; if it fails or does
    /// not answer in time, dispatches a fire-and-forget release instead.
    /// Never blocks longer than `timeout` and never fails.
    pub fn release_on_unload(&self, timeout: Duration) -> UnloadRelease {
        let previous = std::mem::replace(&mut *self.lock_state(), LeaseState::Idle);
        let LeaseState::Held(record) = previous else {
            return UnloadRelease::NothingHeld;
        };

        let (tx, rx) = mpsc::channel();
        let api = self.api.clone();
        let owner = self.owner.clone();
        let resource_id = record.resource_id.clone();
        let spawned = thread::Builder::new()
            .name("lease-unload".to_string())
            .spawn(move || {
                let _ = tx.send(api.release(&resource_id, &owner));
            });

        match spawned {
            Ok(_) => match rx.recv_timeout(timeout) {
                Ok(Ok(outcome)) => return UnloadRelease::Confirmed(outcome),
                Ok(Err(e)) => log::warn!("unload release of '{}' failed: {}", record.resource_id, e),
                Err(_) => log::warn!(
                    "unload release of '{}' not confirmed within {:?}",
                    record.resource_id,
                    timeout
                ),
            },
            Err(e) => log::warn!("could not dispatch unload release: {}", e),
        }

        self.api.release_best_effort(&record.resource_id, &self.owner);
        UnloadRelease::BestEffort
    }
}

impl std::fmt::Debug for LeaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseClient")
            .field("owner", &self.owner)
            .field("state", &*self.lock_state())
            .finish_non_exhaustive()
    }
}
