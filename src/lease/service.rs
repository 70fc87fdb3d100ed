//! Acquire, renew, release and expiry over a `LeaseStore`.

use super::record::{LeaseRecord, validate_resource_id};
use super::store::{LeaseStore, Mutation};
use crate::clock::Clock;
use crate::error::{LeaseError, Result};
use crate::events::{Event, EventAction, EventLog};
use crate::session::SessionOwnerId;
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;

/// Result of a release call. Every variant is a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The caller's active lease was deleted.
    Released,
    /// No active lease existed.
    NotHeld,
    /// Another session holds the lease; it was left untouched.
    HeldByOther(SessionOwnerId),
}

/// The lease protocol: compare-and-set acquire, owner-checked renew,
/// idempotent release, passive expiry.
///
/// All decisions use the service's clock; no call blocks on another session.
#[derive(Clone)]
pub struct LeaseService {
    store: Arc<dyn LeaseStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    events: Option<Arc<EventLog>>,
}

impl LeaseService {
    pub fn new(store: Arc<dyn LeaseStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl,
            events: None,
        }
    }

    /// Record grants, releases, takeovers and sweeps to an audit log.
    pub fn with_event_log(mut self, events: Arc<EventLog>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Grant the lease on `resource_id` to `owner`.
    ///
    /// Succeeds when no active lease exists or when `owner` already holds it
    /// (the record is refreshed). Fails with `LockHeld` when another session
    /// holds an active lease.
    pub fn acquire(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord> {
        validate_resource_id(resource_id)?;
        let now = self.clock.now();
        let mut outcome = None;

        self.store.update(resource_id, &mut |current| {
            match current.filter(|r| r.is_active(now)) {
                Some(held) if !held.is_held_by(owner) => {
                    outcome = Some(Err(LeaseError::LockHeld {
                        resource: resource_id.to_string(),
                        owner: held.owner_id.to_string(),
                        expires_at: held.expires_at,
                    }));
                    Mutation::Keep
                }
                _ => {
                    let record = LeaseRecord::granted(resource_id, owner, now, self.ttl);
                    outcome = Some(Ok(record.clone()));
                    Mutation::Put(record)
                }
            }
        })?;

        let record = outcome.unwrap_or_else(|| Err(undecided(resource_id)))?;
        log::debug!("lease granted: {}", record);
        self.record(
            Event::new(EventAction::Acquire, owner.as_str())
                .with_resource(resource_id)
                .with_details(json!({ "expires_at": record.expires_at })),
        );
        Ok(record)
    }

    /// Extend the caller's active lease by one TTL from now.
    ///
    /// Fails with `NotOwner` if another session holds it, or `NotFound` if no
    /// active lease exists (never acquired, released, or expired).
    pub fn renew(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord> {
        validate_resource_id(resource_id)?;
        let now = self.clock.now();
        let mut outcome = None;

        self.store.update(resource_id, &mut |current| match current {
            Some(held) if held.is_active(now) && held.is_held_by(owner) => {
                let mut renewed = held.clone();
                renewed.expires_at = now + self.ttl;
                outcome = Some(Ok(renewed.clone()));
                Mutation::Put(renewed)
            }
            Some(held) if held.is_active(now) => {
                outcome = Some(Err(LeaseError::NotOwner {
                    resource: resource_id.to_string(),
                    owner: held.owner_id.to_string(),
                }));
                Mutation::Keep
            }
            Some(_) => {
                outcome = Some(Err(LeaseError::NotFound(resource_id.to_string())));
                Mutation::Delete
            }
            None => {
                outcome = Some(Err(LeaseError::NotFound(resource_id.to_string())));
                Mutation::Keep
            }
        })?;

        let record = outcome.unwrap_or_else(|| Err(undecided(resource_id)))?;
        log::debug!("lease renewed: {}", record);
        Ok(record)
    }

    /// Release the caller's lease. Never an error for absent or foreign leases.
    pub fn release(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<ReleaseOutcome> {
        validate_resource_id(resource_id)?;
        let now = self.clock.now();
        let mut outcome = ReleaseOutcome::NotHeld;

        self.store.update(resource_id, &mut |current| match current {
            Some(held) if held.is_active(now) && held.is_held_by(owner) => {
                outcome = ReleaseOutcome::Released;
                Mutation::Delete
            }
            Some(held) if held.is_active(now) => {
                outcome = ReleaseOutcome::HeldByOther(held.owner_id.clone());
                Mutation::Keep
            }
            Some(_) => {
                outcome = ReleaseOutcome::NotHeld;
                Mutation::Delete
            }
            None => {
                outcome = ReleaseOutcome::NotHeld;
                Mutation::Keep
            }
        })?;

        match &outcome {
            ReleaseOutcome::Released => {
                log::debug!("lease on '{}' released by {}", resource_id, owner);
                self.record(Event::new(EventAction::Release, owner.as_str()).with_resource(resource_id));
            }
            ReleaseOutcome::HeldByOther(holder) => log::debug!(
                "release of '{}' by {} ignored: held by {}",
                resource_id,
                owner,
                holder
            ),
            ReleaseOutcome::NotHeld => {}
        }

        Ok(outcome)
    }

    /// Take the lease regardless of who holds it.
    ///
    /// Returns the new record and the active record it displaced, if any.
    pub fn force_acquire(
        &self,
        resource_id: &str,
        owner: &SessionOwnerId,
    ) -> Result<(LeaseRecord, Option<LeaseRecord>)> {
        validate_resource_id(resource_id)?;
        let now = self.clock.now();
        let record = LeaseRecord::granted(resource_id, owner, now, self.ttl);
        let mut displaced = None;

        self.store.update(resource_id, &mut |current| {
            displaced = current.filter(|r| r.is_active(now)).cloned();
            Mutation::Put(record.clone())
        })?;

        log::info!(
            "lease on '{}' force-acquired by {} (previous owner: {})",
            resource_id,
            owner,
            displaced
                .as_ref()
                .map(|r| r.owner_id.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        self.record(
            Event::new(EventAction::ForceAcquire, owner.as_str())
                .with_resource(resource_id)
                .with_details(json!({
                    "previous_owner": displaced.as_ref().map(|r| r.owner_id.as_str()),
                    "expires_at": record.expires_at,
                })),
        );

        Ok((record, displaced))
    }

    /// The active lease on `resource_id`, if any.
    pub fn status_of(&self, resource_id: &str) -> Result<Option<LeaseRecord>> {
        validate_resource_id(resource_id)?;
        let now = self.clock.now();
        Ok(self.store.get(resource_id)?.filter(|r| r.is_active(now)))
    }

    /// Every active lease, sorted by resource name.
    pub fn active_leases(&self) -> Result<Vec<LeaseRecord>> {
        let now = self.clock.now();
        let mut leases: Vec<_> = self
            .store
            .list()?
            .into_iter()
            .filter(|r| r.is_active(now))
            .collect();
        leases.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Ok(leases)
    }

    /// Delete expired records. Returns the number removed.
    ///
    /// Each deletion re-checks expiry inside the store's atomic update, so a
    /// lease renewed or re-acquired since the listing is never removed.
    pub fn sweep_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let mut expired = Vec::new();

        for record in self.store.list()? {
            if record.is_active(now) {
                continue;
            }
            let mut removed = false;
            self.store.update(&record.resource_id, &mut |current| match current {
                Some(r) if !r.is_active(now) => {
                    removed = true;
                    Mutation::Delete
                }
                _ => Mutation::Keep,
            })?;
            if removed {
                log::info!("expired lease removed for pipeline: {}", record.resource_id);
                expired.push(record);
            }
        }

        for record in &expired {
            self.record(
                Event::new(EventAction::Expire, record.owner_id.as_str())
                    .with_resource(&record.resource_id)
                    .with_details(json!({ "expired_at": record.expires_at })),
            );
        }

        Ok(expired.len())
    }

    fn record(&self, event: Event) {
        if let Some(events) = &self.events {
            events.record(event.at(self.clock.now()));
        }
    }
}

impl std::fmt::Debug for LeaseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseService")
            .field("ttl", &self.ttl)
            .field("events", &self.events.as_ref().map(|e| e.path().to_path_buf()))
            .finish_non_exhaustive()
    }
}

fn undecided(resource_id: &str) -> LeaseError {
    LeaseError::Store(format!(
        "lease store returned without evaluating the update for '{}'",
        resource_id
    ))
}
