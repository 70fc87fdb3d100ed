//! RAII editing session.

use super::heartbeat::Heartbeat;
use super::lease_client::LeaseClient;
use super::state::{LeaseState, UnloadRelease};
use crate::config::Config;
use crate::error::{LeaseError, Result};
use crate::lease::{LeaseRecord, ReleaseOutcome};
use std::sync::Arc;
use std::time::Duration;

/// Timing for an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSettings {
    pub heartbeat_interval: Duration,
    pub unload_timeout: Duration,
}

impl EditSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            unload_timeout: config.unload_release_timeout(),
        }
    }
}

/// Why an editing session ended normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Saved,
    Cancelled,
}

/// An open edit on one pipeline.
///
/// Opening acquires the lease and starts the heartbeat. The lease is released
/// by `close` (save or cancel), by `terminate` (unload), or when the session
/// is dropped (teardown). If every path fails the lease expires after its TTL.
#[derive(Debug)]
pub struct EditSession {
    client: Arc<LeaseClient>,
    heartbeat: Option<Heartbeat>,
    resource_id: String,
    unload_timeout: Duration,
    closed: bool,
}

impl EditSession {
    /// Acquire the lease and start renewing it.
    ///
    /// Fails with `LockHeld` when another session is editing; the client is
    /// then `Denied` and no heartbeat runs.
    pub fn open(client: Arc<LeaseClient>, resource_id: &str, settings: EditSettings) -> Result<Self> {
        client.acquire(resource_id)?;
        let heartbeat = Heartbeat::spawn(client.clone(), settings.heartbeat_interval);

        Ok(Self {
            client,
            heartbeat: Some(heartbeat),
            resource_id: resource_id.to_string(),
            unload_timeout: settings.unload_timeout,
            closed: false,
        })
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn state(&self) -> LeaseState {
        self.client.state()
    }

    pub fn is_exclusive(&self) -> bool {
        self.client.state().is_held()
    }

    /// The current grant, or an error if exclusivity has been lost.
    ///
    /// Call before committing a save.
    pub fn ensure_exclusive(&self) -> Result<LeaseRecord> {
        match self.client.state() {
            LeaseState::Held(record) => Ok(record),
            LeaseState::Lost { reason, .. } => Err(LeaseError::UserError(format!(
                "no longer editing '{}': {}",
                self.resource_id, reason
            ))),
            _ => Err(LeaseError::NotFound(self.resource_id.clone())),
        }
    }

    /// End the session after a save or cancel.
    ///
    /// The heartbeat is stopped before the release is sent.
    pub fn close(mut self, reason: CloseReason) -> Result<ReleaseOutcome> {
        self.closed = true;
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        log::debug!("closing edit of '{}' ({:?})", self.resource_id, reason);
        self.client.release()
    }

    /// End the session because the process is going away.
    pub fn terminate(mut self) -> UnloadRelease {
        self.closed = true;
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.cancel();
        }
        self.client.release_on_unload(self.unload_timeout)
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.stop();
        }
        if let Err(e) = self.client.release() {
            log::warn!(
                "failed to release '{}' on teardown (lease will expire): {}",
                self.resource_id,
                e
            );
        }
    }
}
