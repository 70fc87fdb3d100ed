//! Lock-status queries for polling clients.

use crate::error::Result;
use crate::lease::{LeaseRecord, LeaseService};

/// Read-only view of active leases, cheap enough to poll every few seconds.
///
/// Returns lease records only, never pipeline bodies. Expired records are
/// excluded.
#[derive(Debug, Clone)]
pub struct LockStatusService {
    leases: LeaseService,
}

impl LockStatusService {
    pub fn new(leases: LeaseService) -> Self {
        Self { leases }
    }

    /// Every active lease, sorted by pipeline name.
    pub fn lock_statuses(&self) -> Result<Vec<LeaseRecord>> {
        self.leases.active_leases()
    }

    /// The active lease on one pipeline, if any.
    pub fn status_of(&self, resource_id: &str) -> Result<Option<LeaseRecord>> {
        self.leases.status_of(resource_id)
    }
}
