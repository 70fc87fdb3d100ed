//! Client-facing seams over the lease and catalogue services.
//!
//! Clients (`LeaseClient`, `ReconciliationPoller`) only see the `LeaseApi` and
//! `CatalogApi` traits, so the same client code runs against an in-process
//! `ControlPlane` or any remote transport implementing the traits.

use crate::catalog::{Catalog, CatalogSummary, CatalogSummaryService, Pipeline};
use crate::error::Result;
use crate::lease::{LeaseRecord, LeaseService, ReleaseOutcome};
use crate::session::SessionOwnerId;
use crate::status::LockStatusService;
use std::sync::Arc;
use std::thread;

/// Lease operations a client may invoke.
pub trait LeaseApi: Send + Sync {
    fn acquire(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord>;

    fn renew(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord>;

    fn release(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<ReleaseOutcome>;

    /// Fire a release without waiting for, or requiring, a response.
    ///
    /// Must return immediately and must not fail; losing the message is
    /// acceptable because the lease expires on its own.
    fn release_best_effort(&self, resource_id: &str, owner: &SessionOwnerId);
}

/// Lightweight reads used to keep a client's view fresh.
pub trait CatalogApi: Send + Sync {
    /// Active lease records only.
    fn lock_statuses(&self) -> Result<Vec<LeaseRecord>>;

    /// Count and names of every pipeline.
    fn catalog_summary(&self) -> Result<CatalogSummary>;

    /// Full pipeline bodies together with their current leases.
    fn fetch_catalog(&self) -> Result<CatalogSnapshot>;
}

/// A full catalogue fetch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogSnapshot {
    pub pipelines: Vec<Pipeline>,
    pub leases: Vec<LeaseRecord>,
}

/// In-process server: the lease protocol plus catalogue queries over shared stores.
#[derive(Clone)]
pub struct ControlPlane {
    leases: LeaseService,
    lock_status: LockStatusService,
    summary: CatalogSummaryService,
    catalog: Arc<dyn Catalog>,
}

impl ControlPlane {
    pub fn new(leases: LeaseService, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            lock_status: LockStatusService::new(leases.clone()),
            summary: CatalogSummaryService::new(catalog.clone()),
            leases,
            catalog,
        }
    }

    pub fn leases(&self) -> &LeaseService {
        &self.leases
    }

    pub fn lock_status(&self) -> &LockStatusService {
        &self.lock_status
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }
}

impl LeaseApi for ControlPlane {
    fn acquire(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord> {
        self.leases.acquire(resource_id, owner)
    }

    fn renew(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<LeaseRecord> {
        self.leases.renew(resource_id, owner)
    }

    fn release(&self, resource_id: &str, owner: &SessionOwnerId) -> Result<ReleaseOutcome> {
        self.leases.release(resource_id, owner)
    }

    fn release_best_effort(&self, resource_id: &str, owner: &SessionOwnerId) {
        let leases = self.leases.clone();
        let resource_id = resource_id.to_string();
        let owner = owner.clone();

        // Detached: nobody joins this thread or reads its result.
        let spawned = thread::Builder::new()
            .name("lease-release".to_string())
            .spawn(move || {
                if let Err(e) = leases.release(&resource_id, &owner) {
                    log::warn!("best-effort release of '{}' failed: {}", resource_id, e);
                }
            });
        if let Err(e) = spawned {
            log::warn!("could not dispatch best-effort release: {}", e);
        }
    }
}

impl CatalogApi for ControlPlane {
    fn lock_statuses(&self) -> Result<Vec<LeaseRecord>> {
        self.lock_status.lock_statuses()
    }

    fn catalog_summary(&self) -> Result<CatalogSummary> {
        self.summary.summary()
    }

    fn fetch_catalog(&self) -> Result<CatalogSnapshot> {
        Ok(CatalogSnapshot {
            pipelines: self.catalog.list()?,
            leases: self.lock_status.lock_statuses()?,
        })
    }
}
