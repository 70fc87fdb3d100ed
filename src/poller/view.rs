//! Cached catalogue view held by a client.

use crate::api::CatalogSnapshot;
use crate::catalog::Pipeline;
use crate::lease::LeaseRecord;
use std::collections::{BTreeMap, BTreeSet};

/// A client's local copy of the catalogue plus lease annotations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientViewState {
    resources: BTreeMap<String, Pipeline>,
    lease_annotations: BTreeMap<String, LeaseRecord>,
    revision: u64,
    refetches: u64,
}

impl ClientViewState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole view with a full fetch.
    pub fn replace(&mut self, snapshot: CatalogSnapshot) {
        self.resources = snapshot
            .pipelines
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        self.lease_annotations = annotations_for(&self.resources, snapshot.leases);
        self.revision += 1;
        self.refetches += 1;
    }

    /// Merge a lock poll into the annotations.
    ///
    /// Records for resources not in the cache are ignored; the summary poll
    /// brings those in. Returns whether anything changed.
    pub fn merge_annotations(&mut self, leases: Vec<LeaseRecord>) -> bool {
        let annotations = annotations_for(&self.resources, leases);
        if annotations == self.lease_annotations {
            return false;
        }
        self.lease_annotations = annotations;
        self.revision += 1;
        true
    }

    /// Names of every cached resource.
    pub fn resource_ids(&self) -> BTreeSet<String> {
        self.resources.keys().cloned().collect()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Pipeline> {
        self.resources.values()
    }

    pub fn resource(&self, name: &str) -> Option<&Pipeline> {
        self.resources.get(name)
    }

    /// The lease currently shown on `name`, if any.
    pub fn annotation(&self, name: &str) -> Option<&LeaseRecord> {
        self.lease_annotations.get(name)
    }

    /// Bumped on every visible change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of full fetches applied so far.
    pub fn refetches(&self) -> u64 {
        self.refetches
    }
}

fn annotations_for(
    resources: &BTreeMap<String, Pipeline>,
    leases: Vec<LeaseRecord>,
) -> BTreeMap<String, LeaseRecord> {
    leases
        .into_iter()
        .filter(|r| resources.contains_key(&r.resource_id))
        .map(|r| (r.resource_id.clone(), r))
        .collect()
}
