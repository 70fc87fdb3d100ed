//! Catalogue store trait and in-memory implementation.

use super::pipeline::Pipeline;
use crate::clock::Clock;
use crate::error::{LeaseError, Result};
use crate::lease::validate_resource_id;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

/// Keyed store of pipelines.
pub trait Catalog: Send + Sync {
    /// Every pipeline, most recently updated first.
    fn list(&self) -> Result<Vec<Pipeline>>;

    /// Names of every pipeline, without loading bodies.
    fn names(&self) -> Result<BTreeSet<String>>;

    fn get(&self, name: &str) -> Result<Option<Pipeline>>;

    /// Insert or replace a pipeline. `created_at` of an existing pipeline is
    /// preserved and `last_updated` is set to now.
    fn put(&self, pipeline: Pipeline) -> Result<Pipeline>;

    /// Remove a pipeline. Returns whether it existed.
    fn remove(&self, name: &str) -> Result<bool>;
}

/// Sort most recently updated first, name as tie-breaker.
pub(super) fn sort_by_recency(pipelines: &mut [Pipeline]) {
    pipelines.sort_by(|a, b| {
        b.last_updated
            .cmp(&a.last_updated)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// A mutex-guarded map of pipelines.
pub struct MemoryCatalog {
    pipelines: Mutex<BTreeMap<String, Pipeline>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCatalog {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            pipelines: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    fn pipelines(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Pipeline>>> {
        self.pipelines
            .lock()
            .map_err(|_| LeaseError::Store("catalogue mutex poisoned".to_string()))
    }
}

impl Catalog for MemoryCatalog {
    fn list(&self) -> Result<Vec<Pipeline>> {
        let mut pipelines: Vec<_> = self.pipelines()?.values().cloned().collect();
        sort_by_recency(&mut pipelines);
        Ok(pipelines)
    }

    fn names(&self) -> Result<BTreeSet<String>> {
        Ok(self.pipelines()?.keys().cloned().collect())
    }

    fn get(&self, name: &str) -> Result<Option<Pipeline>> {
        Ok(self.pipelines()?.get(name).cloned())
    }

    fn put(&self, mut pipeline: Pipeline) -> Result<Pipeline> {
        validate_resource_id(&pipeline.name)?;
        let now = self.clock.now();
        let mut pipelines = self.pipelines()?;

        if let Some(existing) = pipelines.get(&pipeline.name) {
            pipeline.created_at = existing.created_at;
        }
        pipeline.last_updated = now;
        pipelines.insert(pipeline.name.clone(), pipeline.clone());
        Ok(pipeline)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        Ok(self.pipelines()?.remove(name).is_some())
    }
}
