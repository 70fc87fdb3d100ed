//! Lease store trait and in-memory implementation.

use super::record::LeaseRecord;
use crate::error::{LeaseError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// What to do with a key after inspecting its current record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Leave the stored record untouched.
    Keep,
    /// Store this record under the key, replacing any existing one.
    Put(LeaseRecord),
    /// Remove the key.
    Delete,
}

/// Keyed table of lease records.
///
/// `update` is the only write path and must be atomic per key: the current
/// record is read, `decide` runs, and the mutation is applied with no other
/// `update` of the same key interleaving. Stores return raw records; expiry is
/// interpreted by the caller.
pub trait LeaseStore: Send + Sync {
    /// Atomically inspect and mutate the record for `resource_id`.
    fn update(
        &self,
        resource_id: &str,
        decide: &mut dyn FnMut(Option<&LeaseRecord>) -> Mutation,
    ) -> Result<()>;

    /// Current record for `resource_id`, expired or not.
    fn get(&self, resource_id: &str) -> Result<Option<LeaseRecord>>;

    /// Every stored record, expired or not.
    fn list(&self) -> Result<Vec<LeaseRecord>>;
}

/// A mutex-guarded map of lease records.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    records: Mutex<HashMap<String, LeaseRecord>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, LeaseRecord>>> {
        self.records
            .lock()
            .map_err(|_| LeaseError::Store("lease table mutex poisoned".to_string()))
    }
}

impl LeaseStore for MemoryLeaseStore {
    fn update(
        &self,
        resource_id: &str,
        decide: &mut dyn FnMut(Option<&LeaseRecord>) -> Mutation,
    ) -> Result<()> {
        let mut records = self.records()?;
        match decide(records.get(resource_id)) {
            Mutation::Keep => {}
            Mutation::Put(record) => {
                records.insert(resource_id.to_string(), record);
            }
            Mutation::Delete => {
                records.remove(resource_id);
            }
        }
        Ok(())
    }

    fn get(&self, resource_id: &str) -> Result<Option<LeaseRecord>> {
        Ok(self.records()?.get(resource_id).cloned())
    }

    fn list(&self) -> Result<Vec<LeaseRecord>> {
        Ok(self.records()?.values().cloned().collect())
    }
}
