//! Catalogue fingerprint.

use super::store::Catalog;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Count and names of every pipeline the server knows about.
///
/// Derived on demand and never persisted; only used to detect that a
/// client's cached catalogue has drifted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSummary {
    pub count: usize,
    pub identifiers: BTreeSet<String>,
}

impl CatalogSummary {
    pub fn from_identifiers(identifiers: BTreeSet<String>) -> Self {
        Self {
            count: identifiers.len(),
            identifiers,
        }
    }

    /// Whether a client holding `local` names is in sync with this summary.
    pub fn matches(&self, local: &BTreeSet<String>) -> bool {
        self.count == local.len() && self.identifiers == *local
    }
}

/// Computes `CatalogSummary` straight from the authoritative catalogue.
#[derive(Clone)]
pub struct CatalogSummaryService {
    catalog: Arc<dyn Catalog>,
}

impl CatalogSummaryService {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    pub fn summary(&self) -> Result<CatalogSummary> {
        Ok(CatalogSummary::from_identifiers(self.catalog.names()?))
    }
}
