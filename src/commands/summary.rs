//! Implementation of the `pipelease summary` command.

use super::Store;
use crate::api::CatalogApi;
use crate::error::Result;

/// Print the catalogue fingerprint clients compare against.
pub fn cmd_summary(store: &Store) -> Result<()> {
    let summary = store.plane.catalog_summary()?;

    println!("Pipelines: {}", summary.count);
    for name in &summary.identifiers {
        println!("  {}", name);
    }
    Ok(())
}
