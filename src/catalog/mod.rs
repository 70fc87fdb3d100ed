//! Pipeline catalogue and its change-detection fingerprint.
//!
//! The catalogue is the authoritative set of pipelines every client browses.
//! Provisioning and form rendering live outside this crate; here the catalogue
//! is a keyed store of `Pipeline` records plus `CatalogSummaryService`, which
//! answers "how many pipelines, and which names" without shipping bodies.

mod file_catalog;
mod pipeline;
mod store;
mod summary;


pub use file_catalog::FileCatalog;
pub use pipeline::Pipeline;
pub use store::{Catalog, MemoryCatalog};
pub use summary::{CatalogSummary, CatalogSummaryService};
