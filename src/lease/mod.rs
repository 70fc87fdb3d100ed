//! Edit-lease subsystem.
//!
//! A lease is a time-bounded exclusive claim on a pipeline name, held by one
//! session and kept alive by heartbeat renewals.
//!
//! # Stores
//!
//! The `LeaseStore` trait is the single source of truth for ownership. It
//! exposes one atomic read-decide-write primitive per key; everything else
//! (acquire, renew, release, expiry) is decided by `LeaseService` inside that
//! primitive, so two concurrent acquires for the same key can never both win.
//!
//! - `MemoryLeaseStore`: a mutex-guarded map, for a single server process.
//! - `FileLeaseStore`: one JSON file per lease in a shared directory. Each
//!   key is serialized by an exclusive OS lock on its guard file, so separate
//!   processes can share the directory.
//!
//! # Expiry
//!
//! Expiry is passive: a record whose `expires_at` has passed is treated as
//! absent by every read path. `Sweeper` deletes expired records in the
//! background for storage hygiene only.

mod file_store;
mod record;
mod service;
mod store;
mod sweeper;


pub use file_store::FileLeaseStore;
pub use record::{LeaseRecord, validate_resource_id};
pub use service::{LeaseService, ReleaseOutcome};
pub use store::{LeaseStore, MemoryLeaseStore, Mutation};
pub use sweeper::Sweeper;
