//! Client side of the lease protocol.
//!
//! A `LeaseClient` drives one editing attempt through an explicit state
//! machine:
//!
//! ```text
//! Idle -> Acquiring -> Held -> Idle        (save, cancel, teardown, unload)
//!                   \-> Denied             (LockHeld; no retry loop)
//!                       Held -> Lost       (renew answered NotOwner/NotFound)
//! ```
//!
//! `Heartbeat` renews a held lease on a fixed interval from a background
//! thread. `EditSession` ties the two together as an RAII guard and provides
//! the three exit paths: normal close, teardown on drop, and the unload path
//! that falls back to fire-and-forget delivery.
//!
//! Once release has been invoked the client never issues another renew, so a
//! late heartbeat cannot re-establish a lease the user already gave up.

mod edit;
mod heartbeat;
mod lease_client;
mod state;

#[cfg(test)]
mod tests;

pub use edit::{CloseReason, EditSession, EditSettings};
pub use heartbeat::Heartbeat;
pub use lease_client::LeaseClient;
pub use state::{LeaseState, UnloadRelease};
