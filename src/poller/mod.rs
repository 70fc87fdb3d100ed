//! Client-side reconciliation of the cached catalogue view.
//!
//! Two independent pollers keep a client's view current without refetching
//! pipeline bodies on every tick:
//!
//! - the lock poll (every few seconds) merges active lease records into the
//!   annotations of resources already in the cache;
//! - the summary poll (less often) compares the server's catalogue
//!   fingerprint with the cached names and triggers a single full refetch on
//!   mismatch.
//!
//! The view's `revision` only moves when something the user can see changed,
//! so a renderer can skip redraws on identical polls.

mod reconcile;
mod view;


pub use reconcile::{PollerHandle, ReconciliationPoller};
pub use view::ClientViewState;
