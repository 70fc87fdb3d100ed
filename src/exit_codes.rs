//! Exit code constants for the pipelease CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Store or transport failure
//! - 4: Lease held by another session
//! - 5: Lease lost (not owner / not found)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// Store or transport failure: the lease or catalogue store could not be used.
pub const STORE_FAILURE: i32 = 2;

/// Lock held: another session owns the lease.
pub const LOCK_HELD: i32 = 4;

/// Lease lost: renew or release found no lease owned by this session.
pub const LEASE_LOST: i32 = 5;
