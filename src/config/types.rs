//! Default values for configuration fields.

/// Default lease time-to-live in seconds.
pub const DEFAULT_LEASE_TTL_SECS: u64 = 30;

/// Default heartbeat interval in seconds (TTL is three heartbeats).
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 10;

/// Default interval for the fast lock-status poll.
pub const DEFAULT_LOCK_POLL_INTERVAL_SECS: u64 = 3;

/// Default interval for the slow catalogue-summary poll.
pub const DEFAULT_SUMMARY_POLL_INTERVAL_SECS: u64 = 30;

/// Default interval between expired-lease sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Minimum ratio of TTL to heartbeat interval.
pub const MIN_TTL_HEARTBEATS: u64 = 2;

pub fn default_lease_ttl_secs() -> u64 {
    DEFAULT_LEASE_TTL_SECS
}

pub fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}

pub fn default_lock_poll_interval_secs() -> u64 {
    DEFAULT_LOCK_POLL_INTERVAL_SECS
}

pub fn default_summary_poll_interval_secs() -> u64 {
    DEFAULT_SUMMARY_POLL_INTERVAL_SECS
}

pub fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

pub fn default_unload_release_timeout_ms() -> u64 {
    500
}

pub fn default_store_guard_retries() -> u32 {
    50
}

pub fn default_store_guard_backoff_ms() -> u64 {
    2
}
