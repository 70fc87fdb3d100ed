//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for a pipelease store.
///
/// This struct represents the contents of `config.yaml` at the store root.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Lease settings
    // =========================================================================
    /// Seconds an unrenewed lease stays active.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,

    /// Seconds between heartbeat renewals issued by the lease holder.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Milliseconds the unload path waits for a confirmed release before
    /// falling back to fire-and-forget delivery.
    #[serde(default = "default_unload_release_timeout_ms")]
    pub unload_release_timeout_ms: u64,

    /// Seconds between storage hygiene sweeps of expired leases.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    // =========================================================================
    // Reconciliation settings
    // =========================================================================
    /// Seconds between lock-status polls (fast timer).
    #[serde(default = "default_lock_poll_interval_secs")]
    pub lock_poll_interval_secs: u64,

    /// Seconds between catalogue-summary polls (slow timer).
    #[serde(default = "default_summary_poll_interval_secs")]
    pub summary_poll_interval_secs: u64,

    // =========================================================================
    // File store settings
    // =========================================================================
    /// Attempts to take a per-key guard file before giving up.
    #[serde(default = "default_store_guard_retries")]
    pub store_guard_retries: u32,

    /// Milliseconds between guard attempts.
    #[serde(default = "default_store_guard_backoff_ms")]
    pub store_guard_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lease_ttl_secs: default_lease_ttl_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            unload_release_timeout_ms: default_unload_release_timeout_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            lock_poll_interval_secs: default_lock_poll_interval_secs(),
            summary_poll_interval_secs: default_summary_poll_interval_secs(),
            store_guard_retries: default_store_guard_retries(),
            store_guard_backoff_ms: default_store_guard_backoff_ms(),
        }
    }
}
