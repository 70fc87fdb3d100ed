//! Lease record definition.

use crate::session::SessionOwnerId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An exclusive, time-bounded claim on a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseRecord {
    /// Name of the locked pipeline.
    pub resource_id: String,

    /// Session holding the lease.
    pub owner_id: SessionOwnerId,

    /// When the lease was granted.
    pub acquired_at: DateTime<Utc>,

    /// Instant from which the lease is void even if never released.
    pub expires_at: DateTime<Utc>,
}

impl LeaseRecord {
    /// A fresh record granted at `now` for `ttl`.
    pub fn granted(
        resource_id: &str,
        owner_id: &SessionOwnerId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            resource_id: resource_id.to_string(),
            owner_id: owner_id.clone(),
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    /// Active iff `now < expires_at`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn is_held_by(&self, owner: &SessionOwnerId) -> bool {
        self.owner_id == *owner
    }

    /// Time left before expiry, clamped at zero.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// Format the remaining time as a human-readable string.
    pub fn remaining_string(&self, now: DateTime<Utc>) -> String {
        let remaining = self.remaining(now);
        let minutes = remaining.num_minutes();
        let seconds = remaining.num_seconds();

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds)
        }
    }
}

impl std::fmt::Display for LeaseRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, acquired: {}, expires: {})",
            self.resource_id,
            self.owner_id,
            self.acquired_at.to_rfc3339(),
            self.expires_at.to_rfc3339()
        )
    }
}

/// Check that a pipeline name is usable as a store key.
///
/// Names may contain ASCII letters, digits, `-`, `_`, `.` and `@`, must not
/// start with `.`, and are at most 100 characters long.
pub fn validate_resource_id(resource_id: &str) -> crate::error::Result<()> {
    let valid_chars = resource_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));

    if resource_id.is_empty()
        || resource_id.len() > 100
        || resource_id.starts_with('.')
        || !valid_chars
    {
        return Err(crate::error::LeaseError::UserError(format!(
            "invalid pipeline name '{}': use 1-100 characters from [A-Za-z0-9._@-], not starting with '.'",
            resource_id
        )));
    }

    Ok(())
}
