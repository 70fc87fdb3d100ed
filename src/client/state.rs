//! Lease client states.

use crate::lease::LeaseRecord;
use chrono::{DateTime, Utc};

/// Where an editing attempt stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseState {
    /// No lease requested, or the lease was released. Initial and terminal.
    Idle,
    /// Acquire request in flight.
    Acquiring { resource_id: String },
    /// The session holds the lease; `record` is the latest confirmed grant.
    Held(LeaseRecord),
    /// Another session held the lease. Terminal for this attempt.
    Denied {
        resource_id: String,
        owner: String,
        expires_at: DateTime<Utc>,
    },
    /// The lease was lost while editing. Terminal for this attempt.
    Lost { resource_id: String, reason: String },
}

impl LeaseState {
    pub fn is_held(&self) -> bool {
        matches!(self, LeaseState::Held(_))
    }

    /// Denied and Lost end the attempt; the user must start over.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, LeaseState::Denied { .. } | LeaseState::Lost { .. })
    }

    pub fn resource_id(&self) -> Option<&str> {
        match self {
            LeaseState::Idle => None,
            LeaseState::Acquiring { resource_id }
            | LeaseState::Denied { resource_id, .. }
            | LeaseState::Lost { resource_id, .. } => Some(resource_id),
            LeaseState::Held(record) => Some(&record.resource_id),
        }
    }
}

impl std::fmt::Display for LeaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeaseState::Idle => write!(f, "idle"),
            LeaseState::Acquiring { resource_id } => write!(f, "acquiring '{}'", resource_id),
            LeaseState::Held(record) => write!(
                f,
                "holding '{}' until {}",
                record.resource_id,
                record.expires_at.to_rfc3339()
            ),
            LeaseState::Denied {
                resource_id,
                owner,
                expires_at,
            } => write!(
                f,
                "denied '{}': being edited by {} until {}",
                resource_id,
                owner,
                expires_at.to_rfc3339()
            ),
            LeaseState::Lost {
                resource_id,
                reason,
            } => write!(f, "lost '{}': {}", resource_id, reason),
        }
    }
}

/// How the unload path ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnloadRelease {
    /// Nothing was held, so nothing was sent.
    NothingHeld,
    /// The release was confirmed within the unload timeout.
    Confirmed(crate::lease::ReleaseOutcome),
    /// No confirmation arrived; a fire-and-forget release was dispatched and
    /// the lease otherwise expires by TTL.
    BestEffort,
}
