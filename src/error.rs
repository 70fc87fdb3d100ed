//! Error types for pipelease.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for lease and catalogue operations.
///
/// `LockHeld` is an expected outcome of `acquire`, not a fault: it carries the
/// current holder so callers can show who is editing the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LeaseError {
    /// Another session holds an active lease on the resource.
    #[error(
        "pipeline '{resource}' is currently being edited by {owner} (lease expires at {})",
        .expires_at.to_rfc3339()
    )]
    LockHeld {
        resource: String,
        owner: String,
        expires_at: DateTime<Utc>,
    },

    /// The active lease belongs to a different session.
    #[error("lease on '{resource}' is held by {owner}, not by this session")]
    NotOwner { resource: String, owner: String },

    /// No active lease exists (never acquired, released, or expired).
    #[error("no active lease on '{0}'")]
    NotFound(String),

    /// The backing store failed to read or write.
    #[error("store failure: {0}")]
    Store(String),

    /// A client could not reach the lease or catalogue service.
    #[error("transport failure: {0}")]
    Transport(String),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),
}

impl LeaseError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LeaseError::LockHeld { .. } => exit_codes::LOCK_HELD,
            LeaseError::NotOwner { .. } | LeaseError::NotFound(_) => exit_codes::LEASE_LOST,
            LeaseError::Store(_) | LeaseError::Transport(_) => exit_codes::STORE_FAILURE,
            LeaseError::UserError(_) => exit_codes::USER_ERROR,
        }
    }

    /// Whether this error means the caller no longer owns the lease.
    pub fn is_lease_loss(&self) -> bool {
        matches!(self, LeaseError::NotOwner { .. } | LeaseError::NotFound(_))
    }
}

/// Result type alias for pipelease operations.
pub type Result<T> = std::result::Result<T, LeaseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lock_held_has_correct_exit_code() {
        let err = LeaseError::LockHeld {
            resource: "svc-1".to_string(),
            owner: "alice".to_string(),
            expires_at: Utc::now(),
        };
        assert_eq!(err.exit_code(), exit_codes::LOCK_HELD);
    }

    #[test]
    fn lease_loss_errors_share_exit_code() {
        let not_owner = LeaseError::NotOwner {
            resource: "svc-1".to_string(),
            owner: "bob".to_string(),
        };
        let not_found = LeaseError::NotFound("svc-1".to_string());

        assert_eq!(not_owner.exit_code(), exit_codes::LEASE_LOST);
        assert_eq!(not_found.exit_code(), exit_codes::LEASE_LOST);
        assert!(not_owner.is_lease_loss());
        assert!(not_found.is_lease_loss());
    }

    #[test]
    fn transport_and_store_errors_are_not_lease_loss() {
        assert!(!LeaseError::Transport("refused".to_string()).is_lease_loss());
        assert!(!LeaseError::Store("disk full".to_string()).is_lease_loss());
        assert_eq!(
            LeaseError::Transport("refused".to_string()).exit_code(),
            exit_codes::STORE_FAILURE
        );
    }

    #[test]
    fn lock_held_message_names_owner_and_expiry() {
        let err = LeaseError::LockHeld {
            resource: "svc-1".to_string(),
            owner: "alice".to_string(),
            expires_at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "pipeline 'svc-1' is currently being edited by alice (lease expires at 2024-01-01T12:00:00+00:00)"
        );
    }
}
