//! Session owner identity.
//!
//! A `SessionOwnerId` is generated once per profile and persisted to a small
//! file so that reloading the CLI (or reopening an editor) keeps the same
//! identity. It is passed explicitly to every lease call.

use crate::error::{LeaseError, Result};
use crate::fs::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the profile file location.
pub const PROFILE_ENV: &str = "PIPELEASE_PROFILE";

/// Default profile file name under the user's home directory.
pub const DEFAULT_PROFILE_FILE: &str = ".pipelease_owner";

/// Opaque identifier of an editing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionOwnerId(String);

impl SessionOwnerId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(format!("session-{}", uuid::Uuid::new_v4().simple()))
    }

    /// Wrap an existing identifier (e.g. one read from the wire).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Load the identifier stored at `path`, creating and persisting a new
    /// one if the file is missing or empty.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) if !content.trim().is_empty() => {
                return Ok(Self(content.trim().to_string()));
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(LeaseError::UserError(format!(
                    "failed to read profile file '{}': {}",
                    path.display(),
                    e
                )));
            }
        }

        let id = Self::generate();
        atomic_write_file(path, &format!("{}\n", id.0))?;
        log::info!("generated session owner id {} at {}", id, path.display());
        Ok(id)
    }
}

impl fmt::Display for SessionOwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the profile file path: `$PIPELEASE_PROFILE`, else `~/.pipelease_owner`.
pub fn default_profile_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(PROFILE_ENV)
        && !path.is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| {
            LeaseError::UserError(format!(
                "cannot locate a home directory; set {} to a profile file path",
                PROFILE_ENV
            ))
        })?;

    Ok(PathBuf::from(home).join(DEFAULT_PROFILE_FILE))
}
