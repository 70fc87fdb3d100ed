//! Store location resolution for pipelease.
//!
//! Every CLI process is a client of one shared store directory. The directory
//! holds the lease records, the pipeline catalogue, the audit log and the
//! config file:
//!
//! ```text
//! .pipelease/
//!   config.yaml
//!   leases/<pipeline>.json
//!   catalog/<pipeline>.yaml
//!   events/events.ndjson
//! ```
//!
//! All commands must use this module to locate the store so that concurrent
//! processes agree on the same files.

use crate::api::ControlPlane;
use crate::catalog::FileCatalog;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{LeaseError, Result};
use crate::events::EventLog;
use crate::lease::{FileLeaseStore, LeaseService};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable naming the store directory.
pub const STORE_ENV: &str = "PIPELEASE_STORE";

/// Default store directory relative to the working directory.
pub const DEFAULT_STORE_DIR: &str = ".pipelease";

/// Resolved paths of a store directory. All paths are absolute.
#[derive(Debug, Clone)]
pub struct StoreContext {
    /// Store root.
    pub root: PathBuf,

    /// One JSON file per lease (`{root}/leases/`).
    pub leases_dir: PathBuf,

    /// One YAML file per pipeline (`{root}/catalog/`).
    pub catalog_dir: PathBuf,
}

impl StoreContext {
    /// Resolve the store from `--store`, then `$PIPELEASE_STORE`, then
    /// `./.pipelease`.
    pub fn resolve(store: Option<&Path>) -> Result<Self> {
        let root = match store {
            Some(path) => path.to_path_buf(),
            None => match env::var(STORE_ENV) {
                Ok(path) if !path.is_empty() => PathBuf::from(path),
                _ => PathBuf::from(DEFAULT_STORE_DIR),
            },
        };

        let root = if root.is_absolute() {
            root
        } else {
            env::current_dir()
                .map_err(|e| {
                    LeaseError::UserError(format!(
                        "failed to get current working directory: {}",
                        e
                    ))
                })?
                .join(root)
        };

        Ok(Self::from_root(root))
    }

    /// Lay out the store paths under `root` without touching the filesystem.
    pub fn from_root<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            leases_dir: root.join("leases"),
            catalog_dir: root.join("catalog"),
            root,
        }
    }

    /// Whether `init` has been run for this store.
    pub fn is_initialized(&self) -> bool {
        self.config_path().is_file() && self.leases_dir.is_dir() && self.catalog_dir.is_dir()
    }

    /// Ensure the store is initialized, returning an error if not.
    ///
    /// Called by every command except `init`.
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(LeaseError::UserError(format!(
                "pipelease store not initialized.\n\
                 Expected store at: {}\n\n\
                 Run `pipelease init` (or pass --store / set {}).",
                self.root.display(),
                STORE_ENV
            )));
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    /// Get the path to the events directory.
    pub fn events_dir(&self) -> PathBuf {
        self.root.join("events")
    }

    /// Get the path to the main events log file.
    pub fn events_file(&self) -> PathBuf {
        self.events_dir().join("events.ndjson")
    }

    /// Load the store's config, falling back to defaults if it is missing.
    pub fn load_config(&self) -> Result<Config> {
        Config::load_or_default(self.config_path())
    }

    /// Open the file-backed lease and catalogue stores as one control plane.
    pub fn control_plane(&self, config: &Config) -> Result<ControlPlane> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = FileLeaseStore::open(
            &self.leases_dir,
            config.store_guard_retries,
            Duration::from_millis(config.store_guard_backoff_ms),
        )?;
        let leases = LeaseService::new(Arc::new(store), clock.clone(), config.lease_ttl())
            .with_event_log(Arc::new(EventLog::new(self.events_file())));
        let catalog = FileCatalog::open(&self.catalog_dir, clock)?;

        Ok(ControlPlane::new(leases, Arc::new(catalog)))
    }
}

/// Resolve the store and ensure it is initialized.
///
/// Use this in every command except `init`.
pub fn require_initialized_store(store: Option<&Path>) -> Result<StoreContext> {
    let ctx = StoreContext::resolve(store)?;
    ctx.ensure_initialized()?;
    Ok(ctx)
}
