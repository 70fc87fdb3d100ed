//! Directory-backed lease store.
//!
//! Layout under the leases directory:
//! - `{resource}.json`: the lease record
//! - `.{resource}.guard`: the per-key lock file
//!
//! An update holds an exclusive OS lock on the key's guard file, which makes
//! the per-key read-decide-write atomic across processes sharing the
//! directory. The OS drops the lock when its holder exits, so a guard file
//! left behind by a crashed process never blocks later updates.

use super::record::LeaseRecord;
use super::store::{LeaseStore, Mutation};
use crate::error::{LeaseError, Result};
use crate::fs::atomic_write_file;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

/// Lease store persisted as one JSON file per lease.
#[derive(Debug)]
pub struct FileLeaseStore {
    dir: PathBuf,
    guard_retries: u32,
    guard_backoff: Duration,
    /// Serializes updates from threads of this process so they do not spin on
    /// each other's guard locks.
    local: Mutex<()>,
}

impl FileLeaseStore {
    /// Open (creating if needed) a lease directory.
    pub fn open<P: AsRef<Path>>(dir: P, guard_retries: u32, guard_backoff: Duration) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            LeaseError::Store(format!(
                "failed to create leases directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        Ok(Self {
            dir,
            guard_retries,
            guard_backoff,
            local: Mutex::new(()),
        })
    }

    fn record_path(&self, resource_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", resource_id))
    }

    fn guard_path(&self, resource_id: &str) -> PathBuf {
        self.dir.join(format!(".{}.guard", resource_id))
    }

    fn read_record(&self, path: &Path) -> Result<Option<LeaseRecord>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LeaseError::Store(format!(
                    "failed to read lease file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            LeaseError::Store(format!(
                "failed to parse lease file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Take the per-key guard, retrying briefly while another process holds it.
    fn take_guard(&self, resource_id: &str) -> Result<KeyGuard> {
        let path = self.guard_path(resource_id);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                LeaseError::Store(format!(
                    "failed to open lease guard '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        for attempt in 0..=self.guard_retries {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(KeyGuard { _file: file }),
                Err(e) if is_contended(&e) => {
                    if attempt < self.guard_retries {
                        thread::sleep(self.guard_backoff);
                    }
                }
                Err(e) => {
                    return Err(LeaseError::Store(format!(
                        "failed to lock lease guard '{}': {}",
                        path.display(),
                        e
                    )));
                }
            }
        }

        Err(LeaseError::Store(format!(
            "lease store busy: guard '{}' still held after {} attempts",
            path.display(),
            self.guard_retries + 1
        )))
    }
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Holds the exclusive lock on a key's guard file; closing the file unlocks it.
#[derive(Debug)]
struct KeyGuard {
    _file: File,
}

impl LeaseStore for FileLeaseStore {
    fn update(
        &self,
        resource_id: &str,
        decide: &mut dyn FnMut(Option<&LeaseRecord>) -> Mutation,
    ) -> Result<()> {
        let _local = self.local.lock().unwrap_or_else(|p| p.into_inner());
        let _guard = self.take_guard(resource_id)?;

        let path = self.record_path(resource_id);
        let current = self.read_record(&path)?;

        match decide(current.as_ref()) {
            Mutation::Keep => Ok(()),
            Mutation::Put(record) => {
                let json = serde_json::to_string_pretty(&record).map_err(|e| {
                    LeaseError::Store(format!("failed to serialize lease record: {}", e))
                })?;
                atomic_write_file(&path, &json)
            }
            Mutation::Delete => match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(LeaseError::Store(format!(
                    "failed to delete lease file '{}': {}",
                    path.display(),
                    e
                ))),
            },
        }
    }

    fn get(&self, resource_id: &str) -> Result<Option<LeaseRecord>> {
        self.read_record(&self.record_path(resource_id))
    }

    fn list(&self) -> Result<Vec<LeaseRecord>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            LeaseError::Store(format!(
                "failed to read leases directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                LeaseError::Store(format!("failed to read leases directory entry: {}", e))
            })?;
            let path = entry.path();

            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_none_or(|n| n.starts_with('.'));
            if hidden || path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match self.read_record(&path) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {} // removed between read_dir and read
                Err(e) => log::warn!("skipping unreadable lease file: {}", e),
            }
        }

        Ok(records)
    }
}
