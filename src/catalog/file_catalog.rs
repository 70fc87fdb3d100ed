//! Directory-backed catalogue: one YAML file per pipeline.

use super::pipeline::Pipeline;
use super::store::{Catalog, sort_by_recency};
use crate::clock::Clock;
use crate::error::{LeaseError, Result};
use crate::fs::atomic_write_file;
use crate::lease::validate_resource_id;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const EXTENSION: &str = "yaml";

/// Pipelines stored as `{name}.yaml` in a shared directory.
pub struct FileCatalog {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileCatalog {
    /// Open (creating if needed) a catalogue directory.
    pub fn open<P: AsRef<Path>>(dir: P, clock: Arc<dyn Clock>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            LeaseError::Store(format!(
                "failed to create catalogue directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir, clock })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }

    fn read(&self, path: &Path) -> Result<Option<Pipeline>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(LeaseError::Store(format!(
                    "failed to read pipeline file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_yaml::from_str(&content).map(Some).map_err(|e| {
            LeaseError::Store(format!(
                "failed to parse pipeline file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Every readable pipeline whose file stem matches its `name`.
    ///
    /// Unreadable or misnamed files are skipped with a warning, so `list`
    /// and `names` always describe the same set.
    fn load_all(&self) -> Result<Vec<Pipeline>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            LeaseError::Store(format!(
                "failed to read catalogue directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut pipelines = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                LeaseError::Store(format!("failed to read catalogue directory entry: {}", e))
            })?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }

            match self.read(&path) {
                Ok(Some(pipeline)) if pipeline.name == stem => pipelines.push(pipeline),
                Ok(Some(pipeline)) => log::warn!(
                    "skipping pipeline file '{}': it names '{}'",
                    path.display(),
                    pipeline.name
                ),
                Ok(None) => {} // removed between read_dir and read
                Err(e) => log::warn!("skipping unreadable pipeline: {}", e),
            }
        }
        Ok(pipelines)
    }
}

impl Catalog for FileCatalog {
    fn list(&self) -> Result<Vec<Pipeline>> {
        let mut pipelines = self.load_all()?;
        sort_by_recency(&mut pipelines);
        Ok(pipelines)
    }

    fn names(&self) -> Result<BTreeSet<String>> {
        Ok(self.load_all()?.into_iter().map(|p| p.name).collect())
    }

    fn get(&self, name: &str) -> Result<Option<Pipeline>> {
        validate_resource_id(name)?;
        self.read(&self.path_for(name))
    }

    fn put(&self, mut pipeline: Pipeline) -> Result<Pipeline> {
        validate_resource_id(&pipeline.name)?;
        let path = self.path_for(&pipeline.name);

        if let Some(existing) = self.read(&path)? {
            pipeline.created_at = existing.created_at;
        }
        pipeline.last_updated = self.clock.now();

        let yaml = serde_yaml::to_string(&pipeline).map_err(|e| {
            LeaseError::Store(format!(
                "failed to serialize pipeline '{}': {}",
                pipeline.name, e
            ))
        })?;
        atomic_write_file(&path, &yaml)?;
        Ok(pipeline)
    }

    fn remove(&self, name: &str) -> Result<bool> {
        validate_resource_id(name)?;
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(LeaseError::Store(format!(
                "failed to remove pipeline file '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}
