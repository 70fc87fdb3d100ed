//! Append-only audit log of lease and catalogue transitions.
//!
//! Events are stored in NDJSON format (one JSON object per line), by default in
//! `<store>/events/events.ndjson`.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: The action performed (acquire, release, force_acquire, ...)
//! - `actor`: The session owner id that caused the event
//! - `host`: `user@HOST` of the process that wrote the line
//! - `resource`: Optional pipeline name
//! - `details`: Freeform object with action-specific details
//!
//! Writing to the audit log never decides the outcome of a lease operation:
//! callers log append failures and carry on.

use crate::error::{LeaseError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Store initialised
    Init,
    /// Lease granted (fresh or idempotent re-acquire)
    Acquire,
    /// Lease taken over regardless of the previous holder
    ForceAcquire,
    /// Lease released by its owner
    Release,
    /// Expired leases removed by a sweep
    Expire,
    /// Pipeline added or updated in the catalogue
    PipelineAdd,
    /// Pipeline removed from the catalogue
    PipelineRemove,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::Acquire => write!(f, "acquire"),
            EventAction::ForceAcquire => write!(f, "force_acquire"),
            EventAction::Release => write!(f, "release"),
            EventAction::Expire => write!(f, "expire"),
            EventAction::PipelineAdd => write!(f, "pipeline_add"),
            EventAction::PipelineRemove => write!(f, "pipeline_remove"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// Session owner id responsible for the action.
    pub actor: String,

    /// Host identity of the writing process (`user@HOST`).
    pub host: String,

    /// Optional pipeline name for resource-specific events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action and actor.
    pub fn new(action: EventAction, actor: impl Into<String>) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor.into(),
            host: get_host_string(),
            resource: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Stamp the event with `ts` instead of the wall clock.
    pub fn at(mut self, ts: DateTime<Utc>) -> Self {
        self.ts = ts;
        self
    }

    /// Set the resource name for this event.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| LeaseError::Store(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// `user@HOST` of the current process.
fn get_host_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// NDJSON audit log file.
///
/// Appends from threads of one process are serialized; appends from separate
/// processes rely on `O_APPEND` line atomicity.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    write: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event as a single JSON line, creating the file if needed.
    pub fn append(&self, event: &Event) -> Result<()> {
        let json_line = event.to_ndjson_line()?;
        let _guard = self.write.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(dir) = self.path.parent()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| {
                LeaseError::Store(format!(
                    "failed to create events directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LeaseError::Store(format!(
                    "failed to open events file '{}': {}",
                    self.path.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            LeaseError::Store(format!(
                "failed to write event to '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Append, logging instead of failing.
    pub fn record(&self, event: Event) {
        if let Err(e) = self.append(&event) {
            log::warn!("failed to record {} event: {}", event.action, e);
        }
    }

    /// Read every event in the log, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<Event>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LeaseError::Store(format!(
                    "failed to read events file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::Acquire, "session-a");

        assert_eq!(event.action, EventAction::Acquire);
        assert_eq!(event.actor, "session-a");
        assert!(event.host.contains('@'));
        assert!(event.resource.is_none());
    }

    #[test]
    fn test_event_serialization_is_single_line() {
        let event = Event::new(EventAction::ForceAcquire, "session-a")
            .with_resource("svc-1")
            .with_details(json!({"previous_owner": "session-b"}));

        let json_line = event.to_ndjson_line().unwrap();
        assert!(!json_line.contains('\n'));
        assert!(json_line.contains("\"force_acquire\""));

        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.resource.as_deref(), Some("svc-1"));
        assert_eq!(parsed.details["previous_owner"], "session-b");
    }

    #[test]
    fn test_event_without_resource_omits_field() {
        let json_line = Event::new(EventAction::Init, "x").to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("resource").is_none());
    }

    #[test]
    fn test_append_creates_dir_and_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::new(temp_dir.path().join("events").join("events.ndjson"));

        log.append(&Event::new(EventAction::Acquire, "a").with_resource("svc-1"))
            .unwrap();
        log.append(&Event::new(EventAction::Release, "a").with_resource("svc-1"))
            .unwrap();

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.ends_with('\n'));

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, EventAction::Acquire);
        assert_eq!(events[1].action, EventAction::Release);
    }

    #[test]
    fn test_read_all_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::new(temp_dir.path().join("none.ndjson"));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_event_action_display() {
        assert_eq!(EventAction::Acquire.to_string(), "acquire");
        assert_eq!(EventAction::ForceAcquire.to_string(), "force_acquire");
        assert_eq!(EventAction::Expire.to_string(), "expire");
        assert_eq!(EventAction::PipelineRemove.to_string(), "pipeline_remove");
    }
}
