//! Pipeline resource record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named pipeline definition.
///
/// `settings` is opaque to the lease protocol; the configuration UI owns its
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique pipeline name; also the lease key.
    pub name: String,

    /// When the pipeline was first stored.
    pub created_at: DateTime<Utc>,

    /// When the pipeline was last stored.
    pub last_updated: DateTime<Utc>,

    /// Free-form pipeline settings.
    #[serde(default)]
    pub settings: Value,
}

impl Pipeline {
    /// A new pipeline stamped with `now`.
    pub fn new(name: impl Into<String>, settings: Value, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at: now,
            last_updated: now,
            settings,
        }
    }
}
