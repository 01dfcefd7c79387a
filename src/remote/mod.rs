//! Remote store adapter boundary.
//!
//! The rest of the engine speaks JSON documents with ISO date strings; the
//! remote document database speaks its own timestamp type and assigns its own
//! ids. Everything that bridges the two lives here: the [`RemoteStore`] trait,
//! the versioned document schema checks, the ISO <-> timestamp conversion,
//! the change-path grammar, and merge-patch semantics.
//!
//! Consumers see two live project partitions (percentage below or at/above
//! 100) plus a journal collection, each delivered as wholesale snapshot
//! events - never diffs.

/// In-memory reference adapter, also used as the test double
pub mod memory;

use crate::{
    errors::{Error, Result},
    models::{JournalEntry, PendingChange, ProgressEntry, Project},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::warn;

/// Version stamped onto every document the adapter writes. Documents read
/// back with any other version are quarantined instead of propagated.
pub const SCHEMA_VERSION: u32 = 1;

/// Document key carrying [`SCHEMA_VERSION`].
const SCHEMA_VERSION_KEY: &str = "schemaVersion";

/// The remote store's native timestamp representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTimestamp {
    /// Seconds since the Unix epoch
    pub seconds: i64,
    /// Sub-second nanoseconds
    pub nanos: u32,
}

impl From<DateTime<Utc>> for RemoteTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos(),
        }
    }
}

impl RemoteTimestamp {
    /// Renders the timestamp back into the engine's ISO string convention: a
    /// bare date when the instant is exactly midnight UTC (how calendar dates
    /// round-trip), otherwise RFC 3339.
    #[must_use]
    pub fn to_iso_string(self) -> String {
        let Some(dt) = DateTime::from_timestamp(self.seconds, self.nanos) else {
            return String::new();
        };
        if self.nanos == 0 && self.seconds.rem_euclid(86_400) == 0 {
            dt.format("%Y-%m-%d").to_string()
        } else {
            dt.to_rfc3339()
        }
    }
}

/// Whether a document field holds a date-like value subject to timestamp
/// conversion.
fn is_date_field(key: &str) -> bool {
    key == "date" || key == "lastUpdated" || key == "queuedAt" || key.ends_with("Date")
}

/// Recursively replaces ISO date strings in date-like fields with
/// [`RemoteTimestamp`] objects. Applied to every payload on its way into the
/// remote store.
pub fn convert_dates_to_timestamps(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            for (key, field) in fields.iter_mut() {
                if is_date_field(key) {
                    if let Value::String(raw) = field {
                        if let Some(dt) = crate::models::iso_datetime::parse(raw) {
                            if let Ok(ts) = serde_json::to_value(RemoteTimestamp::from(dt)) {
                                *field = ts;
                                continue;
                            }
                        }
                    }
                }
                convert_dates_to_timestamps(field);
            }
        }
        Value::Array(items) => {
            for item in items {
                convert_dates_to_timestamps(item);
            }
        }
        _ => {}
    }
}

/// Recursively replaces [`RemoteTimestamp`] objects in date-like fields with
/// ISO strings. Applied to every document on its way out of the remote store.
pub fn convert_timestamps_to_dates(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            for (key, field) in fields.iter_mut() {
                if is_date_field(key) {
                    if let Ok(ts) = serde_json::from_value::<RemoteTimestamp>(field.clone()) {
                        *field = Value::String(ts.to_iso_string());
                        continue;
                    }
                }
                convert_timestamps_to_dates(field);
            }
        }
        Value::Array(items) => {
            for item in items {
                convert_timestamps_to_dates(item);
            }
        }
        _ => {}
    }
}

/// RFC 7386 merge-patch: objects merge recursively, `null` removes a field,
/// anything else replaces wholesale.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(serde_json::Map::new());
            }
            if let Value::Object(fields) = target {
                for (key, value) in entries {
                    if value.is_null() {
                        fields.remove(key);
                    } else {
                        merge_patch(fields.entry(key.clone()).or_insert(Value::Null), value);
                    }
                }
            }
        }
        _ => *target = patch.clone(),
    }
}

/// A parsed change path within a user's namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePath {
    /// `projects/<id>`
    Project(String),
    /// `projects/<project_id>/progressHistory/<entry_id>`
    ProgressEntry {
        /// Owning project id
        project_id: String,
        /// Entry document id
        entry_id: String,
    },
    /// `journalEntries/<id>`
    JournalEntry(String),
}

impl ChangePath {
    /// Parses a slash-separated document path.
    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<&str> = path.split('/').collect();
        match segments.as_slice() {
            ["projects", id] if !id.is_empty() => Ok(Self::Project((*id).to_string())),
            ["projects", project_id, "progressHistory", entry_id]
                if !project_id.is_empty() && !entry_id.is_empty() =>
            {
                Ok(Self::ProgressEntry {
                    project_id: (*project_id).to_string(),
                    entry_id: (*entry_id).to_string(),
                })
            }
            ["journalEntries", id] if !id.is_empty() => Ok(Self::JournalEntry((*id).to_string())),
            _ => Err(Error::MalformedPath {
                path: path.to_string(),
            }),
        }
    }
}

/// Builds the document path for a project.
#[must_use]
pub fn project_path(id: &str) -> String {
    format!("projects/{id}")
}

/// Builds the document path for a progress entry.
#[must_use]
pub fn progress_entry_path(project_id: &str, entry_id: &str) -> String {
    format!("projects/{project_id}/progressHistory/{entry_id}")
}

/// Builds the document path for a journal entry.
#[must_use]
pub fn journal_entry_path(id: &str) -> String {
    format!("journalEntries/{id}")
}

/// Stamps a payload with the current schema version, on its way into the
/// store.
pub(crate) fn stamp_schema_version(doc: &mut Value) {
    if let Value::Object(fields) = doc {
        fields.insert(SCHEMA_VERSION_KEY.to_string(), SCHEMA_VERSION.into());
    }
}

/// Validates and deserializes a stored document.
///
/// Returns `None` - quarantining the document - when the schema version does
/// not match or the fields fail to deserialize; malformed remote data never
/// propagates past this boundary.
pub(crate) fn read_document<T: DeserializeOwned>(doc: &Value, context: &str) -> Option<T> {
    let version = doc.get(SCHEMA_VERSION_KEY).and_then(Value::as_u64);
    if version != Some(u64::from(SCHEMA_VERSION)) {
        warn!(
            "Quarantined {} document with schema version {:?}.",
            context, version
        );
        return None;
    }

    let mut cleaned = doc.clone();
    convert_timestamps_to_dates(&mut cleaned);

    match serde_json::from_value(cleaned) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Quarantined malformed {} document: {}.", context, e);
            None
        }
    }
}

/// The two project partitions plus the journal, as read from the remote
/// store. Local state is always replaced wholesale with one of these.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteSnapshot {
    /// Projects with percentage below 100
    pub active: Vec<Project>,
    /// Projects with percentage at or above 100
    pub completed: Vec<Project>,
    /// All journal entries in the user's namespace
    pub journal: Vec<JournalEntry>,
}

/// A push event from the remote store's live queries. Every variant carries a
/// full snapshot of the collection it covers.
#[derive(Debug, Clone)]
pub enum RemoteEvent {
    /// Both project partitions changed
    Projects {
        /// Full active partition
        active: Vec<Project>,
        /// Full completed partition
        completed: Vec<Project>,
    },
    /// The journal collection changed
    Journal(Vec<JournalEntry>),
}

/// Abstraction over the multi-collection remote document database.
///
/// Implementations own the conversion between engine JSON (ISO dates) and
/// native documents (timestamps, schema versions); callers never see either.
pub trait RemoteStore {
    /// Creates the project document and returns the remote-assigned id.
    fn create_project(
        &self,
        user_id: &str,
        project: &Project,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Applies one pending change (add, update, or delete) at its path.
    fn apply_change(
        &self,
        user_id: &str,
        change: &PendingChange,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Reads the full partitioned snapshot for a user.
    fn fetch_snapshot(&self, user_id: &str)
    -> impl Future<Output = Result<RemoteSnapshot>> + Send;

    /// Subscribes to live snapshot events for a user.
    fn subscribe(&self, user_id: &str) -> broadcast::Receiver<RemoteEvent>;
}

impl<T: RemoteStore + Send + Sync> RemoteStore for std::sync::Arc<T> {
    async fn create_project(&self, user_id: &str, project: &Project) -> Result<String> {
        (**self).create_project(user_id, project).await
    }

    async fn apply_change(&self, user_id: &str, change: &PendingChange) -> Result<()> {
        (**self).apply_change(user_id, change).await
    }

    async fn fetch_snapshot(&self, user_id: &str) -> Result<RemoteSnapshot> {
        (**self).fetch_snapshot(user_id).await
    }

    fn subscribe(&self, user_id: &str) -> broadcast::Receiver<RemoteEvent> {
        (**self).subscribe(user_id)
    }
}

/// Serializes a project into its remote document shape: the project fields
/// minus the history subcollection.
pub(crate) fn project_document(project: &Project) -> Result<Value> {
    let mut doc = serde_json::to_value(project)?;
    if let Value::Object(fields) = &mut doc {
        fields.remove("progressHistory");
    }
    Ok(doc)
}

/// Serializes a progress entry into its subcollection document shape.
pub(crate) fn entry_document(entry: &ProgressEntry) -> Result<Value> {
    Ok(serde_json::to_value(entry)?)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_path_grammar() {
        assert_eq!(
            ChangePath::parse("projects/abc").unwrap(),
            ChangePath::Project("abc".to_string())
        );
        assert_eq!(
            ChangePath::parse("projects/abc/progressHistory/e1").unwrap(),
            ChangePath::ProgressEntry {
                project_id: "abc".to_string(),
                entry_id: "e1".to_string(),
            }
        );
        assert_eq!(
            ChangePath::parse("journalEntries/j9").unwrap(),
            ChangePath::JournalEntry("j9".to_string())
        );

        for bad in ["", "projects", "projects/", "users/abc", "projects/a/b/c"] {
            assert!(matches!(
                ChangePath::parse(bad),
                Err(Error::MalformedPath { .. })
            ));
        }
    }

    #[test]
    fn test_date_fields_convert_both_ways() {
        let mut doc = json!({
            "title": "Car fund",
            "startDate": "2025-06-01",
            "lastUpdated": "2025-06-10T08:30:00+00:00",
            "milestones": [
                { "threshold": 25, "targetDate": "2025-07-01", "achieved": false }
            ]
        });

        convert_dates_to_timestamps(&mut doc);
        assert!(doc["startDate"]["seconds"].is_i64());
        assert!(doc["lastUpdated"]["seconds"].is_i64());
        assert!(doc["milestones"][0]["targetDate"]["seconds"].is_i64());
        // Non-date fields untouched.
        assert_eq!(doc["title"], "Car fund");

        convert_timestamps_to_dates(&mut doc);
        assert_eq!(doc["startDate"], "2025-06-01");
        assert_eq!(doc["lastUpdated"], "2025-06-10T08:30:00+00:00");
        assert_eq!(doc["milestones"][0]["targetDate"], "2025-07-01");
    }

    #[test]
    fn test_merge_patch_semantics() {
        let mut target = json!({ "a": 1, "b": { "x": 1, "y": 2 }, "c": 3 });
        merge_patch(
            &mut target,
            &json!({ "a": 10, "b": { "y": null, "z": 9 }, "d": [1, 2] }),
        );
        assert_eq!(
            target,
            json!({ "a": 10, "b": { "x": 1, "z": 9 }, "c": 3, "d": [1, 2] })
        );
    }

    #[test]
    fn test_wrong_schema_version_is_quarantined() {
        let mut doc = json!({ "id": "j1", "projectId": "p1", "content": "hi", "date": "2025-06-01" });
        stamp_schema_version(&mut doc);
        assert!(read_document::<crate::models::JournalEntry>(&doc, "journal").is_some());

        doc["schemaVersion"] = json!(2);
        assert!(read_document::<crate::models::JournalEntry>(&doc, "journal").is_none());

        let unversioned = json!({ "id": "j1" });
        assert!(read_document::<crate::models::JournalEntry>(&unversioned, "journal").is_none());
    }
}
