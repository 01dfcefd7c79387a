//! In-memory remote store.
//!
//! A complete [`RemoteStore`] implementation backed by process memory: per-user
//! namespaces, native-timestamp documents, schema stamping and quarantine on
//! read, merge-patch updates, live snapshot events, and injectable write
//! failures. Tests use it as the remote double; it is also the reference for
//! what a real backend adapter must do.

use crate::{
    errors::{Error, Result},
    models::{ChangeOp, JournalEntry, PendingChange, Project},
    remote::{
        ChangePath, RemoteEvent, RemoteSnapshot, RemoteStore, convert_dates_to_timestamps,
        merge_patch, project_document, read_document, stamp_schema_version,
    },
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

/// One user's document namespace.
#[derive(Debug, Default)]
struct UserSpace {
    /// `projects` collection, project doc by id (history lives separately)
    projects: BTreeMap<String, Value>,
    /// `progressHistory` subcollections: project id -> entry id -> doc
    history: BTreeMap<String, BTreeMap<String, Value>>,
    /// Arrival order of history entries, entry id -> sequence number.
    /// Breaks ties between entries dated the same day.
    arrival: BTreeMap<String, u64>,
    next_seq: u64,
    /// `journalEntries` collection, entry doc by id
    journal: BTreeMap<String, Value>,
}

/// In-memory multi-collection document store with live queries.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    spaces: Mutex<HashMap<String, UserSpace>>,
    events: Mutex<HashMap<String, broadcast::Sender<RemoteEvent>>>,
    failing_paths: Mutex<HashSet<String>>,
}

impl MemoryRemote {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to `path` fail until [`Self::clear_failures`] is
    /// called. Lets tests exercise the reconciler's failed-subset handling.
    pub fn inject_failure(&self, path: &str) {
        self.failing_paths
            .lock()
            .expect("failure set poisoned")
            .insert(path.to_string());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.failing_paths
            .lock()
            .expect("failure set poisoned")
            .clear();
    }

    /// Number of project documents stored for a user.
    #[must_use]
    pub fn project_count(&self, user_id: &str) -> usize {
        self.spaces
            .lock()
            .expect("store poisoned")
            .get(user_id)
            .map_or(0, |space| space.projects.len())
    }

    fn sender_for(&self, user_id: &str) -> broadcast::Sender<RemoteEvent> {
        let mut events = self.events.lock().expect("event map poisoned");
        events
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(32).0)
            .clone()
    }

    fn publish_projects(&self, user_id: &str, snapshot: &RemoteSnapshot) {
        // Send fails only when nobody is subscribed.
        let _ = self.sender_for(user_id).send(RemoteEvent::Projects {
            active: snapshot.active.clone(),
            completed: snapshot.completed.clone(),
        });
    }

    fn publish_journal(&self, user_id: &str, snapshot: &RemoteSnapshot) {
        let _ = self
            .sender_for(user_id)
            .send(RemoteEvent::Journal(snapshot.journal.clone()));
    }

    fn snapshot_locked(space: &UserSpace) -> RemoteSnapshot {
        let mut snapshot = RemoteSnapshot::default();

        for (id, doc) in &space.projects {
            let Some(mut project) = read_document::<Project>(doc, "project") else {
                continue;
            };

            let mut entries: Vec<crate::models::ProgressEntry> = space
                .history
                .get(id)
                .map(|docs| {
                    docs.values()
                        .filter_map(|doc| read_document(doc, "progress entry"))
                        .collect()
                })
                .unwrap_or_default();
            entries.sort_by_key(|entry| {
                let seq = space.arrival.get(&entry.id).copied().unwrap_or(u64::MAX);
                (entry.date, seq)
            });
            project.progress_history = entries;

            // The two live queries partition on the stored percentage.
            if project.progress_percentage >= 100.0 {
                snapshot.completed.push(project);
            } else {
                snapshot.active.push(project);
            }
        }

        let mut journal: Vec<JournalEntry> = space
            .journal
            .values()
            .filter_map(|doc| read_document(doc, "journal entry"))
            .collect();
        journal.sort_by_key(|entry| entry.date);
        snapshot.journal = journal;

        snapshot
    }

    fn store_document(space: &mut UserSpace, path: &ChangePath, payload: &Value, merge: bool) {
        if let ChangePath::ProgressEntry { entry_id, .. } = path {
            if !space.arrival.contains_key(entry_id) {
                space.next_seq += 1;
                space.arrival.insert(entry_id.clone(), space.next_seq);
            }
        }

        let mut doc = payload.clone();
        convert_dates_to_timestamps(&mut doc);
        stamp_schema_version(&mut doc);

        let slot = match path {
            ChangePath::Project(id) => space.projects.entry(id.clone()),
            ChangePath::ProgressEntry {
                project_id,
                entry_id,
            } => space
                .history
                .entry(project_id.clone())
                .or_default()
                .entry(entry_id.clone()),
            ChangePath::JournalEntry(id) => space.journal.entry(id.clone()),
        };

        match slot {
            std::collections::btree_map::Entry::Occupied(mut existing) if merge => {
                merge_patch(existing.get_mut(), &doc);
            }
            std::collections::btree_map::Entry::Occupied(mut existing) => {
                *existing.get_mut() = doc;
            }
            std::collections::btree_map::Entry::Vacant(vacant) => {
                vacant.insert(doc);
            }
        }
    }

    fn delete_document(space: &mut UserSpace, path: &ChangePath) {
        match path {
            ChangePath::Project(id) => {
                space.projects.remove(id);
                // Deleting a project drops its history subcollection with it.
                if let Some(entries) = space.history.remove(id) {
                    for entry_id in entries.keys() {
                        space.arrival.remove(entry_id);
                    }
                }
            }
            ChangePath::ProgressEntry {
                project_id,
                entry_id,
            } => {
                if let Some(entries) = space.history.get_mut(project_id) {
                    entries.remove(entry_id);
                }
                space.arrival.remove(entry_id);
            }
            ChangePath::JournalEntry(id) => {
                space.journal.remove(id);
            }
        }
    }
}

impl RemoteStore for MemoryRemote {
    async fn create_project(&self, user_id: &str, project: &Project) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut doc = project_document(project)?;
        if let Value::Object(fields) = &mut doc {
            fields.insert("id".to_string(), Value::String(id.clone()));
        }

        let snapshot = {
            let mut spaces = self.spaces.lock().expect("store poisoned");
            let space = spaces.entry(user_id.to_string()).or_default();
            Self::store_document(space, &ChangePath::Project(id.clone()), &doc, false);
            Self::snapshot_locked(space)
        };

        debug!("Created remote project {} for user {}.", id, user_id);
        self.publish_projects(user_id, &snapshot);
        Ok(id)
    }

    async fn apply_change(&self, user_id: &str, change: &PendingChange) -> Result<()> {
        if self
            .failing_paths
            .lock()
            .expect("failure set poisoned")
            .contains(&change.path)
        {
            return Err(Error::Remote {
                message: format!("write to {} failed", change.path),
            });
        }

        let path = ChangePath::parse(&change.path)?;
        let journal_changed = matches!(path, ChangePath::JournalEntry(_));

        let snapshot = {
            let mut spaces = self.spaces.lock().expect("store poisoned");
            let space = spaces.entry(user_id.to_string()).or_default();
            match change.operation {
                ChangeOp::Add => Self::store_document(space, &path, &change.payload, false),
                ChangeOp::Update => Self::store_document(space, &path, &change.payload, true),
                ChangeOp::Delete => Self::delete_document(space, &path),
            }
            Self::snapshot_locked(space)
        };

        if journal_changed {
            self.publish_journal(user_id, &snapshot);
        } else {
            self.publish_projects(user_id, &snapshot);
        }
        Ok(())
    }

    async fn fetch_snapshot(&self, user_id: &str) -> Result<RemoteSnapshot> {
        let spaces = self.spaces.lock().expect("store poisoned");
        Ok(spaces.get(user_id).map(Self::snapshot_locked).unwrap_or_default())
    }

    fn subscribe(&self, user_id: &str) -> broadcast::Receiver<RemoteEvent> {
        self.sender_for(user_id).subscribe()
    }
}
