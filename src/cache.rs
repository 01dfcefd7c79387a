//! Local cache store - synchronous snapshot persistence over `SQLite`.
//!
//! The cache holds the last known state of every snapshot the engine needs to
//! survive a restart or an offline period: both project partitions, the
//! journal, the pending-change queue, and notification preferences. Each lives
//! in a named slot of the `cache_slots` table as one JSON document, written
//! wholesale and restored verbatim on load.

use crate::{
    entities::{CacheSlot, cache_slot},
    errors::Result,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema, Set, prelude::*};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

/// The fixed set of named cache slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSlotKey {
    /// Active projects snapshot
    Projects,
    /// Completed projects snapshot
    CompletedProjects,
    /// Journal entries snapshot
    Journal,
    /// Durable pending-change queue
    PendingChanges,
    /// Notification preferences
    NotificationPrefs,
}

impl CacheSlotKey {
    /// Slot key as stored in the `cache_slots` table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::CompletedProjects => "completed_projects",
            Self::Journal => "journal_entries",
            Self::PendingChanges => "pending_changes",
            Self::NotificationPrefs => "notification_prefs",
        }
    }
}

/// Handle to the local cache database.
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    db: DatabaseConnection,
}

impl LocalCacheStore {
    /// Connects to the cache database at `url` and creates the slot table if
    /// it does not exist yet.
    pub async fn connect(url: &str) -> Result<Self> {
        let db = Database::connect(url).await?;
        create_tables(&db).await?;
        Ok(Self { db })
    }

    /// Opens a fresh in-memory cache. Used by tests and as a throwaway cache
    /// when no durable path is configured.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// Serializes `value` into the named slot, replacing any previous
    /// snapshot.
    pub async fn write_slot<T: Serialize>(&self, slot: CacheSlotKey, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let now = chrono::Utc::now().naive_utc();

        let existing = CacheSlot::find()
            .filter(cache_slot::Column::Key.eq(slot.as_str()))
            .one(&self.db)
            .await?;

        if let Some(model) = existing {
            let mut active: cache_slot::ActiveModel = model.into();
            active.value = Set(json);
            active.updated_at = Set(now);
            active.update(&self.db).await?;
        } else {
            let active = cache_slot::ActiveModel {
                key: Set(slot.as_str().to_string()),
                value: Set(json),
                updated_at: Set(now),
                ..Default::default()
            };
            active.insert(&self.db).await?;
        }

        debug!("Cache slot '{}' written.", slot.as_str());
        Ok(())
    }

    /// Closes the underlying connection pool. The cache (and every clone of
    /// it) rejects reads and writes afterwards.
    pub async fn close(self) -> Result<()> {
        self.db.close().await?;
        Ok(())
    }

    /// Restores the named slot, or `None` if it was never written.
    ///
    /// A slot that fails to deserialize is treated as absent rather than
    /// surfaced: worst case is a cold start from the remote store, never a
    /// crash on load.
    pub async fn read_slot<T: DeserializeOwned>(&self, slot: CacheSlotKey) -> Result<Option<T>> {
        let model = CacheSlot::find()
            .filter(cache_slot::Column::Key.eq(slot.as_str()))
            .one(&self.db)
            .await?;

        let Some(model) = model else {
            return Ok(None);
        };

        match serde_json::from_str(&model.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(
                    "Cache slot '{}' is unreadable ({}); treating as empty.",
                    slot.as_str(),
                    e
                );
                Ok(None)
            }
        }
    }
}

/// Creates the cache table using `SeaORM`'s schema generation from the entity
/// definition.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut stmt = schema.create_table_from_entity(CacheSlot);
    db.execute(builder.build(stmt.if_not_exists())).await?;

    Ok(())
}
