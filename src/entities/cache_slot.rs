//! Cache slot entity - one named slot per persisted snapshot.
//!
//! The local cache is a handful of key/value slots (projects, completed
//! projects, journal, pending changes, notification preferences), each storing
//! one JSON document that is restored verbatim on load.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cache slot database model - stores one serialized snapshot per key
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cache_slots")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Slot key (e.g. `"projects"`, `"pending_changes"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Snapshot serialized as JSON
    pub value: String,
    /// When this slot was last written
    pub updated_at: DateTime,
}

/// Cache slots have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
