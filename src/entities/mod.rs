//! `SeaORM` entity definitions for the local cache database.

/// Named key/value slot holding one serialized snapshot
pub mod cache_slot;

pub use cache_slot::Entity as CacheSlot;
