//! Unified error types and result handling for the sync engine.
//!
//! Every fallible operation in the crate returns [`Result`]. No error here is
//! fatal to the process: remote write failures defer to the pending-change
//! queue, read failures fall back to the local cache, and only caller mistakes
//! (bad amounts, unknown ids) are surfaced synchronously.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration loading or parsing failed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong
        message: String,
    },

    /// Local cache database error.
    #[error("Cache database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// JSON (de)serialization error for a cache slot, change payload, or
    /// remote document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A progress amount or capital figure was zero, non-finite, or otherwise
    /// unusable.
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected value
        amount: f64,
    },

    /// No project with the given id exists in either partition.
    #[error("Project not found: {id}")]
    ProjectNotFound {
        /// The requested project id
        id: String,
    },

    /// No journal entry with the given id exists.
    #[error("Journal entry not found: {id}")]
    JournalEntryNotFound {
        /// The requested entry id
        id: String,
    },

    /// The remote store rejected or failed an operation.
    #[error("Remote store error: {message}")]
    Remote {
        /// Description from the adapter
        message: String,
    },

    /// A pending-change path did not match the collection grammar.
    #[error("Malformed change path: {path}")]
    MalformedPath {
        /// The offending path
        path: String,
    },
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
