//! `Nestegg` - offline-first sync and progress engine for a personal goal
//! tracker
//!
//! This crate is the core of a goal-tracking application: it maintains
//! financial goal projects with append-only progress histories, keeps that
//! data consistent between a local cache and a remote multi-device document
//! store across arbitrarily long offline periods, and derives milestones,
//! streaks, and report aggregates purely from the history. Page layout,
//! chart rendering, and form handling belong to the host application.

// Deny the most critical lints that could lead to bugs or security issues
#![deny(
    // Security and correctness
    unsafe_code,
    unsafe_op_in_unsafe_fn,

    // Code quality - things that are almost always bugs
    unreachable_code,
    unreachable_patterns,
    unused_must_use,

    // Documentation - broken links are bugs
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
)]
// Warn on things that should be fixed but aren't necessarily bugs
#![warn(
    missing_docs,

    // Clippy categories for overall code quality
    clippy::all,
    clippy::pedantic,
    clippy::nursery,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_types_passed_by_value,
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,

    // Correctness
    clippy::clone_on_ref_ptr,
    clippy::dbg_macro,
    clippy::exit,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,

    // Complexity and readability
    clippy::cognitive_complexity,
    clippy::large_enum_variant,
    clippy::match_same_arms,
    clippy::too_many_lines,

    // Style consistency
    clippy::enum_glob_use,
    clippy::inconsistent_struct_constructor,
    clippy::must_use_candidate,
    clippy::redundant_closure_for_method_calls,
    clippy::semicolon_if_nothing_returned,
    clippy::wildcard_imports,

    // Future compatibility
    future_incompatible,
    rust_2018_idioms,
)]
// Allow some pedantic lints that are too noisy or not applicable
#![allow(
    clippy::module_name_repetitions,  // Common pattern in Rust
    clippy::missing_errors_doc,       // Error conditions live in the type
    clippy::missing_panics_doc,
)]

/// Local cache store - named snapshot slots over `SQLite`
pub mod cache;
/// Application configuration from TOML and environment
pub mod config;
/// Connectivity monitor - online/offline state and transition events
pub mod connectivity;
/// Core progress engine - pure derivation logic
pub mod core;
/// `SeaORM` entity definitions for the cache database
pub mod entities;
/// Unified error types and result handling
pub mod errors;
/// Project lifecycle manager - mutation orchestration
pub mod manager;
/// Domain types shared across the engine
pub mod models;
/// Notification collaborator seam
pub mod notify;
/// Durable pending-change queue
pub mod queue;
/// Remote store adapter boundary
pub mod remote;
/// Sync reconciler - pending-queue replay on reconnect
pub mod sync;

#[cfg(test)]
pub mod test_utils;
