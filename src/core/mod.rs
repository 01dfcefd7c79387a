//! Core progress engine - pure derivation logic.
//!
//! Everything under `core` is framework-agnostic and side-effect free: given a
//! project (or a set of them), these functions derive balances, percentages,
//! milestone transitions, streaks, and report figures. Persistence and remote
//! synchronization live elsewhere.

/// Append-progress derivation, milestones, and completion
pub mod progress;
/// Trailing-month profit/goal aggregates and capital distribution
pub mod report;
/// Cross-project daily activity streak
pub mod streak;
