//! Domain types for the goal-tracking engine.
//!
//! Everything here is plain data with serde support. Field names serialize in
//! camelCase because the same JSON shape is used for cache slots, pending
//! change payloads, and remote documents. Dates are ISO strings on the wire;
//! only the remote adapter ever sees a native timestamp type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The four fixed project categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// General savings goal
    Savings,
    /// Investment capital goal
    Investment,
    /// Emergency fund goal
    Emergency,
    /// Saving toward a specific purchase
    Purchase,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Self; 4] = [
        Self::Savings,
        Self::Investment,
        Self::Emergency,
        Self::Purchase,
    ];

    /// Lowercase name as stored in documents.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Investment => "investment",
            Self::Emergency => "emergency",
            Self::Purchase => "purchase",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cadence of a project's contribution goal, used when prorating the monthly
/// goal figure in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalFrequency {
    /// Goal amount is per day
    Daily,
    /// Goal amount is per week
    Weekly,
    /// Goal amount is per month
    Monthly,
}

/// The three fixed milestone thresholds, in percent.
pub const MILESTONE_THRESHOLDS: [u8; 3] = [25, 50, 75];

/// One progress milestone (25, 50, or 75 percent).
///
/// `achieved` is monotonic: once set it never reverts, even if later negative
/// entries pull the computed percentage back below the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// The threshold this milestone tracks (25, 50, or 75)
    pub threshold: u8,
    /// Estimated date the threshold will be reached
    #[serde(with = "iso_date")]
    pub target_date: NaiveDate,
    /// Whether the threshold has ever been reached
    pub achieved: bool,
    /// Date of the progress entry that crossed the threshold
    #[serde(default, with = "iso_date_opt")]
    pub achieved_date: Option<NaiveDate>,
}

/// One immutable, dated record of capital change applied to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    /// Unique entry id
    pub id: String,
    /// Calendar date the progress applies to
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    /// Signed capital change
    pub amount: f64,
    /// Project balance after this entry
    pub balance: f64,
    /// Project percentage after this entry (0-100)
    pub progress_percentage: f64,
}

/// A user-defined financial goal and its full derivation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Remote-assigned id, or `local-<uuid>` until first reconciliation
    pub id: String,
    /// Short display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Capital the goal starts from
    pub initial_capital: f64,
    /// Current balance: `initial_capital` plus the sum of all entry amounts
    pub current_balance: f64,
    /// Capital still to accumulate beyond `initial_capital`
    pub target_amount: f64,
    /// Date the goal window opens
    #[serde(with = "iso_date")]
    pub start_date: NaiveDate,
    /// Date the goal window closes
    #[serde(with = "iso_date")]
    pub target_date: NaiveDate,
    /// One of the four fixed categories
    pub category: Category,
    /// Configured contribution amount per `goal_frequency` period
    pub goal_amount: f64,
    /// Cadence of `goal_amount`
    pub goal_frequency: GoalFrequency,
    /// Milestones at 25, 50, and 75 percent
    pub milestones: [Milestone; 3],
    /// Rounded, clamped progress percentage (0-100)
    pub progress_percentage: f64,
    /// Whether the project has ever reached 100 percent. Monotonic; the
    /// Active -> Completed partition move is irreversible.
    pub completed: bool,
    /// Append-only progress history, oldest first
    #[serde(default)]
    pub progress_history: Vec<ProgressEntry>,
    /// Instant of the last mutation
    #[serde(with = "iso_datetime")]
    pub last_updated: DateTime<Utc>,
}

impl Project {
    /// The absolute balance that counts as 100 percent.
    #[must_use]
    pub fn total_target(&self) -> f64 {
        self.initial_capital + self.target_amount
    }
}

/// A dated note attached to a project. The reference is weak: deleting the
/// project cascades to its journal entries, but an entry never owns project
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Unique entry id
    pub id: String,
    /// Id of the project this note belongs to
    pub project_id: String,
    /// Note text
    pub content: String,
    /// Calendar date of the note (counts toward the activity streak)
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
}

/// Kind of queued mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Create the document at `path`
    Add,
    /// Merge-patch the document at `path`
    Update,
    /// Delete the document at `path`
    Delete,
}

/// A durable record of a mutation not yet confirmed against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    /// Slash-separated document path, e.g. `projects/<id>`
    pub path: String,
    /// JSON payload for add/update; ignored for delete
    pub payload: serde_json::Value,
    /// Operation to replay
    pub operation: ChangeOp,
    /// Instant the change was queued
    #[serde(with = "iso_datetime")]
    pub queued_at: DateTime<Utc>,
}

/// User preferences for the notification collaborator, persisted as a cache
/// slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    /// Notify when a milestone or completion is reached
    pub milestone_alerts: bool,
    /// Notify on sync start/completion/failure
    pub sync_alerts: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            milestone_alerts: true,
            sync_alerts: true,
        }
    }
}

/// Serde support for calendar dates as ISO strings.
///
/// Serializes `YYYY-MM-DD`; deserializes either that form or a full RFC 3339
/// instant (the shape a date takes after a round trip through the remote
/// adapter's timestamp type).
pub(crate) mod iso_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(date: &NaiveDate, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(de)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid ISO date: {raw}")))
    }

    pub(crate) fn parse(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }
}

/// Serde support for `Option<NaiveDate>` with the same tolerance as
/// [`iso_date`].
pub(crate) mod iso_date_opt {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, ser: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => ser.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(de)? {
            None => Ok(None),
            Some(raw) => super::iso_date::parse(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid ISO date: {raw}"))),
        }
    }
}

/// Serde support for instants as RFC 3339 strings, tolerating a bare date
/// (midnight UTC) on the way in.
pub(crate) mod iso_datetime {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid ISO datetime: {raw}")))
    }

    pub(crate) fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|ndt| ndt.and_utc())
            })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_category_serde_round_trip() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{category}\""));
            let back: Category = serde_json::from_str(&json).unwrap();
            assert_eq!(back, category);
        }
    }

    #[test]
    fn test_iso_date_parses_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(iso_date::parse("2025-03-14"), Some(expected));
        assert_eq!(iso_date::parse("2025-03-14T00:00:00+00:00"), Some(expected));
        assert_eq!(iso_date::parse("not a date"), None);
    }

    #[test]
    fn test_iso_datetime_accepts_bare_date() {
        let parsed = iso_datetime::parse("2025-03-14").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-14T00:00:00+00:00");
    }

    #[test]
    fn test_pending_change_round_trip() {
        let change = PendingChange {
            path: "projects/abc".to_string(),
            payload: serde_json::json!({ "title": "Car fund" }),
            operation: ChangeOp::Update,
            queued_at: Utc::now(),
        };
        let json = serde_json::to_string(&change).unwrap();
        let back: PendingChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back.path, change.path);
        assert_eq!(back.operation, ChangeOp::Update);
        // RFC 3339 round trip keeps sub-second precision
        assert_eq!(back.queued_at, change.queued_at);
    }
}
