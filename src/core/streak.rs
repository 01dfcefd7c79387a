//! Cross-project activity streak.
//!
//! The streak counts consecutive calendar days, ending today, on which at
//! least one progress entry or journal entry exists anywhere - active and
//! completed projects alike. A run that ended yesterday counts for nothing:
//! no activity today means a streak of zero.

use crate::models::{JournalEntry, Project};
use chrono::NaiveDate;
use std::collections::HashSet;

/// Collects the distinct calendar dates carrying any activity across all
/// projects and journal entries.
#[must_use]
pub fn activity_dates<'a, P>(projects: P, journal: &[JournalEntry]) -> HashSet<NaiveDate>
where
    P: IntoIterator<Item = &'a Project>,
{
    let mut dates: HashSet<NaiveDate> = HashSet::new();
    for project in projects {
        dates.extend(project.progress_history.iter().map(|entry| entry.date));
    }
    dates.extend(journal.iter().map(|entry| entry.date));
    dates
}

/// Walks backward from `today` while each day is present in `dates`,
/// returning the run length. Zero whenever `today` itself is absent.
#[must_use]
pub fn streak_as_of(dates: &HashSet<NaiveDate>, today: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = today;
    while dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}
