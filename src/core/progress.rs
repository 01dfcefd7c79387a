//! Progress derivation - the heart of the engine.
//!
//! Appending a progress entry is the only operation that moves a project's
//! derived state: balance, clamped percentage, milestone flags, and the
//! one-shot Active -> Completed transition. All of it is pure; the lifecycle
//! manager decides where the resulting state gets written.

use crate::{
    errors::{Error, Result},
    models::{MILESTONE_THRESHOLDS, Milestone, ProgressEntry, Project},
};
use chrono::{DateTime, Months, NaiveDate, Utc};

/// Computes the rounded, clamped progress percentage for a balance.
///
/// `(balance - initial_capital) / target_amount * 100`, rounded to the nearest
/// integer and clamped to 0-100. A non-positive target yields 0 rather than a
/// division blow-up; creation validation normally rules that out.
#[must_use]
pub fn progress_percentage(initial_capital: f64, target_amount: f64, balance: f64) -> f64 {
    if target_amount <= 0.0 || !target_amount.is_finite() {
        return 0.0;
    }
    let raw = (balance - initial_capital) / target_amount * 100.0;
    raw.round().clamp(0.0, 100.0)
}

/// What one append did to a project, beyond the entry itself.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    /// The entry that was appended (already pushed onto the history)
    pub entry: ProgressEntry,
    /// Thresholds newly achieved by this entry, ascending
    pub achieved_thresholds: Vec<u8>,
    /// Whether this entry fired the one-shot Active -> Completed transition
    pub completed_now: bool,
}

/// Appends a progress entry to `project` and rederives its state.
///
/// Milestone thresholds are evaluated independently against the new
/// percentage, so a single large entry can achieve 25, 50, and 75 at once;
/// each is stamped with this entry's date, not a back-dated one. Achieved
/// flags never revert. The completion transition fires at most once, the
/// first time the percentage reaches 100, and no later negative entry brings
/// the project back.
pub fn append_entry(
    project: &mut Project,
    amount: f64,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<AppendOutcome> {
    if amount == 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }

    let new_balance = project.current_balance + amount;
    let new_percentage =
        progress_percentage(project.initial_capital, project.target_amount, new_balance);

    let mut achieved_thresholds = Vec::new();
    for milestone in &mut project.milestones {
        if !milestone.achieved && new_percentage >= f64::from(milestone.threshold) {
            milestone.achieved = true;
            milestone.achieved_date = Some(date);
            achieved_thresholds.push(milestone.threshold);
        }
    }

    let completed_now = !project.completed && new_percentage >= 100.0;
    if completed_now {
        project.completed = true;
    }

    let entry = ProgressEntry {
        id: uuid::Uuid::new_v4().to_string(),
        date,
        amount,
        balance: new_balance,
        progress_percentage: new_percentage,
    };

    project.progress_history.push(entry.clone());
    project.current_balance = new_balance;
    project.progress_percentage = new_percentage;
    project.last_updated = now;

    Ok(AppendOutcome {
        entry,
        achieved_thresholds,
        completed_now,
    })
}

/// Estimates milestone target dates by dividing the goal window into
/// quarters.
///
/// When the window is unusable (target on or before start), falls back to a
/// default 1/2/3-month-out schedule from `today` instead of failing project
/// creation.
#[must_use]
pub fn milestone_schedule(start: NaiveDate, target: NaiveDate, today: NaiveDate) -> [Milestone; 3] {
    let span_days = (target - start).num_days();
    let target_for = |index: usize| -> NaiveDate {
        if span_days > 0 {
            let quarter = span_days * (index as i64 + 1) / 4;
            start + chrono::Duration::days(quarter)
        } else {
            today
                .checked_add_months(Months::new(index as u32 + 1))
                .unwrap_or(today)
        }
    };

    MILESTONE_THRESHOLDS.map(|threshold| Milestone {
        threshold,
        target_date: target_for(match threshold {
            25 => 0,
            50 => 1,
            _ => 2,
        }),
        achieved: false,
        achieved_date: None,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::{date, sample_project};

    #[test]
    fn test_percentage_rounds_and_clamps() {
        assert_eq!(progress_percentage(1000.0, 500.0, 1125.0), 25.0);
        assert_eq!(progress_percentage(1000.0, 500.0, 1127.0), 25.0);
        assert_eq!(progress_percentage(1000.0, 500.0, 900.0), 0.0);
        assert_eq!(progress_percentage(1000.0, 500.0, 2000.0), 100.0);
        assert_eq!(progress_percentage(1000.0, 0.0, 1500.0), 0.0);
    }

    #[test]
    fn test_append_rejects_bad_amounts() {
        let mut project = sample_project("p1");
        for amount in [0.0, f64::NAN, f64::INFINITY] {
            let result = append_entry(&mut project, amount, date(2025, 6, 1), Utc::now());
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }
        assert!(project.progress_history.is_empty());
    }

    #[test]
    fn test_scenario_a_milestones_and_completion() {
        // initial 1000, target 500; +125 / +125 / +375
        let mut project = sample_project("p1");

        let outcome = append_entry(&mut project, 125.0, date(2025, 6, 1), Utc::now()).unwrap();
        assert_eq!(project.current_balance, 1125.0);
        assert_eq!(project.progress_percentage, 25.0);
        assert_eq!(outcome.achieved_thresholds, vec![25]);
        assert!(!outcome.completed_now);

        let outcome = append_entry(&mut project, 125.0, date(2025, 6, 8), Utc::now()).unwrap();
        assert_eq!(project.current_balance, 1250.0);
        assert_eq!(project.progress_percentage, 50.0);
        assert_eq!(outcome.achieved_thresholds, vec![50]);

        let outcome = append_entry(&mut project, 375.0, date(2025, 6, 15), Utc::now()).unwrap();
        assert_eq!(project.current_balance, 1625.0);
        assert_eq!(project.progress_percentage, 100.0);
        assert_eq!(outcome.achieved_thresholds, vec![75]);
        assert!(outcome.completed_now);
        assert!(project.completed);
    }

    #[test]
    fn test_one_entry_can_stamp_all_milestones() {
        let mut project = sample_project("p1");
        let entry_date = date(2025, 6, 20);

        let outcome = append_entry(&mut project, 450.0, entry_date, Utc::now()).unwrap();
        assert_eq!(outcome.achieved_thresholds, vec![25, 50, 75]);
        for milestone in &project.milestones {
            assert!(milestone.achieved);
            // All stamped with the entry date, not back-dated.
            assert_eq!(milestone.achieved_date, Some(entry_date));
        }
        assert!(!project.completed);
    }

    #[test]
    fn test_milestones_are_monotonic() {
        let mut project = sample_project("p1");
        append_entry(&mut project, 150.0, date(2025, 6, 1), Utc::now()).unwrap();
        assert!(project.milestones[0].achieved);

        // Drop back below 25 percent; the flag must survive.
        append_entry(&mut project, -140.0, date(2025, 6, 2), Utc::now()).unwrap();
        assert_eq!(project.progress_percentage, 2.0);
        assert!(project.milestones[0].achieved);
    }

    #[test]
    fn test_completion_fires_exactly_once() {
        let mut project = sample_project("p1");
        let outcome = append_entry(&mut project, 500.0, date(2025, 6, 1), Utc::now()).unwrap();
        assert!(outcome.completed_now);

        // Still completed after dipping below 100 and crossing again.
        let outcome = append_entry(&mut project, -100.0, date(2025, 6, 2), Utc::now()).unwrap();
        assert!(!outcome.completed_now);
        assert!(project.completed);

        let outcome = append_entry(&mut project, 100.0, date(2025, 6, 3), Utc::now()).unwrap();
        assert!(!outcome.completed_now);
        assert!(project.completed);
    }

    #[test]
    fn test_balance_identity_over_any_sequence() {
        let mut project = sample_project("p1");
        let amounts = [125.0, -50.0, 300.0, -25.0, 10.0];
        for (i, amount) in amounts.iter().enumerate() {
            append_entry(&mut project, *amount, date(2025, 6, i as u32 + 1), Utc::now()).unwrap();
        }
        let total: f64 = amounts.iter().sum();
        assert_eq!(
            project.current_balance,
            project.initial_capital + total
        );
        assert_eq!(project.progress_history.len(), amounts.len());
    }

    #[test]
    fn test_schedule_divides_window_into_quarters() {
        let schedule = milestone_schedule(date(2025, 1, 1), date(2025, 12, 27), date(2025, 1, 1));
        // 360-day window: quarters land 90 days apart.
        assert_eq!(schedule[0].threshold, 25);
        assert_eq!(schedule[0].target_date, date(2025, 4, 1));
        assert_eq!(schedule[1].target_date, date(2025, 6, 30));
        assert_eq!(schedule[2].target_date, date(2025, 9, 28));
        assert!(schedule.iter().all(|m| !m.achieved));
    }

    #[test]
    fn test_schedule_falls_back_on_inverted_window() {
        let today = date(2025, 6, 15);
        let schedule = milestone_schedule(date(2025, 6, 15), date(2025, 6, 1), today);
        assert_eq!(schedule[0].target_date, date(2025, 7, 15));
        assert_eq!(schedule[1].target_date, date(2025, 8, 15));
        assert_eq!(schedule[2].target_date, date(2025, 9, 15));
    }
}
