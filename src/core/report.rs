//! Report derivation - monthly aggregates and capital distribution.
//!
//! All functions here take slices of projects and return structured data for
//! the presentation layer to format. Nothing touches the cache or the remote
//! store.

use crate::models::{Category, GoalFrequency, Project};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// Fixed weekly-to-monthly proration factor.
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Profit and goal figures for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    /// Calendar year
    pub year: i32,
    /// Calendar month (1-12)
    pub month: u32,
    /// Sum of progress-entry amounts dated within the month
    pub profit: f64,
    /// Prorated contribution goal across projects active in the month
    pub goal: f64,
}

/// Aggregates profit and goal figures for the trailing `months_back` calendar
/// months, inclusive of the month containing `today`, oldest first.
///
/// Profit sums every progress entry dated within the month, across all
/// projects. The goal figure prorates each project's configured cadence for
/// months overlapping its `[start_date, target_date]` window: daily cadence
/// times actual days in the month, weekly times [`WEEKS_PER_MONTH`], monthly
/// used flat.
#[must_use]
pub fn monthly_aggregate(
    projects: &[Project],
    months_back: u32,
    today: NaiveDate,
) -> Vec<MonthlySummary> {
    let mut summaries = Vec::new();

    for back in (0..months_back).rev() {
        let (year, month) = shift_month(today.year(), today.month(), back);
        let Some(month_start) = NaiveDate::from_ymd_opt(year, month, 1) else {
            continue;
        };
        let days = days_in_month(year, month);
        let month_end = month_start + chrono::Duration::days(i64::from(days) - 1);

        let mut profit = 0.0;
        let mut goal = 0.0;
        for project in projects {
            profit += project
                .progress_history
                .iter()
                .filter(|entry| entry.date >= month_start && entry.date <= month_end)
                .map(|entry| entry.amount)
                .sum::<f64>();

            let overlaps =
                project.start_date <= month_end && project.target_date >= month_start;
            if overlaps {
                goal += match project.goal_frequency {
                    GoalFrequency::Daily => project.goal_amount * f64::from(days),
                    GoalFrequency::Weekly => project.goal_amount * WEEKS_PER_MONTH,
                    GoalFrequency::Monthly => project.goal_amount,
                };
            }
        }

        summaries.push(MonthlySummary {
            year,
            month,
            profit,
            goal,
        });
    }

    summaries
}

/// Sums `initial_capital` by category. Categories with a zero total are
/// omitted from the result.
#[must_use]
pub fn type_distribution(projects: &[Project]) -> BTreeMap<Category, f64> {
    let mut totals: BTreeMap<Category, f64> = BTreeMap::new();
    for project in projects {
        *totals.entry(project.category).or_insert(0.0) += project.initial_capital;
    }
    totals.retain(|_, total| *total != 0.0);
    totals
}

/// Shifts a (year, month) pair `back` months into the past.
fn shift_month(year: i32, month: u32, back: u32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 - back as i32;
    (index.div_euclid(12), (index.rem_euclid(12) + 1) as u32)
}

/// Number of days in a calendar month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (NaiveDate::from_ymd_opt(year, month, 1), next) {
        (Some(start), Some(end)) => (end - start).num_days() as u32,
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::progress::append_entry;
    use crate::test_utils::{date, sample_project};
    use chrono::Utc;

    #[test]
    fn test_shift_month_crosses_year_boundary() {
        assert_eq!(shift_month(2025, 2, 0), (2025, 2));
        assert_eq!(shift_month(2025, 2, 1), (2025, 1));
        assert_eq!(shift_month(2025, 2, 2), (2024, 12));
        assert_eq!(shift_month(2025, 2, 14), (2023, 12));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2025, 6), 30);
        assert_eq!(days_in_month(2025, 12), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
    }

    #[test]
    fn test_scenario_c_goal_proration() {
        // June 2025 has 30 days; both projects span the whole month.
        let mut monthly = sample_project("monthly");
        monthly.goal_frequency = GoalFrequency::Monthly;
        monthly.goal_amount = 200.0;

        let mut daily = sample_project("daily");
        daily.goal_frequency = GoalFrequency::Daily;
        daily.goal_amount = 10.0;

        let today = date(2025, 6, 20);

        let summaries = monthly_aggregate(&[monthly], 1, today);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].goal, 200.0);

        let summaries = monthly_aggregate(&[daily], 1, today);
        assert_eq!(summaries[0].goal, 300.0);
    }

    #[test]
    fn test_weekly_goal_uses_fixed_factor() {
        let mut project = sample_project("weekly");
        project.goal_frequency = GoalFrequency::Weekly;
        project.goal_amount = 100.0;

        let summaries = monthly_aggregate(&[project], 1, date(2025, 6, 20));
        assert!((summaries[0].goal - 100.0 * WEEKS_PER_MONTH).abs() < 1e-9);
    }

    #[test]
    fn test_goal_skips_months_outside_project_window() {
        // Project window covers June only; May gets no goal figure.
        let mut project = sample_project("p1");
        project.start_date = date(2025, 6, 1);
        project.target_date = date(2025, 6, 30);

        let summaries = monthly_aggregate(&[project], 2, date(2025, 6, 20));
        assert_eq!(summaries.len(), 2);
        assert_eq!((summaries[0].year, summaries[0].month), (2025, 5));
        assert_eq!(summaries[0].goal, 0.0);
        assert!(summaries[1].goal > 0.0);
    }

    #[test]
    fn test_profit_sums_entries_per_month() {
        let mut project = sample_project("p1");
        append_entry(&mut project, 100.0, date(2025, 5, 30), Utc::now()).unwrap();
        append_entry(&mut project, 40.0, date(2025, 6, 2), Utc::now()).unwrap();
        append_entry(&mut project, -15.0, date(2025, 6, 20), Utc::now()).unwrap();

        let summaries = monthly_aggregate(&[project], 2, date(2025, 6, 25));
        assert_eq!(summaries[0].profit, 100.0);
        assert_eq!(summaries[1].profit, 25.0);
    }

    #[test]
    fn test_distribution_sums_and_omits_zero_categories() {
        let mut savings = sample_project("a");
        savings.category = Category::Savings;
        savings.initial_capital = 1000.0;

        let mut savings2 = sample_project("b");
        savings2.category = Category::Savings;
        savings2.initial_capital = 500.0;

        let mut empty = sample_project("c");
        empty.category = Category::Purchase;
        empty.initial_capital = 0.0;

        let totals = type_distribution(&[savings, savings2, empty]);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[&Category::Savings], 1500.0);
        assert!(!totals.contains_key(&Category::Purchase));
    }
}
