//! Habit streak computation.
//!
//! A streak is the count of consecutive calendar days, ending at a
//! reference day and walking backward, on which a habit was marked done.
//! The reference day is caller-supplied so the computation stays pure and
//! testable across time zones.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

/// Count consecutive completed days ending at `as_of`.
///
/// Walks backward one calendar day at a time and stops at the first day
/// missing from the set; a missing `as_of` itself yields 0. Dates after
/// `as_of` never extend or break the run.
#[must_use]
pub fn compute_streak(dates: &BTreeSet<NaiveDate>, as_of: NaiveDate) -> i64 {
    let mut streak = 0;
    let mut cursor = as_of;
    while dates.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Flip membership of `day` in the completed set, returning the new set and
/// the streak freshly derived from it.
///
/// The streak is recomputed from scratch on every toggle; no incremental
/// counter is kept, so toggling twice restores the prior state exactly.
#[must_use]
pub fn toggle_date(dates: &BTreeSet<NaiveDate>, day: NaiveDate) -> (BTreeSet<NaiveDate>, i64) {
    let mut updated = dates.clone();
    if !updated.remove(&day) {
        updated.insert(day);
    }
    let streak = compute_streak(&updated, day);
    (updated, streak)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn set(days: &[&str]) -> BTreeSet<NaiveDate> {
        days.iter().map(|s| d(s)).collect()
    }

    #[test]
    fn test_empty_set_is_zero() {
        assert_eq!(compute_streak(&BTreeSet::new(), d("2024-01-03")), 0);
    }

    #[test]
    fn test_only_today_is_one() {
        assert_eq!(compute_streak(&set(&["2024-01-03"]), d("2024-01-03")), 1);
    }

    #[test]
    fn test_three_consecutive_days() {
        let dates = set(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(compute_streak(&dates, d("2024-01-03")), 3);
    }

    #[test]
    fn test_gap_breaks_streak() {
        let dates = set(&["2024-01-01", "2024-01-03"]);
        assert_eq!(compute_streak(&dates, d("2024-01-03")), 1);
    }

    #[test]
    fn test_today_absent_is_zero_even_with_history() {
        // Yesterday and the day before are done, but today is not.
        let dates = set(&["2024-01-01", "2024-01-02"]);
        assert_eq!(compute_streak(&dates, d("2024-01-03")), 0);
    }

    #[test]
    fn test_streak_is_run_ending_at_as_of_not_longest() {
        // A longer run exists earlier in the month.
        let dates = set(&[
            "2024-01-01",
            "2024-01-02",
            "2024-01-03",
            "2024-01-04",
            "2024-01-09",
            "2024-01-10",
        ]);
        assert_eq!(compute_streak(&dates, d("2024-01-10")), 2);
    }

    #[test]
    fn test_future_dates_ignored() {
        let dates = set(&["2024-01-02", "2024-01-03", "2024-01-05"]);
        assert_eq!(compute_streak(&dates, d("2024-01-03")), 2);
    }

    #[test]
    fn test_future_dates_do_not_rescue_broken_streak() {
        let dates = set(&["2024-01-05"]);
        assert_eq!(compute_streak(&dates, d("2024-01-03")), 0);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let dates = set(&["2024-01-31", "2024-02-01", "2024-02-02"]);
        assert_eq!(compute_streak(&dates, d("2024-02-02")), 3);
    }

    #[test]
    fn test_toggle_marks_today() {
        let (dates, streak) = toggle_date(&set(&["2024-01-02"]), d("2024-01-03"));
        assert!(dates.contains(&d("2024-01-03")));
        assert_eq!(streak, 2);
    }

    #[test]
    fn test_toggle_unmarks_today() {
        let initial = set(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let (dates, streak) = toggle_date(&initial, d("2024-01-03"));
        assert!(!dates.contains(&d("2024-01-03")));
        // Today absent breaks the streak even though yesterday is present.
        assert_eq!(streak, 0);
    }

    #[test]
    fn test_double_toggle_restores_prior_state() {
        let initial = set(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let today = d("2024-01-03");
        let before = compute_streak(&initial, today);

        let (once, _) = toggle_date(&initial, today);
        let (twice, streak) = toggle_date(&once, today);

        assert_eq!(twice, initial);
        assert_eq!(streak, before);
    }

    #[test]
    fn test_double_toggle_from_empty() {
        let today = d("2024-01-03");
        let (once, s1) = toggle_date(&BTreeSet::new(), today);
        assert_eq!(s1, 1);
        let (twice, s2) = toggle_date(&once, today);
        assert!(twice.is_empty());
        assert_eq!(s2, 0);
    }
}
