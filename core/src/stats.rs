//! Daily stats aggregation.
//!
//! Every user action that touches a day's totals (logging water, finishing
//! a focus session) is expressed as an additive [`StatsDelta`]. Deltas form
//! a commutative monoid under addition with the zero delta as identity, so
//! contributions from concurrent sessions can be applied in any order (or
//! pre-summed) and land on the same totals.

use std::ops::Add;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::DailyStats;

/// An additive contribution to one day's stats record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDelta {
    #[serde(default)]
    pub water_ml: i64,
    #[serde(default)]
    pub focus_minutes: i64,
    #[serde(default)]
    pub cycles: i64,
}

impl StatsDelta {
    #[must_use]
    pub fn water(ml: i64) -> Self {
        Self {
            water_ml: ml,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn focus_session(minutes: i64) -> Self {
        Self {
            focus_minutes: minutes,
            cycles: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for StatsDelta {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            water_ml: self.water_ml + rhs.water_ml,
            focus_minutes: self.focus_minutes + rhs.focus_minutes,
            cycles: self.cycles + rhs.cycles,
        }
    }
}

/// Apply a contribution to a day's record, creating a zero record first if
/// none exists yet.
#[must_use]
pub fn merge_contribution(
    existing: Option<&DailyStats>,
    date: NaiveDate,
    delta: StatsDelta,
) -> DailyStats {
    let base = existing.cloned().unwrap_or_else(|| DailyStats::zero(date));
    DailyStats {
        date: base.date,
        water_ml: base.water_ml + delta.water_ml,
        focus_minutes: base.focus_minutes + delta.focus_minutes,
        cycles: base.cycles + delta.cycles,
    }
}

// --- Chart series ---

/// One point in the dashboard's trailing-days series. Days without a stored
/// record appear as zero totals.
#[derive(Debug, Clone, Serialize)]
pub struct DayPoint {
    pub date: NaiveDate,
    pub water_ml: i64,
    pub focus_minutes: i64,
    pub cycles: i64,
}

/// Build a contiguous series covering the `days` calendar days ending at
/// `today`, oldest first, from whatever records exist.
#[must_use]
pub fn day_series(today: NaiveDate, days: u32, records: &[DailyStats]) -> Vec<DayPoint> {
    let mut series = Vec::with_capacity(days as usize);
    for offset in (0..i64::from(days)).rev() {
        let date = today - Duration::days(offset);
        let found = records.iter().find(|r| r.date == date);
        series.push(DayPoint {
            date,
            water_ml: found.map_or(0, |r| r.water_ml),
            focus_minutes: found.map_or(0, |r| r.focus_minutes),
            cycles: found.map_or(0, |r| r.cycles),
        });
    }
    series
}

/// Weekly focus totals for the trailing `weeks` ISO weeks ending with the
/// week containing `today`, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct WeekPoint {
    pub week: String,
    pub start_date: NaiveDate,
    pub water_ml: i64,
    pub focus_minutes: i64,
    pub cycles: i64,
}

#[must_use]
pub fn week_series(today: NaiveDate, weeks: u32, records: &[DailyStats]) -> Vec<WeekPoint> {
    let current_week_start = week_start(today);
    let mut series = Vec::with_capacity(weeks as usize);

    for offset in (0..i64::from(weeks)).rev() {
        let start = current_week_start - Duration::weeks(offset);
        let end = start + Duration::days(6);

        let mut total = StatsDelta::default();
        for r in records.iter().filter(|r| r.date >= start && r.date <= end) {
            total = total
                + StatsDelta {
                    water_ml: r.water_ml,
                    focus_minutes: r.focus_minutes,
                    cycles: r.cycles,
                };
        }

        series.push(WeekPoint {
            week: week_label(start),
            start_date: start,
            water_ml: total.water_ml,
            focus_minutes: total.focus_minutes,
            cycles: total.cycles,
        });
    }
    series
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_merge_absent_with_empty_delta_is_zero_record() {
        let merged = merge_contribution(None, d("2024-06-15"), StatsDelta::default());
        assert_eq!(merged.date, d("2024-06-15"));
        assert_eq!(merged.water_ml, 0);
        assert_eq!(merged.focus_minutes, 0);
        assert_eq!(merged.cycles, 0);
    }

    #[test]
    fn test_merge_creates_record_lazily() {
        let merged = merge_contribution(None, d("2024-06-15"), StatsDelta::water(250));
        assert_eq!(merged.water_ml, 250);
        assert_eq!(merged.focus_minutes, 0);
    }

    #[test]
    fn test_merge_adds_fields_independently() {
        let existing = DailyStats {
            date: d("2024-06-15"),
            water_ml: 500,
            focus_minutes: 25,
            cycles: 1,
        };
        let merged = merge_contribution(
            Some(&existing),
            d("2024-06-15"),
            StatsDelta::focus_session(25),
        );
        assert_eq!(merged.water_ml, 500);
        assert_eq!(merged.focus_minutes, 50);
        assert_eq!(merged.cycles, 2);
    }

    #[test]
    fn test_merge_is_associative() {
        let date = d("2024-06-15");
        let base = DailyStats {
            date,
            water_ml: 100,
            focus_minutes: 10,
            cycles: 1,
        };
        let d1 = StatsDelta::water(250);
        let d2 = StatsDelta::focus_session(25);

        let sequential =
            merge_contribution(Some(&merge_contribution(Some(&base), date, d1)), date, d2);
        let pre_summed = merge_contribution(Some(&base), date, d1 + d2);

        assert_eq!(sequential.water_ml, pre_summed.water_ml);
        assert_eq!(sequential.focus_minutes, pre_summed.focus_minutes);
        assert_eq!(sequential.cycles, pre_summed.cycles);
    }

    #[test]
    fn test_merge_is_commutative() {
        let date = d("2024-06-15");
        let d1 = StatsDelta::water(300);
        let d2 = StatsDelta::focus_session(25);

        let ab = merge_contribution(Some(&merge_contribution(None, date, d1)), date, d2);
        let ba = merge_contribution(Some(&merge_contribution(None, date, d2)), date, d1);

        assert_eq!(ab.water_ml, ba.water_ml);
        assert_eq!(ab.focus_minutes, ba.focus_minutes);
        assert_eq!(ab.cycles, ba.cycles);
    }

    #[test]
    fn test_zero_delta_is_identity() {
        let existing = DailyStats {
            date: d("2024-06-15"),
            water_ml: 750,
            focus_minutes: 50,
            cycles: 2,
        };
        let merged = merge_contribution(Some(&existing), existing.date, StatsDelta::default());
        assert_eq!(merged.water_ml, existing.water_ml);
        assert_eq!(merged.focus_minutes, existing.focus_minutes);
        assert_eq!(merged.cycles, existing.cycles);
    }

    #[test]
    fn test_delta_addition() {
        let sum = StatsDelta::water(200) + StatsDelta::focus_session(25) + StatsDelta::water(300);
        assert_eq!(sum.water_ml, 500);
        assert_eq!(sum.focus_minutes, 25);
        assert_eq!(sum.cycles, 1);
    }

    #[test]
    fn test_day_series_fills_missing_days_with_zero() {
        let records = vec![DailyStats {
            date: d("2024-06-14"),
            water_ml: 500,
            focus_minutes: 25,
            cycles: 1,
        }];
        let series = day_series(d("2024-06-15"), 7, &records);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, d("2024-06-09"));
        assert_eq!(series[6].date, d("2024-06-15"));
        assert_eq!(series[5].water_ml, 500);
        assert_eq!(series[6].water_ml, 0);
    }

    #[test]
    fn test_week_series_buckets_by_iso_week() {
        // 2024-06-15 is a Saturday; its week starts Monday 2024-06-10.
        let records = vec![
            DailyStats {
                date: d("2024-06-10"),
                water_ml: 100,
                focus_minutes: 25,
                cycles: 1,
            },
            DailyStats {
                date: d("2024-06-05"),
                water_ml: 200,
                focus_minutes: 50,
                cycles: 2,
            },
        ];
        let series = week_series(d("2024-06-15"), 2, &records);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].start_date, d("2024-06-03"));
        assert_eq!(series[0].focus_minutes, 50);
        assert_eq!(series[1].start_date, d("2024-06-10"));
        assert_eq!(series[1].focus_minutes, 25);
        assert_eq!(series[1].week, "2024-W24");
    }
}
