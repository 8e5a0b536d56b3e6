use std::collections::BTreeSet;

use anyhow::{Result, bail};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// Field limits mirror what the dashboard UI enforces client-side.
pub const MAX_TASK_LEN: usize = 200;
pub const MAX_NOTE_LEN: usize = 2000;
pub const MAX_GOAL_LEN: usize = 100;
pub const MAX_HABIT_LEN: usize = 50;
pub const MAX_ITEM_LEN: usize = 100;
pub const MAX_EVENT_LEN: usize = 100;
pub const MAX_TX_DESC_LEN: usize = 200;

pub const MIN_WEIGHT_KG: f64 = 30.0;
pub const MAX_WEIGHT_KG: f64 = 200.0;
pub const MIN_WATER_ML: i64 = 50;
pub const MAX_WATER_ML: i64 = 5000;
/// Daily water goal per kilogram of body weight.
pub const WATER_ML_PER_KG: f64 = 35.0;
/// Fallback goal when no body weight has been recorded.
pub const DEFAULT_WATER_GOAL_ML: i64 = 2500;

pub const PRIORITIES: &[&str] = &["low", "medium", "high"];
pub const GOAL_PERIODS: &[&str] = &["weekly", "monthly", "yearly"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub text: String,
    pub priority: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub task_id: i64,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub bought: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub description: String,
    /// Positive = income, negative = expense.
    pub amount: f64,
    pub date: NaiveDate,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    /// Calendar days on which the habit was marked done. The streak is
    /// always derived from this set; the stored value is a cache.
    pub completed_dates: BTreeSet<NaiveDate>,
    pub streak: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<NaiveDate>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub period: String,
    pub progress: i64,
    pub completed: bool,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    #[serde(default)]
    pub uuid: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub created_at: String,
}

/// Per-date aggregate of water intake, focus minutes, and completed focus
/// cycles. Created lazily on first contribution, never deleted, and only
/// ever updated by additive merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub water_ml: i64,
    pub focus_minutes: i64,
    pub cycles: i64,
}

impl DailyStats {
    #[must_use]
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            water_ml: 0,
            focus_minutes: 0,
            cycles: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    pub water_goal_ml: i64,
}

// --- Input types ---

#[derive(Debug, Clone)]
pub struct NewTask {
    pub text: String,
    pub priority: String,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub title: String,
    pub description: String,
    pub period: String,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<String>,
}

// --- Projection types ---

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSummary {
    pub income: f64,
    pub expense: f64,
    pub net: f64,
}

/// Per-date dashboard aggregate handed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub tasks_done: i64,
    pub tasks_total: i64,
    pub habits_done: i64,
    pub habits_total: i64,
    pub water_ml: i64,
    pub water_goal_ml: i64,
    pub focus_minutes: i64,
    pub cycles: i64,
    pub net_balance: f64,
    pub events_today: i64,
}

// --- Export / Import types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub version: i64,
    pub exported_at: String,
    pub tasks: Vec<Task>,
    pub subtasks: Vec<Subtask>,
    pub shopping: Vec<ShoppingItem>,
    pub transactions: Vec<Transaction>,
    pub notes: Vec<Note>,
    pub habits: Vec<Habit>,
    pub goals: Vec<Goal>,
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub daily_stats: Vec<DailyStats>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<SettingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct ImportSummary {
    pub tasks_imported: i64,
    pub subtasks_imported: i64,
    pub shopping_imported: i64,
    pub transactions_imported: i64,
    pub notes_imported: i64,
    pub habits_imported: i64,
    pub goals_imported: i64,
    pub events_imported: i64,
    pub daily_stats_merged: i64,
    pub settings_imported: i64,
}

// --- Validation ---

/// Validate free text: trimmed, non-empty, at most `max` characters.
/// Returns the trimmed value that should be persisted.
pub fn validate_text(label: &str, text: &str, max: usize) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("{label} must not be empty");
    }
    if trimmed.chars().count() > max {
        bail!("{label} too long (maximum {max} characters)");
    }
    Ok(trimmed.to_string())
}

pub fn validate_priority(priority: &str) -> Result<String> {
    let lower = priority.to_lowercase();
    if PRIORITIES.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid priority '{priority}'. Must be one of: {}",
            PRIORITIES.join(", ")
        )
    }
}

pub fn validate_goal_period(period: &str) -> Result<String> {
    let lower = period.to_lowercase();
    if GOAL_PERIODS.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        bail!(
            "Invalid goal period '{period}'. Must be one of: {}",
            GOAL_PERIODS.join(", ")
        )
    }
}

pub fn validate_weight(weight_kg: f64) -> Result<()> {
    if !weight_kg.is_finite() {
        bail!("Weight must be a number");
    }
    if !(MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&weight_kg) {
        bail!("Weight must be between {MIN_WEIGHT_KG:.0} and {MAX_WEIGHT_KG:.0} kg");
    }
    Ok(())
}

pub fn validate_water_amount(ml: i64) -> Result<()> {
    if !(MIN_WATER_ML..=MAX_WATER_ML).contains(&ml) {
        bail!("Water amount must be between {MIN_WATER_ML} and {MAX_WATER_ML} ml");
    }
    Ok(())
}

pub fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() {
        bail!("Amount must be a number");
    }
    if amount == 0.0 {
        bail!("Amount must not be zero");
    }
    Ok(())
}

/// Validate an optional event time in 24h `HH:MM` form. Returns the
/// normalized string, or `None` when no time was given.
pub fn validate_event_time(time: Option<&str>) -> Result<Option<String>> {
    match time {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => {
            let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
                .map_err(|_| anyhow::anyhow!("Invalid time '{s}'. Use HH:MM (24h)"))?;
            Ok(Some(t.format("%H:%M").to_string()))
        }
    }
}

/// Goal progress is clamped rather than rejected, matching the dashboard's
/// slider behavior.
#[must_use]
pub fn clamp_progress(progress: i64) -> i64 {
    progress.clamp(0, 100)
}

/// Daily water goal in milliliters derived from body weight, or the default
/// goal when no weight has been recorded.
#[must_use]
pub fn water_goal_ml(weight_kg: Option<f64>) -> i64 {
    match weight_kg {
        Some(kg) => (kg * WATER_ML_PER_KG).round() as i64,
        None => DEFAULT_WATER_GOAL_ML,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text_trims() {
        assert_eq!(
            validate_text("Task", "  buy milk  ", 200).unwrap(),
            "buy milk"
        );
    }

    #[test]
    fn test_validate_text_empty() {
        assert!(validate_text("Task", "", 200).is_err());
        assert!(validate_text("Task", "   ", 200).is_err());
    }

    #[test]
    fn test_validate_text_too_long() {
        let long = "x".repeat(201);
        assert!(validate_text("Task", &long, 200).is_err());
        let exact = "x".repeat(200);
        assert!(validate_text("Task", &exact, 200).is_ok());
    }

    #[test]
    fn test_validate_text_counts_chars_not_bytes() {
        // 50 multi-byte characters should pass a 50-char limit
        let s = "日".repeat(50);
        assert!(validate_text("Habit", &s, 50).is_ok());
    }

    #[test]
    fn test_valid_priorities() {
        assert_eq!(validate_priority("low").unwrap(), "low");
        assert_eq!(validate_priority("Medium").unwrap(), "medium");
        assert_eq!(validate_priority("HIGH").unwrap(), "high");
    }

    #[test]
    fn test_invalid_priority() {
        assert!(validate_priority("urgent").is_err());
        assert!(validate_priority("").is_err());
    }

    #[test]
    fn test_valid_goal_periods() {
        assert_eq!(validate_goal_period("weekly").unwrap(), "weekly");
        assert_eq!(validate_goal_period("Monthly").unwrap(), "monthly");
        assert_eq!(validate_goal_period("YEARLY").unwrap(), "yearly");
    }

    #[test]
    fn test_invalid_goal_period() {
        assert!(validate_goal_period("daily").is_err());
    }

    #[test]
    fn test_validate_weight_bounds() {
        assert!(validate_weight(70.0).is_ok());
        assert!(validate_weight(30.0).is_ok());
        assert!(validate_weight(200.0).is_ok());
        assert!(validate_weight(29.9).is_err());
        assert!(validate_weight(200.1).is_err());
        assert!(validate_weight(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_water_amount_bounds() {
        assert!(validate_water_amount(250).is_ok());
        assert!(validate_water_amount(50).is_ok());
        assert!(validate_water_amount(5000).is_ok());
        assert!(validate_water_amount(49).is_err());
        assert!(validate_water_amount(5001).is_err());
        assert!(validate_water_amount(-100).is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(12.5).is_ok());
        assert!(validate_amount(-40.0).is_ok());
        assert!(validate_amount(0.0).is_err());
        assert!(validate_amount(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_event_time() {
        assert_eq!(
            validate_event_time(Some("09:30")).unwrap(),
            Some("09:30".to_string())
        );
        assert_eq!(validate_event_time(None).unwrap(), None);
        assert_eq!(validate_event_time(Some("  ")).unwrap(), None);
        assert!(validate_event_time(Some("25:00")).is_err());
        assert!(validate_event_time(Some("9am")).is_err());
    }

    #[test]
    fn test_clamp_progress() {
        assert_eq!(clamp_progress(50), 50);
        assert_eq!(clamp_progress(-10), 0);
        assert_eq!(clamp_progress(150), 100);
    }

    #[test]
    fn test_water_goal_from_weight() {
        // 70 kg * 35 ml = 2450 ml
        assert_eq!(water_goal_ml(Some(70.0)), 2450);
        assert_eq!(water_goal_ml(Some(80.0)), 2800);
    }

    #[test]
    fn test_water_goal_default() {
        assert_eq!(water_goal_ml(None), DEFAULT_WATER_GOAL_ML);
    }
}
