//! Session service.
//!
//! One `CadenceService` is the session context for everything: it owns the
//! store, the snapshot feed, and the profile id, and every mutation flows
//! through the same path (validate, persist, re-derive, republish).
//! Consumers render only from feed snapshots, so a failed mutation leaves
//! visible state untouched.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};

use crate::db::Database;
use crate::feed::SnapshotFeed;
use crate::models::{
    BalanceSummary, DaySummary, Event, ExportData, Goal, Habit, ImportSummary, MAX_EVENT_LEN,
    MAX_GOAL_LEN, MAX_HABIT_LEN, MAX_ITEM_LEN, MAX_NOTE_LEN, MAX_TASK_LEN, MAX_TX_DESC_LEN,
    NewEvent, NewGoal, NewTask, NewTransaction, Note, ShoppingItem, Subtask, Task, Transaction,
    UserSettings, validate_amount, validate_event_time, validate_goal_period, validate_priority,
    validate_text, validate_water_amount, validate_weight, water_goal_ml,
};
use crate::stats::{DayPoint, StatsDelta, WeekPoint, day_series, week_series};

type EntityKey = (&'static str, i64);

pub struct CadenceService {
    db: Mutex<Database>,
    feed: SnapshotFeed,
    profile_id: String,
    in_flight: Mutex<HashSet<EntityKey>>,
}

/// Marks one entity as having a mutation outstanding; cleared on drop so an
/// early `?` return can't leave the entity wedged.
struct InFlight<'a> {
    service: &'a CadenceService,
    key: EntityKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.service
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

impl CadenceService {
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_db(Database::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_db(Database::open_in_memory()?)
    }

    fn from_db(db: Database) -> Result<Self> {
        let profile_id = db.get_or_create_profile_id()?;
        Ok(Self {
            db: Mutex::new(db),
            feed: SnapshotFeed::new(),
            profile_id,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Opaque id scoping this session's data.
    #[must_use]
    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    #[must_use]
    pub fn feed(&self) -> &SnapshotFeed {
        &self.feed
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reject a second mutation on the same entity while one is still
    /// outstanding; derived fields are recomputed per-mutation and must not
    /// interleave.
    fn begin(&self, kind: &'static str, id: i64) -> Result<InFlight<'_>> {
        let mut set = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !set.insert((kind, id)) {
            bail!("Another update to {kind} {id} is still in flight");
        }
        Ok(InFlight {
            service: self,
            key: (kind, id),
        })
    }

    // --- Tasks ---

    pub fn add_task(&self, text: &str, priority: &str) -> Result<Task> {
        let text = validate_text("Task", text, MAX_TASK_LEN)?;
        let priority = validate_priority(priority)?;
        let task = self.db().insert_task(&NewTask { text, priority })?;
        self.republish_tasks()?;
        Ok(task)
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.db().list_tasks()
    }

    pub fn toggle_task(&self, id: i64) -> Result<Task> {
        let _guard = self.begin("task", id)?;
        let task = {
            let db = self.db();
            let current = db.get_task(id)?;
            db.set_task_completed(id, !current.completed)?
        };
        self.republish_tasks()?;
        Ok(task)
    }

    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_task(id)?;
        if deleted {
            self.republish_tasks()?;
        }
        Ok(deleted)
    }

    pub fn add_subtask(&self, task_id: i64, text: &str) -> Result<Subtask> {
        let text = validate_text("Subtask", text, MAX_TASK_LEN)?;
        let subtask = self.db().insert_subtask(task_id, &text)?;
        self.republish_tasks()?;
        Ok(subtask)
    }

    pub fn subtasks(&self, task_id: i64) -> Result<Vec<Subtask>> {
        self.db().list_subtasks(task_id)
    }

    pub fn toggle_subtask(&self, id: i64) -> Result<Subtask> {
        let _guard = self.begin("subtask", id)?;
        let subtask = {
            let db = self.db();
            let current = db.get_subtask(id)?;
            db.set_subtask_completed(id, !current.completed)?
        };
        self.republish_tasks()?;
        Ok(subtask)
    }

    pub fn delete_subtask(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_subtask(id)?;
        if deleted {
            self.republish_tasks()?;
        }
        Ok(deleted)
    }

    // --- Shopping ---

    pub fn add_shopping_item(&self, name: &str) -> Result<ShoppingItem> {
        let name = validate_text("Item", name, MAX_ITEM_LEN)?;
        let item = self.db().insert_shopping_item(&name)?;
        self.republish_shopping()?;
        Ok(item)
    }

    pub fn shopping_items(&self) -> Result<Vec<ShoppingItem>> {
        self.db().list_shopping_items()
    }

    pub fn toggle_shopping_item(&self, id: i64) -> Result<ShoppingItem> {
        let _guard = self.begin("item", id)?;
        let item = {
            let db = self.db();
            let current = db.get_shopping_item(id)?;
            db.set_item_bought(id, !current.bought)?
        };
        self.republish_shopping()?;
        Ok(item)
    }

    pub fn delete_shopping_item(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_shopping_item(id)?;
        if deleted {
            self.republish_shopping()?;
        }
        Ok(deleted)
    }

    pub fn clear_bought_items(&self) -> Result<i64> {
        let cleared = self.db().clear_bought_items()?;
        if cleared > 0 {
            self.republish_shopping()?;
        }
        Ok(cleared)
    }

    // --- Finance ---

    pub fn add_transaction(
        &self,
        description: &str,
        amount: f64,
        date: NaiveDate,
    ) -> Result<Transaction> {
        let description = validate_text("Description", description, MAX_TX_DESC_LEN)?;
        validate_amount(amount)?;
        let tx = self.db().insert_transaction(&NewTransaction {
            description,
            amount,
            date,
        })?;
        self.republish_transactions()?;
        Ok(tx)
    }

    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        self.db().list_transactions()
    }

    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_transaction(id)?;
        if deleted {
            self.republish_transactions()?;
        }
        Ok(deleted)
    }

    pub fn balance(&self) -> Result<BalanceSummary> {
        self.db().balance_summary()
    }

    // --- Notes ---

    pub fn add_note(&self, content: &str) -> Result<Note> {
        let content = validate_text("Note", content, MAX_NOTE_LEN)?;
        let note = self.db().insert_note(&content)?;
        self.republish_notes()?;
        Ok(note)
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        self.db().list_notes()
    }

    pub fn delete_note(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_note(id)?;
        if deleted {
            self.republish_notes()?;
        }
        Ok(deleted)
    }

    // --- Habits ---

    pub fn add_habit(&self, name: &str) -> Result<Habit> {
        let name = validate_text("Habit", name, MAX_HABIT_LEN)?;
        let habit = self.db().insert_habit(&name)?;
        self.republish_habits()?;
        Ok(habit)
    }

    /// Habits with streaks re-derived as of today, so a list rendered the
    /// morning after a missed day doesn't show yesterday's cached streak.
    pub fn habits(&self) -> Result<Vec<Habit>> {
        self.db().refresh_streaks(self.today())
    }

    pub fn toggle_habit_today(&self, id: i64) -> Result<Habit> {
        let _guard = self.begin("habit", id)?;
        let habit = self.db().toggle_habit(id, self.today())?;
        self.republish_habits()?;
        Ok(habit)
    }

    /// Toggle against an explicit date. The streak invariant is relative to
    /// the caller's calendar day, so tests and backfills pass it in.
    pub fn toggle_habit_on(&self, id: i64, date: NaiveDate) -> Result<Habit> {
        let _guard = self.begin("habit", id)?;
        let habit = self.db().toggle_habit(id, date)?;
        self.republish_habits()?;
        Ok(habit)
    }

    pub fn delete_habit(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_habit(id)?;
        if deleted {
            self.republish_habits()?;
        }
        Ok(deleted)
    }

    // --- Goals ---

    pub fn add_goal(&self, title: &str, description: &str, period: &str) -> Result<Goal> {
        let title = validate_text("Goal", title, MAX_GOAL_LEN)?;
        let period = validate_goal_period(period)?;
        let goal = self.db().insert_goal(&NewGoal {
            title,
            description: description.trim().to_string(),
            period,
        })?;
        self.republish_goals()?;
        Ok(goal)
    }

    pub fn goals(&self) -> Result<Vec<Goal>> {
        self.db().list_goals()
    }

    pub fn set_goal_progress(&self, id: i64, progress: i64) -> Result<Goal> {
        let _guard = self.begin("goal", id)?;
        let goal = self.db().set_goal_progress(id, progress)?;
        self.republish_goals()?;
        Ok(goal)
    }

    pub fn delete_goal(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_goal(id)?;
        if deleted {
            self.republish_goals()?;
        }
        Ok(deleted)
    }

    // --- Events ---

    pub fn add_event(&self, title: &str, date: NaiveDate, time: Option<&str>) -> Result<Event> {
        let title = validate_text("Event", title, MAX_EVENT_LEN)?;
        let time = validate_event_time(time)?;
        let event = self.db().insert_event(&NewEvent { title, date, time })?;
        self.republish_events()?;
        Ok(event)
    }

    pub fn events(&self) -> Result<Vec<Event>> {
        self.db().list_events()
    }

    pub fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Event>> {
        self.db().events_between(start, end)
    }

    pub fn upcoming_events(&self, limit: i64) -> Result<Vec<Event>> {
        self.db().upcoming_events(self.today(), limit)
    }

    pub fn delete_event(&self, id: i64) -> Result<bool> {
        let deleted = self.db().delete_event(id)?;
        if deleted {
            self.republish_events()?;
        }
        Ok(deleted)
    }

    // --- Daily stats ---

    pub fn log_water(&self, ml: i64, date: NaiveDate) -> Result<crate::models::DailyStats> {
        validate_water_amount(ml)?;
        let stats = self.db().apply_stats_delta(date, &StatsDelta::water(ml))?;
        self.feed.publish_stats(Some(stats.clone()));
        Ok(stats)
    }

    /// Apply a completed focus session's contribution. Called exactly once
    /// per finished countdown by whatever drives the timer.
    pub fn record_focus_session(
        &self,
        delta: StatsDelta,
        date: NaiveDate,
    ) -> Result<crate::models::DailyStats> {
        if delta.is_zero() {
            bail!("Focus contribution must not be empty");
        }
        let stats = self.db().apply_stats_delta(date, &delta)?;
        self.feed.publish_stats(Some(stats.clone()));
        Ok(stats)
    }

    pub fn daily_stats(&self, date: NaiveDate) -> Result<Option<crate::models::DailyStats>> {
        self.db().get_daily_stats(date)
    }

    pub fn day_series(&self, days: u32) -> Result<Vec<DayPoint>> {
        let today = self.today();
        let start = today - chrono::Duration::days(i64::from(days).saturating_sub(1));
        let records = self.db().stats_between(start, today)?;
        Ok(day_series(today, days, &records))
    }

    pub fn week_series(&self, weeks: u32) -> Result<Vec<WeekPoint>> {
        let today = self.today();
        let start = today - chrono::Duration::weeks(i64::from(weeks));
        let records = self.db().stats_between(start, today)?;
        Ok(week_series(today, weeks, &records))
    }

    // --- Settings ---

    pub fn set_weight(&self, weight_kg: f64) -> Result<UserSettings> {
        validate_weight(weight_kg)?;
        self.db().set_setting("weight_kg", &weight_kg.to_string())?;
        self.settings()
    }

    pub fn settings(&self) -> Result<UserSettings> {
        let weight_kg = self
            .db()
            .get_setting("weight_kg")?
            .and_then(|v| v.parse::<f64>().ok());
        Ok(UserSettings {
            weight_kg,
            water_goal_ml: water_goal_ml(weight_kg),
        })
    }

    // --- Summary ---

    pub fn day_summary(&self, date: NaiveDate) -> Result<DaySummary> {
        self.db().build_day_summary(date)
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        self.db().export_all()
    }

    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        let summary = self.db().import_all(data)?;
        // Everything may have changed; push fresh snapshots to all views.
        self.republish_tasks()?;
        self.republish_shopping()?;
        self.republish_transactions()?;
        self.republish_notes()?;
        self.republish_habits()?;
        self.republish_goals()?;
        self.republish_events()?;
        let today = self.today();
        let stats = self.db().get_daily_stats(today)?;
        self.feed.publish_stats(stats);
        Ok(summary)
    }

    // --- Feed republishing ---

    fn republish_tasks(&self) -> Result<()> {
        let snapshot = self.db().list_tasks()?;
        self.feed.publish_tasks(snapshot);
        Ok(())
    }

    fn republish_shopping(&self) -> Result<()> {
        let snapshot = self.db().list_shopping_items()?;
        self.feed.publish_shopping(snapshot);
        Ok(())
    }

    fn republish_transactions(&self) -> Result<()> {
        let snapshot = self.db().list_transactions()?;
        self.feed.publish_transactions(snapshot);
        Ok(())
    }

    fn republish_notes(&self) -> Result<()> {
        let snapshot = self.db().list_notes()?;
        self.feed.publish_notes(snapshot);
        Ok(())
    }

    fn republish_habits(&self) -> Result<()> {
        let snapshot = self.db().list_habits()?;
        self.feed.publish_habits(snapshot);
        Ok(())
    }

    fn republish_goals(&self) -> Result<()> {
        let snapshot = self.db().list_goals()?;
        self.feed.publish_goals(snapshot);
        Ok(())
    }

    fn republish_events(&self) -> Result<()> {
        let snapshot = self.db().list_events()?;
        self.feed.publish_events(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn svc() -> CadenceService {
        CadenceService::open_in_memory().unwrap()
    }

    #[test]
    fn test_add_task_publishes_snapshot() {
        let svc = svc();
        let rx = svc.feed().subscribe_tasks();
        assert!(rx.borrow().is_empty());

        svc.add_task("write tests", "high").unwrap();
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(rx.borrow()[0].text, "write tests");
    }

    #[test]
    fn test_invalid_input_rejected_before_persist() {
        let svc = svc();
        assert!(svc.add_task("", "high").is_err());
        assert!(svc.add_task("ok", "urgent").is_err());
        assert!(svc.tasks().unwrap().is_empty());

        assert!(svc.add_goal("g", "", "daily").is_err());
        assert!(svc.goals().unwrap().is_empty());

        assert!(svc.log_water(10, d("2024-06-15")).is_err());
        assert!(svc.daily_stats(d("2024-06-15")).unwrap().is_none());
    }

    #[test]
    fn test_toggle_task_flips_and_publishes() {
        let svc = svc();
        let task = svc.add_task("flip me", "low").unwrap();
        let rx = svc.feed().subscribe_tasks();

        let toggled = svc.toggle_task(task.id).unwrap();
        assert!(toggled.completed);
        assert!(rx.borrow()[0].completed);

        let back = svc.toggle_task(task.id).unwrap();
        assert!(!back.completed);
    }

    #[test]
    fn test_habit_toggle_streak_flow() {
        let svc = svc();
        let habit = svc.add_habit("meditate").unwrap();
        let rx = svc.feed().subscribe_habits();

        let toggled = svc.toggle_habit_on(habit.id, d("2024-01-03")).unwrap();
        assert_eq!(toggled.streak, 1);
        assert_eq!(rx.borrow()[0].streak, 1);

        let untoggled = svc.toggle_habit_on(habit.id, d("2024-01-03")).unwrap();
        assert_eq!(untoggled.streak, 0);
        assert!(untoggled.completed_dates.is_empty());
    }

    #[test]
    fn test_water_and_focus_accumulate() {
        let svc = svc();
        let date = d("2024-06-15");
        let rx = svc.feed().subscribe_stats();

        svc.log_water(500, date).unwrap();
        svc.record_focus_session(StatsDelta::focus_session(25), date)
            .unwrap();
        svc.log_water(250, date).unwrap();

        let stats = rx.borrow().clone().unwrap();
        assert_eq!(stats.water_ml, 750);
        assert_eq!(stats.focus_minutes, 25);
        assert_eq!(stats.cycles, 1);
    }

    #[test]
    fn test_empty_focus_contribution_rejected() {
        let svc = svc();
        assert!(
            svc.record_focus_session(StatsDelta::default(), d("2024-06-15"))
                .is_err()
        );
    }

    #[test]
    fn test_in_flight_guard_blocks_overlap() {
        let svc = svc();
        let habit = svc.add_habit("guarded").unwrap();

        let guard = svc.begin("habit", habit.id).unwrap();
        // A second mutation on the same entity is refused while the first
        // is outstanding.
        assert!(svc.begin("habit", habit.id).is_err());
        // Other entities are unaffected.
        assert!(svc.begin("habit", habit.id + 1).is_ok());

        drop(guard);
        assert!(svc.begin("habit", habit.id).is_ok());
    }

    #[test]
    fn test_guard_released_on_failed_mutation() {
        let svc = svc();
        // Toggling a missing habit fails but must not leave the key wedged.
        assert!(svc.toggle_habit_on(42, d("2024-06-15")).is_err());
        assert!(svc.toggle_habit_on(42, d("2024-06-15")).is_err());
        assert!(svc.begin("habit", 42).is_ok());
    }

    #[test]
    fn test_set_weight_updates_goal() {
        let svc = svc();
        let settings = svc.settings().unwrap();
        assert!(settings.weight_kg.is_none());
        assert_eq!(
            settings.water_goal_ml,
            crate::models::DEFAULT_WATER_GOAL_ML
        );

        let updated = svc.set_weight(80.0).unwrap();
        assert_eq!(updated.weight_kg, Some(80.0));
        assert_eq!(updated.water_goal_ml, 2800);

        assert!(svc.set_weight(10.0).is_err());
    }

    #[test]
    fn test_profile_id_available() {
        let svc = svc();
        assert!(!svc.profile_id().is_empty());
    }

    #[test]
    fn test_import_republishes_all_views() {
        let source = svc();
        source.add_task("carried over", "medium").unwrap();
        source.add_note("old note").unwrap();
        let export = source.export_all().unwrap();

        let target = svc();
        let tasks_rx = target.feed().subscribe_tasks();
        let notes_rx = target.feed().subscribe_notes();

        target.import_all(&export).unwrap();
        assert_eq!(tasks_rx.borrow().len(), 1);
        assert_eq!(notes_rx.borrow().len(), 1);
    }
}
