use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::models::{
    BalanceSummary, DailyStats, DaySummary, Event, ExportData, Goal, Habit, ImportSummary,
    NewEvent, NewGoal, NewTask, NewTransaction, Note, SettingEntry, ShoppingItem, Subtask, Task,
    Transaction, clamp_progress, water_goal_ml,
};
use crate::stats::StatsDelta;
use crate::streak::{compute_streak, toggle_date};

pub struct Database {
    conn: Connection,
}

fn date_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date_col(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(2000, 1, 1).expect("valid date"))
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    text TEXT NOT NULL,
                    priority TEXT NOT NULL DEFAULT 'medium',
                    completed INTEGER NOT NULL DEFAULT 0,
                    completed_at TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS subtasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    task_id INTEGER NOT NULL REFERENCES tasks(id),
                    text TEXT NOT NULL,
                    completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS shopping_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    bought INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS transactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL,
                    amount REAL NOT NULL,
                    date TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS notes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS habits (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL,
                    completed_dates TEXT NOT NULL DEFAULT '[]',
                    streak INTEGER NOT NULL DEFAULT 0,
                    last_checked TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS goals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    period TEXT NOT NULL DEFAULT 'monthly',
                    progress INTEGER NOT NULL DEFAULT 0,
                    completed INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    title TEXT NOT NULL,
                    date TEXT NOT NULL,
                    time TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS daily_stats (
                    date TEXT PRIMARY KEY,
                    water_ml INTEGER NOT NULL DEFAULT 0,
                    focus_minutes INTEGER NOT NULL DEFAULT 0,
                    cycles INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS config (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_subtasks_task ON subtasks(task_id);
                CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
                CREATE INDEX IF NOT EXISTS idx_events_date ON events(date);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            uuid: row.get(1)?,
            text: row.get(2)?,
            priority: row.get(3)?,
            completed: row.get(4)?,
            completed_at: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn subtask_from_row(row: &rusqlite::Row) -> rusqlite::Result<Subtask> {
        Ok(Subtask {
            id: row.get(0)?,
            uuid: row.get(1)?,
            task_id: row.get(2)?,
            text: row.get(3)?,
            completed: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ShoppingItem> {
        Ok(ShoppingItem {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            bought: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn transaction_from_row(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let date: String = row.get(4)?;
        Ok(Transaction {
            id: row.get(0)?,
            uuid: row.get(1)?,
            description: row.get(2)?,
            amount: row.get(3)?,
            date: parse_date_col(&date),
            created_at: row.get(5)?,
        })
    }

    fn note_from_row(row: &rusqlite::Row) -> rusqlite::Result<Note> {
        Ok(Note {
            id: row.get(0)?,
            uuid: row.get(1)?,
            content: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn habit_from_row(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
        let dates_json: String = row.get(3)?;
        let completed_dates: BTreeSet<NaiveDate> =
            serde_json::from_str(&dates_json).unwrap_or_default();
        let last_checked: Option<String> = row.get(5)?;
        Ok(Habit {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            completed_dates,
            streak: row.get(4)?,
            last_checked: last_checked.as_deref().map(parse_date_col),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<Goal> {
        Ok(Goal {
            id: row.get(0)?,
            uuid: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            period: row.get(4)?,
            progress: row.get(5)?,
            completed: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn event_from_row(row: &rusqlite::Row) -> rusqlite::Result<Event> {
        let date: String = row.get(3)?;
        Ok(Event {
            id: row.get(0)?,
            uuid: row.get(1)?,
            title: row.get(2)?,
            date: parse_date_col(&date),
            time: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn stats_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyStats> {
        let date: String = row.get(0)?;
        Ok(DailyStats {
            date: parse_date_col(&date),
            water_ml: row.get(1)?,
            focus_minutes: row.get(2)?,
            cycles: row.get(3)?,
        })
    }

    // --- Tasks ---

    pub fn insert_task(&self, task: &NewTask) -> Result<Task> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO tasks (uuid, text, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uuid, task.text, task.priority, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_task(id)
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        self.conn
            .query_row(
                "SELECT id, uuid, text, priority, completed, completed_at, created_at, updated_at
                 FROM tasks WHERE id = ?1",
                params![id],
                Self::task_from_row,
            )
            .with_context(|| format!("Task {id} not found"))
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, text, priority, completed, completed_at, created_at, updated_at
             FROM tasks ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::task_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Set completion, stamping `completed_at` on completion and clearing it
    /// when a task is unmarked.
    pub fn set_task_completed(&self, id: i64, completed: bool) -> Result<Task> {
        let now = Local::now().to_rfc3339();
        let completed_at = completed.then(|| now.clone());
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = ?1, completed_at = ?2, updated_at = ?3 WHERE id = ?4",
            params![completed, completed_at, now, id],
        )?;
        if changed == 0 {
            bail!("Task {id} not found");
        }
        self.get_task(id)
    }

    /// Delete a task and its subtasks in one transaction.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM subtasks WHERE task_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // --- Subtasks ---

    pub fn insert_subtask(&self, task_id: i64, text: &str) -> Result<Subtask> {
        // Verify the parent exists so orphan subtasks can't be created.
        self.get_task(task_id)?;
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO subtasks (uuid, task_id, text, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![uuid, task_id, text, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_subtask(id)
    }

    pub fn get_subtask(&self, id: i64) -> Result<Subtask> {
        self.conn
            .query_row(
                "SELECT id, uuid, task_id, text, completed, created_at
                 FROM subtasks WHERE id = ?1",
                params![id],
                Self::subtask_from_row,
            )
            .with_context(|| format!("Subtask {id} not found"))
    }

    pub fn list_subtasks(&self, task_id: i64) -> Result<Vec<Subtask>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, task_id, text, completed, created_at
             FROM subtasks WHERE task_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![task_id], Self::subtask_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn set_subtask_completed(&self, id: i64, completed: bool) -> Result<Subtask> {
        let changed = self.conn.execute(
            "UPDATE subtasks SET completed = ?1 WHERE id = ?2",
            params![completed, id],
        )?;
        if changed == 0 {
            bail!("Subtask {id} not found");
        }
        self.get_subtask(id)
    }

    pub fn delete_subtask(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM subtasks WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // --- Shopping ---

    pub fn insert_shopping_item(&self, name: &str) -> Result<ShoppingItem> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO shopping_items (uuid, name, created_at) VALUES (?1, ?2, ?3)",
            params![uuid, name, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_shopping_item(id)
    }

    pub fn get_shopping_item(&self, id: i64) -> Result<ShoppingItem> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, bought, created_at FROM shopping_items WHERE id = ?1",
                params![id],
                Self::item_from_row,
            )
            .with_context(|| format!("Shopping item {id} not found"))
    }

    pub fn list_shopping_items(&self) -> Result<Vec<ShoppingItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, bought, created_at
             FROM shopping_items ORDER BY bought ASC, created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::item_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn set_item_bought(&self, id: i64, bought: bool) -> Result<ShoppingItem> {
        let changed = self.conn.execute(
            "UPDATE shopping_items SET bought = ?1 WHERE id = ?2",
            params![bought, id],
        )?;
        if changed == 0 {
            bail!("Shopping item {id} not found");
        }
        self.get_shopping_item(id)
    }

    pub fn delete_shopping_item(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM shopping_items WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Remove every bought item, returning how many were cleared.
    pub fn clear_bought_items(&self) -> Result<i64> {
        let deleted = self
            .conn
            .execute("DELETE FROM shopping_items WHERE bought = 1", [])?;
        Ok(deleted as i64)
    }

    // --- Finance ---

    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO transactions (uuid, description, amount, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uuid, tx.description, tx.amount, date_str(tx.date), now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_transaction(id)
    }

    pub fn get_transaction(&self, id: i64) -> Result<Transaction> {
        self.conn
            .query_row(
                "SELECT id, uuid, description, amount, date, created_at
                 FROM transactions WHERE id = ?1",
                params![id],
                Self::transaction_from_row,
            )
            .with_context(|| format!("Transaction {id} not found"))
    }

    pub fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, description, amount, date, created_at
             FROM transactions ORDER BY date DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::transaction_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub fn balance_summary(&self) -> Result<BalanceSummary> {
        let (income, expense): (f64, f64) = self.conn.query_row(
            "SELECT COALESCE(SUM(CASE WHEN amount > 0 THEN amount ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN amount < 0 THEN amount ELSE 0 END), 0)
             FROM transactions",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(BalanceSummary {
            income,
            expense,
            net: income + expense,
        })
    }

    // --- Notes ---

    pub fn insert_note(&self, content: &str) -> Result<Note> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO notes (uuid, content, created_at) VALUES (?1, ?2, ?3)",
            params![uuid, content, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_note(id)
    }

    pub fn get_note(&self, id: i64) -> Result<Note> {
        self.conn
            .query_row(
                "SELECT id, uuid, content, created_at FROM notes WHERE id = ?1",
                params![id],
                Self::note_from_row,
            )
            .with_context(|| format!("Note {id} not found"))
    }

    pub fn list_notes(&self) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, content, created_at
             FROM notes ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::note_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_note(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // --- Habits ---

    pub fn insert_habit(&self, name: &str) -> Result<Habit> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO habits (uuid, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid, name, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_habit(id)
    }

    pub fn get_habit(&self, id: i64) -> Result<Habit> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, completed_dates, streak, last_checked, created_at, updated_at
                 FROM habits WHERE id = ?1",
                params![id],
                Self::habit_from_row,
            )
            .with_context(|| format!("Habit {id} not found"))
    }

    pub fn list_habits(&self) -> Result<Vec<Habit>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, completed_dates, streak, last_checked, created_at, updated_at
             FROM habits ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::habit_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Flip today's completion for a habit and re-derive the streak, all in
    /// one transaction so a racing toggle can't read a half-applied state.
    /// The stored streak is never an input; it is recomputed from the date
    /// set on every toggle.
    pub fn toggle_habit(&self, id: i64, today: NaiveDate) -> Result<Habit> {
        let tx = self.conn.unchecked_transaction()?;
        let dates_json: String = tx
            .query_row(
                "SELECT completed_dates FROM habits WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .with_context(|| format!("Habit {id} not found"))?;
        let dates: BTreeSet<NaiveDate> = serde_json::from_str(&dates_json).unwrap_or_default();

        let (updated, streak) = toggle_date(&dates, today);

        let now = Local::now().to_rfc3339();
        tx.execute(
            "UPDATE habits SET completed_dates = ?1, streak = ?2, last_checked = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                serde_json::to_string(&updated)?,
                streak,
                date_str(today),
                now,
                id
            ],
        )?;
        tx.commit()?;
        self.get_habit(id)
    }

    pub fn delete_habit(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM habits WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    /// Streaks as stored can go stale overnight (a day passes with no
    /// toggle). Recompute them as of `today`, persisting any that changed.
    pub fn refresh_streaks(&self, today: NaiveDate) -> Result<Vec<Habit>> {
        let habits = self.list_habits()?;
        let now = Local::now().to_rfc3339();
        for habit in &habits {
            let fresh = compute_streak(&habit.completed_dates, today);
            if fresh != habit.streak {
                self.conn.execute(
                    "UPDATE habits SET streak = ?1, updated_at = ?2 WHERE id = ?3",
                    params![fresh, now, habit.id],
                )?;
            }
        }
        self.list_habits()
    }

    // --- Goals ---

    pub fn insert_goal(&self, goal: &NewGoal) -> Result<Goal> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO goals (uuid, title, description, period, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![uuid, goal.title, goal.description, goal.period, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_goal(id)
    }

    pub fn get_goal(&self, id: i64) -> Result<Goal> {
        self.conn
            .query_row(
                "SELECT id, uuid, title, description, period, progress, completed, created_at, updated_at
                 FROM goals WHERE id = ?1",
                params![id],
                Self::goal_from_row,
            )
            .with_context(|| format!("Goal {id} not found"))
    }

    pub fn list_goals(&self) -> Result<Vec<Goal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, title, description, period, progress, completed, created_at, updated_at
             FROM goals ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], Self::goal_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Progress is clamped to 0–100; `completed` is derived, never set
    /// directly.
    pub fn set_goal_progress(&self, id: i64, progress: i64) -> Result<Goal> {
        let progress = clamp_progress(progress);
        let completed = progress == 100;
        let now = Local::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE goals SET progress = ?1, completed = ?2, updated_at = ?3 WHERE id = ?4",
            params![progress, completed, now, id],
        )?;
        if changed == 0 {
            bail!("Goal {id} not found");
        }
        self.get_goal(id)
    }

    pub fn delete_goal(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // --- Events ---

    pub fn insert_event(&self, event: &NewEvent) -> Result<Event> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO events (uuid, title, date, time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uuid, event.title, date_str(event.date), event.time, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_event(id)
    }

    pub fn get_event(&self, id: i64) -> Result<Event> {
        self.conn
            .query_row(
                "SELECT id, uuid, title, date, time, created_at FROM events WHERE id = ?1",
                params![id],
                Self::event_from_row,
            )
            .with_context(|| format!("Event {id} not found"))
    }

    pub fn list_events(&self) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, title, date, time, created_at
             FROM events ORDER BY date ASC, time ASC, id ASC",
        )?;
        let rows = stmt.query_map([], Self::event_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, title, date, time, created_at
             FROM events WHERE date >= ?1 AND date <= ?2
             ORDER BY date ASC, time ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![date_str(start), date_str(end)], Self::event_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn upcoming_events(&self, from: NaiveDate, limit: i64) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, title, date, time, created_at
             FROM events WHERE date >= ?1
             ORDER BY date ASC, time ASC, id ASC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![date_str(from), limit], Self::event_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn delete_event(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    // --- Daily stats ---

    /// Apply an additive contribution to a day's record. The upsert adds
    /// each field to the stored value in a single statement, so concurrent
    /// contributions from two sessions never lose an update.
    pub fn apply_stats_delta(&self, date: NaiveDate, delta: &StatsDelta) -> Result<DailyStats> {
        self.conn.execute(
            "INSERT INTO daily_stats (date, water_ml, focus_minutes, cycles)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO UPDATE SET
                water_ml = water_ml + excluded.water_ml,
                focus_minutes = focus_minutes + excluded.focus_minutes,
                cycles = cycles + excluded.cycles",
            params![
                date_str(date),
                delta.water_ml,
                delta.focus_minutes,
                delta.cycles
            ],
        )?;
        self.get_daily_stats(date)?
            .context("daily stats row missing after upsert")
    }

    pub fn get_daily_stats(&self, date: NaiveDate) -> Result<Option<DailyStats>> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, water_ml, focus_minutes, cycles FROM daily_stats WHERE date = ?1",
                params![date_str(date)],
                Self::stats_from_row,
            )
            .optional()?)
    }

    pub fn stats_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailyStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, water_ml, focus_minutes, cycles
             FROM daily_stats WHERE date >= ?1 AND date <= ?2 ORDER BY date ASC",
        )?;
        let rows = stmt.query_map(params![date_str(start), date_str(end)], Self::stats_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // --- User settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn list_settings(&self) -> Result<Vec<SettingEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM user_settings ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SettingEntry {
                key: row.get(0)?,
                value: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Stable opaque id for this profile, generated on first use. Every
    /// operation is scoped to the single local profile it names.
    pub fn get_or_create_profile_id(&self) -> Result<String> {
        if let Some(id) = self
            .conn
            .query_row(
                "SELECT value FROM config WHERE key = 'profile_id'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?
        {
            return Ok(id);
        }
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES ('profile_id', ?1)",
            params![id],
        )?;
        Ok(id)
    }

    // --- Dashboard summary ---

    pub fn build_day_summary(&self, date: NaiveDate) -> Result<DaySummary> {
        let (tasks_total, tasks_done): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let habits = self.list_habits()?;
        let habits_total = habits.len() as i64;
        let habits_done = habits
            .iter()
            .filter(|h| h.completed_dates.contains(&date))
            .count() as i64;

        let stats = self
            .get_daily_stats(date)?
            .unwrap_or_else(|| DailyStats::zero(date));

        let weight_kg = self
            .get_setting("weight_kg")?
            .and_then(|v| v.parse::<f64>().ok());

        let events_today: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE date = ?1",
            params![date_str(date)],
            |row| row.get(0),
        )?;

        let balance = self.balance_summary()?;

        Ok(DaySummary {
            date,
            tasks_done,
            tasks_total,
            habits_done,
            habits_total,
            water_ml: stats.water_ml,
            water_goal_ml: water_goal_ml(weight_kg),
            focus_minutes: stats.focus_minutes,
            cycles: stats.cycles,
            net_balance: balance.net,
            events_today,
        })
    }

    // --- Export / Import ---

    pub fn export_all(&self) -> Result<ExportData> {
        let mut tasks = self.list_tasks()?;
        tasks.reverse(); // oldest first in exports
        let mut subtasks = Vec::new();
        for task in &tasks {
            subtasks.extend(self.list_subtasks(task.id)?);
        }
        let shopping = self.list_shopping_items()?;
        let transactions = self.list_transactions()?;
        let notes = self.list_notes()?;
        let habits = self.list_habits()?;
        let goals = self.list_goals()?;
        let events = self.list_events()?;
        let daily_stats = {
            let mut stmt = self.conn.prepare(
                "SELECT date, water_ml, focus_minutes, cycles FROM daily_stats ORDER BY date ASC",
            )?;
            let rows = stmt.query_map([], Self::stats_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let settings = self.list_settings()?;

        Ok(ExportData {
            version: 1,
            exported_at: Local::now().to_rfc3339(),
            tasks,
            subtasks,
            shopping,
            transactions,
            notes,
            habits,
            goals,
            events,
            daily_stats,
            settings,
        })
    }

    /// Import a backup. Rows are matched by uuid: unknown uuids are
    /// inserted, known ones are skipped, so re-importing the same file is a
    /// no-op. Daily stats keep the per-field maximum, which makes restore
    /// idempotent while never shrinking a monotone counter.
    pub fn import_all(&self, data: &ExportData) -> Result<ImportSummary> {
        let tx = self.conn.unchecked_transaction()?;
        let mut summary = ImportSummary {
            tasks_imported: 0,
            subtasks_imported: 0,
            shopping_imported: 0,
            transactions_imported: 0,
            notes_imported: 0,
            habits_imported: 0,
            goals_imported: 0,
            events_imported: 0,
            daily_stats_merged: 0,
            settings_imported: 0,
        };

        // Old task id -> new task id, for reparenting subtasks.
        let mut task_ids = std::collections::HashMap::new();

        for task in &data.tasks {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM tasks WHERE uuid = ?1",
                    params![task.uuid],
                    |row| row.get(0),
                )
                .optional()?;
            let new_id = match existing {
                Some(id) => id,
                None => {
                    tx.execute(
                        "INSERT INTO tasks (uuid, text, priority, completed, completed_at, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            task.uuid,
                            task.text,
                            task.priority,
                            task.completed,
                            task.completed_at,
                            task.created_at,
                            task.updated_at,
                        ],
                    )?;
                    summary.tasks_imported += 1;
                    tx.last_insert_rowid()
                }
            };
            task_ids.insert(task.id, new_id);
        }

        for subtask in &data.subtasks {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT id FROM subtasks WHERE uuid = ?1",
                    params![subtask.uuid],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                continue;
            }
            let Some(&task_id) = task_ids.get(&subtask.task_id) else {
                continue; // parent unknown in this store and not in the file
            };
            tx.execute(
                "INSERT INTO subtasks (uuid, task_id, text, completed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    subtask.uuid,
                    task_id,
                    subtask.text,
                    subtask.completed,
                    subtask.created_at
                ],
            )?;
            summary.subtasks_imported += 1;
        }

        for item in &data.shopping {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO shopping_items (uuid, name, bought, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![item.uuid, item.name, item.bought, item.created_at],
            )?;
            summary.shopping_imported += inserted as i64;
        }

        for t in &data.transactions {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO transactions (uuid, description, amount, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![t.uuid, t.description, t.amount, date_str(t.date), t.created_at],
            )?;
            summary.transactions_imported += inserted as i64;
        }

        for note in &data.notes {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO notes (uuid, content, created_at) VALUES (?1, ?2, ?3)",
                params![note.uuid, note.content, note.created_at],
            )?;
            summary.notes_imported += inserted as i64;
        }

        for habit in &data.habits {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO habits
                    (uuid, name, completed_dates, streak, last_checked, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    habit.uuid,
                    habit.name,
                    serde_json::to_string(&habit.completed_dates)?,
                    habit.streak,
                    habit.last_checked.map(date_str),
                    habit.created_at,
                    habit.updated_at,
                ],
            )?;
            summary.habits_imported += inserted as i64;
        }

        for goal in &data.goals {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO goals
                    (uuid, title, description, period, progress, completed, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    goal.uuid,
                    goal.title,
                    goal.description,
                    goal.period,
                    goal.progress,
                    goal.completed,
                    goal.created_at,
                    goal.updated_at,
                ],
            )?;
            summary.goals_imported += inserted as i64;
        }

        for event in &data.events {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO events (uuid, title, date, time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.uuid,
                    event.title,
                    date_str(event.date),
                    event.time,
                    event.created_at
                ],
            )?;
            summary.events_imported += inserted as i64;
        }

        for stats in &data.daily_stats {
            tx.execute(
                "INSERT INTO daily_stats (date, water_ml, focus_minutes, cycles)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(date) DO UPDATE SET
                    water_ml = MAX(water_ml, excluded.water_ml),
                    focus_minutes = MAX(focus_minutes, excluded.focus_minutes),
                    cycles = MAX(cycles, excluded.cycles)",
                params![
                    date_str(stats.date),
                    stats.water_ml,
                    stats.focus_minutes,
                    stats.cycles
                ],
            )?;
            summary.daily_stats_merged += 1;
        }

        let now = Local::now().to_rfc3339();
        for setting in &data.settings {
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO user_settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
                params![setting.key, setting.value, now],
            )?;
            summary.settings_imported += inserted as i64;
        }

        tx.commit()?;
        Ok(summary)
    }
}
