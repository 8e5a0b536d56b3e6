//! Live snapshot feed.
//!
//! Each collection gets a `tokio::sync::watch` channel carrying its full
//! latest snapshot. Consumers subscribe by cloning a receiver and always
//! observe the newest published state; snapshots superseded before a
//! consumer looked are discarded, never merged. Dropping the receiver is
//! the unsubscribe.

use tokio::sync::watch;

use crate::models::{DailyStats, Event, Goal, Habit, Note, ShoppingItem, Task, Transaction};

pub struct SnapshotFeed {
    tasks: watch::Sender<Vec<Task>>,
    shopping: watch::Sender<Vec<ShoppingItem>>,
    transactions: watch::Sender<Vec<Transaction>>,
    notes: watch::Sender<Vec<Note>>,
    habits: watch::Sender<Vec<Habit>>,
    goals: watch::Sender<Vec<Goal>>,
    events: watch::Sender<Vec<Event>>,
    stats: watch::Sender<Option<DailyStats>>,
}

impl Default for SnapshotFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotFeed {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: watch::channel(Vec::new()).0,
            shopping: watch::channel(Vec::new()).0,
            transactions: watch::channel(Vec::new()).0,
            notes: watch::channel(Vec::new()).0,
            habits: watch::channel(Vec::new()).0,
            goals: watch::channel(Vec::new()).0,
            events: watch::channel(Vec::new()).0,
            stats: watch::channel(None).0,
        }
    }

    // send_replace rather than send: a publish must succeed even when no
    // view is currently subscribed.

    pub fn publish_tasks(&self, snapshot: Vec<Task>) {
        self.tasks.send_replace(snapshot);
    }

    pub fn publish_shopping(&self, snapshot: Vec<ShoppingItem>) {
        self.shopping.send_replace(snapshot);
    }

    pub fn publish_transactions(&self, snapshot: Vec<Transaction>) {
        self.transactions.send_replace(snapshot);
    }

    pub fn publish_notes(&self, snapshot: Vec<Note>) {
        self.notes.send_replace(snapshot);
    }

    pub fn publish_habits(&self, snapshot: Vec<Habit>) {
        self.habits.send_replace(snapshot);
    }

    pub fn publish_goals(&self, snapshot: Vec<Goal>) {
        self.goals.send_replace(snapshot);
    }

    pub fn publish_events(&self, snapshot: Vec<Event>) {
        self.events.send_replace(snapshot);
    }

    pub fn publish_stats(&self, snapshot: Option<DailyStats>) {
        self.stats.send_replace(snapshot);
    }

    #[must_use]
    pub fn subscribe_tasks(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    #[must_use]
    pub fn subscribe_shopping(&self) -> watch::Receiver<Vec<ShoppingItem>> {
        self.shopping.subscribe()
    }

    #[must_use]
    pub fn subscribe_transactions(&self) -> watch::Receiver<Vec<Transaction>> {
        self.transactions.subscribe()
    }

    #[must_use]
    pub fn subscribe_notes(&self) -> watch::Receiver<Vec<Note>> {
        self.notes.subscribe()
    }

    #[must_use]
    pub fn subscribe_habits(&self) -> watch::Receiver<Vec<Habit>> {
        self.habits.subscribe()
    }

    #[must_use]
    pub fn subscribe_goals(&self) -> watch::Receiver<Vec<Goal>> {
        self.goals.subscribe()
    }

    #[must_use]
    pub fn subscribe_events(&self) -> watch::Receiver<Vec<Event>> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn subscribe_stats(&self) -> watch::Receiver<Option<DailyStats>> {
        self.stats.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(id: i64, text: &str) -> Task {
        Task {
            id,
            uuid: String::new(),
            text: text.to_string(),
            priority: "medium".to_string(),
            completed: false,
            completed_at: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn test_subscriber_sees_latest_snapshot() {
        let feed = SnapshotFeed::new();
        let rx = feed.subscribe_tasks();

        feed.publish_tasks(vec![task(1, "a")]);
        assert_eq!(rx.borrow().len(), 1);
        assert_eq!(rx.borrow()[0].text, "a");
    }

    #[test]
    fn test_last_snapshot_wins() {
        let feed = SnapshotFeed::new();
        let mut rx = feed.subscribe_tasks();

        // Three publishes land before the consumer looks; only the newest
        // is observable.
        feed.publish_tasks(vec![task(1, "a")]);
        feed.publish_tasks(vec![task(1, "a"), task(2, "b")]);
        feed.publish_tasks(vec![task(2, "b")]);

        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].text, "b");
        // Nothing further is pending.
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_publish_without_subscribers_does_not_fail() {
        let feed = SnapshotFeed::new();
        feed.publish_tasks(vec![task(1, "a")]);
        // A late subscriber still gets the current state.
        let rx = feed.subscribe_tasks();
        assert_eq!(rx.borrow().len(), 1);
    }

    #[test]
    fn test_drop_receiver_unsubscribes() {
        let feed = SnapshotFeed::new();
        let rx = feed.subscribe_tasks();
        assert_eq!(feed.tasks.receiver_count(), 1);
        drop(rx);
        assert_eq!(feed.tasks.receiver_count(), 0);
        // Publishing after the last unsubscribe is still fine.
        feed.publish_tasks(vec![task(1, "a")]);
    }

    #[test]
    fn test_stats_feed_starts_empty() {
        let feed = SnapshotFeed::new();
        let rx = feed.subscribe_stats();
        assert!(rx.borrow().is_none());

        feed.publish_stats(Some(DailyStats::zero(
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        )));
        assert!(rx.borrow().is_some());
    }

    #[tokio::test]
    async fn test_changed_wakes_async_consumer() {
        let feed = SnapshotFeed::new();
        let mut rx = feed.subscribe_tasks();
        rx.mark_unchanged();

        feed.publish_tasks(vec![task(1, "a")]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
