//! Core trait definitions for persistence and progress notification.
//!
//! The engine never talks to storage directly: every read and write goes
//! through [`StudyRepository`], and UI-facing progress changes are pushed to a
//! [`ProgressObserver`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::RepositoryError;
use crate::model::{DailyTask, DateKey, ItemEntry, SchedulingState};

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Storage capability consumed by the scheduling engine.
///
/// Implementations must make `upsert_scheduling_state` atomic on
/// `(user_id, item_id)` and should reject duplicate
/// `(user_id, item_id, study_date)` task rows with
/// [`RepositoryError::Conflict`].
#[async_trait]
pub trait StudyRepository: Send + Sync {
    /// Current state for one user and item, if the item was ever reviewed.
    async fn get_scheduling_state(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<SchedulingState>, RepositoryError>;

    /// Insert or replace the state keyed by `(user_id, item_id)`.
    async fn upsert_scheduling_state(&self, state: &SchedulingState)
        -> Result<(), RepositoryError>;

    /// States with `next_due_at <= as_of`, earliest due first.
    async fn list_due_states(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SchedulingState>, RepositoryError>;

    /// Every task row stored for a study day, in insertion order.
    async fn list_tasks_for_day(
        &self,
        user_id: &str,
        study_date: &DateKey,
    ) -> Result<Vec<DailyTask>, RepositoryError>;

    /// Insert a generation batch.
    async fn insert_tasks(&self, tasks: &[DailyTask]) -> Result<(), RepositoryError>;

    /// Flip the matching task to completed. A missing task is not an error.
    async fn mark_task_completed(
        &self,
        user_id: &str,
        item_id: &str,
        study_date: &DateKey,
    ) -> Result<(), RepositoryError>;

    /// Catalog ids with no scheduling state for this user, in catalog order.
    async fn list_unstudied_items(
        &self,
        user_id: &str,
        exclude_item_ids: &[String],
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError>;

    /// Catalog entries for the given ids. Unknown ids are skipped.
    async fn get_items(&self, item_ids: &[String]) -> Result<Vec<ItemEntry>, RepositoryError>;

    /// Add or replace catalog entries.
    async fn upsert_items(&self, items: &[ItemEntry]) -> Result<(), RepositoryError>;

    /// States for a set of items.
    async fn list_states_for_items(
        &self,
        user_id: &str,
        item_ids: &[String],
    ) -> Result<Vec<SchedulingState>, RepositoryError>;

    /// Number of states whose status is not `new`.
    async fn count_learned(&self, user_id: &str) -> Result<usize, RepositoryError>;

    /// Number of states with `next_due_at <= as_of`.
    async fn count_due(&self, user_id: &str, as_of: DateTime<Utc>)
        -> Result<usize, RepositoryError>;
}

// ---------------------------------------------------------------------------
// Progress notification
// ---------------------------------------------------------------------------

/// "Today's completed count changed" notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub user_id: String,
    pub study_date: DateKey,
    pub completed_today: u32,
}

/// Receives progress changes from live study sessions.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);

    /// A review could not be saved; the session kept going regardless.
    fn on_persist_failed(&self, user_id: &str, item_id: &str, error: &RepositoryError);
}

/// No-op progress observer.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _: &ProgressEvent) {}
    fn on_persist_failed(&self, _: &str, _: &str, _: &RepositoryError) {}
}

/// Notification carried by a [`BroadcastObserver`].
#[derive(Debug, Clone)]
pub enum SessionNotice {
    Progress(ProgressEvent),
    PersistFailed {
        user_id: String,
        item_id: String,
        error: RepositoryError,
    },
}

/// Fans notifications out to any number of subscribers (badges, headers).
///
/// Sending never blocks; subscribers that fall behind lose the oldest
/// notices.
pub struct BroadcastObserver {
    sender: broadcast::Sender<SessionNotice>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.sender.subscribe()
    }

    fn publish(&self, notice: SessionNotice) {
        // No subscribers is fine.
        let _ = self.sender.send(notice);
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ProgressObserver for BroadcastObserver {
    fn on_progress(&self, event: &ProgressEvent) {
        self.publish(SessionNotice::Progress(event.clone()));
    }

    fn on_persist_failed(&self, user_id: &str, item_id: &str, error: &RepositoryError) {
        self.publish(SessionNotice::PersistFailed {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            error: error.clone(),
        });
    }
}
