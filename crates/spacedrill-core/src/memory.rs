//! In-memory repository.
//!
//! [`RepositorySnapshot`] holds the whole data set and implements every
//! repository operation synchronously; [`MemoryRepository`] wraps it behind an
//! async mutex and adds failure injection and call counters for tests. File
//! backed stores reuse the snapshot and persist it after each write.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::RepositoryError;
use crate::model::{DailyTask, DateKey, ItemEntry, ReviewStatus, SchedulingState, TaskStatus};
use crate::traits::StudyRepository;

/// Complete repository contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySnapshot {
    /// Catalog, in catalog order.
    #[serde(default)]
    pub items: Vec<ItemEntry>,
    /// Scheduling states keyed by `user_id`, then `item_id`.
    #[serde(default)]
    pub states: BTreeMap<String, BTreeMap<String, SchedulingState>>,
    /// Task rows in insertion order.
    #[serde(default)]
    pub tasks: Vec<DailyTask>,
    /// Whether `(user_id, item_id, study_date)` must be unique.
    #[serde(default = "default_true")]
    pub unique_tasks: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RepositorySnapshot {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            states: BTreeMap::new(),
            tasks: Vec::new(),
            unique_tasks: true,
        }
    }
}

impl RepositorySnapshot {
    pub fn state(&self, user_id: &str, item_id: &str) -> Option<&SchedulingState> {
        self.states.get(user_id).and_then(|m| m.get(item_id))
    }

    pub fn upsert_state(&mut self, state: &SchedulingState) {
        self.states
            .entry(state.user_id.clone())
            .or_default()
            .insert(state.item_id.clone(), state.clone());
    }

    pub fn due_states(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Vec<SchedulingState> {
        let mut due: Vec<SchedulingState> = self
            .user_states(user_id)
            .filter(|s| s.is_due(as_of))
            .cloned()
            .collect();
        due.sort_by(|a, b| {
            a.next_due_at
                .cmp(&b.next_due_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        due.truncate(limit);
        due
    }

    pub fn tasks_for_day(&self, user_id: &str, study_date: &DateKey) -> Vec<DailyTask> {
        self.tasks
            .iter()
            .filter(|t| t.user_id == user_id && t.study_date == *study_date)
            .cloned()
            .collect()
    }

    /// Append a batch. With the unique constraint on, a batch containing any
    /// duplicate row is rejected as a whole.
    pub fn insert_tasks(&mut self, batch: &[DailyTask]) -> Result<(), RepositoryError> {
        if self.unique_tasks {
            let mut seen: HashSet<(&str, &str, DateKey)> = self
                .tasks
                .iter()
                .map(|t| (t.user_id.as_str(), t.item_id.as_str(), t.study_date))
                .collect();
            for task in batch {
                if !seen.insert((task.user_id.as_str(), task.item_id.as_str(), task.study_date)) {
                    return Err(RepositoryError::Conflict(format!(
                        "task for user {} item {} on {} already exists",
                        task.user_id, task.item_id, task.study_date
                    )));
                }
            }
        }
        self.tasks.extend_from_slice(batch);
        Ok(())
    }

    pub fn complete_task(&mut self, user_id: &str, item_id: &str, study_date: &DateKey) -> usize {
        let mut updated = 0;
        for task in self.tasks.iter_mut().filter(|t| {
            t.user_id == user_id && t.item_id == item_id && t.study_date == *study_date
        }) {
            task.status = TaskStatus::Completed;
            updated += 1;
        }
        updated
    }

    pub fn unstudied_items(&self, user_id: &str, exclude: &[String], limit: usize) -> Vec<String> {
        let studied = self.states.get(user_id);
        self.items
            .iter()
            .filter(|item| !studied.is_some_and(|m| m.contains_key(&item.id)))
            .filter(|item| !exclude.contains(&item.id))
            .take(limit)
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn items_by_id(&self, ids: &[String]) -> Vec<ItemEntry> {
        self.items
            .iter()
            .filter(|item| ids.contains(&item.id))
            .cloned()
            .collect()
    }

    pub fn upsert_items(&mut self, items: &[ItemEntry]) {
        for item in items {
            match self.items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item.clone(),
                None => self.items.push(item.clone()),
            }
        }
    }

    pub fn states_for_items(&self, user_id: &str, ids: &[String]) -> Vec<SchedulingState> {
        self.user_states(user_id)
            .filter(|s| ids.contains(&s.item_id))
            .cloned()
            .collect()
    }

    pub fn count_learned(&self, user_id: &str) -> usize {
        self.user_states(user_id)
            .filter(|s| s.status != ReviewStatus::New)
            .count()
    }

    pub fn count_due(&self, user_id: &str, as_of: DateTime<Utc>) -> usize {
        self.user_states(user_id).filter(|s| s.is_due(as_of)).count()
    }

    fn user_states<'a>(&'a self, user_id: &str) -> impl Iterator<Item = &'a SchedulingState> {
        self.states.get(user_id).into_iter().flat_map(|m| m.values())
    }
}

/// Repository kept entirely in process memory.
pub struct MemoryRepository {
    data: Mutex<RepositorySnapshot>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    insert_calls: AtomicU32,
    upsert_calls: AtomicU32,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::from_snapshot(RepositorySnapshot::default())
    }

    pub fn from_snapshot(snapshot: RepositorySnapshot) -> Self {
        Self {
            data: Mutex::new(snapshot),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            insert_calls: AtomicU32::new(0),
            upsert_calls: AtomicU32::new(0),
        }
    }

    /// Create a repository pre-loaded with a catalog.
    pub fn with_items(items: Vec<ItemEntry>) -> Self {
        Self::from_snapshot(RepositorySnapshot {
            items,
            ..RepositorySnapshot::default()
        })
    }

    /// Drop the `(user_id, item_id, study_date)` uniqueness guarantee, as a
    /// store without that index would behave.
    pub fn without_unique_constraint(mut self) -> Self {
        self.data.get_mut().unique_tasks = false;
        self
    }

    /// Make every read fail with [`RepositoryError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// Make every write fail with [`RepositoryError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of `insert_tasks` calls received.
    pub fn insert_calls(&self) -> u32 {
        self.insert_calls.load(Ordering::Relaxed)
    }

    /// Number of `upsert_scheduling_state` calls received.
    pub fn upsert_calls(&self) -> u32 {
        self.upsert_calls.load(Ordering::Relaxed)
    }

    fn check_read(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("injected read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(RepositoryError::Unavailable("injected write failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StudyRepository for MemoryRepository {
    async fn get_scheduling_state(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<SchedulingState>, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.state(user_id, item_id).cloned())
    }

    async fn upsert_scheduling_state(
        &self,
        state: &SchedulingState,
    ) -> Result<(), RepositoryError> {
        self.upsert_calls.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        self.data.lock().await.upsert_state(state);
        Ok(())
    }

    async fn list_due_states(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SchedulingState>, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.due_states(user_id, as_of, limit))
    }

    async fn list_tasks_for_day(
        &self,
        user_id: &str,
        study_date: &DateKey,
    ) -> Result<Vec<DailyTask>, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.tasks_for_day(user_id, study_date))
    }

    async fn insert_tasks(&self, tasks: &[DailyTask]) -> Result<(), RepositoryError> {
        self.insert_calls.fetch_add(1, Ordering::Relaxed);
        self.check_write()?;
        self.data.lock().await.insert_tasks(tasks)
    }

    async fn mark_task_completed(
        &self,
        user_id: &str,
        item_id: &str,
        study_date: &DateKey,
    ) -> Result<(), RepositoryError> {
        self.check_write()?;
        self.data
            .lock()
            .await
            .complete_task(user_id, item_id, study_date);
        Ok(())
    }

    async fn list_unstudied_items(
        &self,
        user_id: &str,
        exclude_item_ids: &[String],
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError> {
        self.check_read()?;
        Ok(self
            .data
            .lock()
            .await
            .unstudied_items(user_id, exclude_item_ids, limit))
    }

    async fn get_items(&self, item_ids: &[String]) -> Result<Vec<ItemEntry>, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.items_by_id(item_ids))
    }

    async fn upsert_items(&self, items: &[ItemEntry]) -> Result<(), RepositoryError> {
        self.check_write()?;
        self.data.lock().await.upsert_items(items);
        Ok(())
    }

    async fn list_states_for_items(
        &self,
        user_id: &str,
        item_ids: &[String],
    ) -> Result<Vec<SchedulingState>, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.states_for_items(user_id, item_ids))
    }

    async fn count_learned(&self, user_id: &str) -> Result<usize, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.count_learned(user_id))
    }

    async fn count_due(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        self.check_read()?;
        Ok(self.data.lock().await.count_due(user_id, as_of))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskKind;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn item(id: &str) -> ItemEntry {
        ItemEntry {
            id: id.into(),
            text: format!("text-{id}"),
            romanization: None,
            part_of_speech: "noun".into(),
            definition: format!("def-{id}"),
            example: None,
            example_meaning: None,
        }
    }

    fn day() -> DateKey {
        "2024-06-01".parse().unwrap()
    }

    fn task(batch: Uuid, item_id: &str) -> DailyTask {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        DailyTask::pending(batch, "u1", item_id, day(), TaskKind::New, at)
    }

    #[tokio::test]
    async fn unique_constraint_rejects_whole_batch() {
        let repo = MemoryRepository::new();
        repo.insert_tasks(&[task(Uuid::new_v4(), "a")]).await.unwrap();

        let batch = Uuid::new_v4();
        let err = repo
            .insert_tasks(&[task(batch, "b"), task(batch, "a")])
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(repo.list_tasks_for_day("u1", &day()).await.unwrap().len(), 1);
        assert_eq!(repo.insert_calls(), 2);
    }

    #[tokio::test]
    async fn duplicates_allowed_without_constraint() {
        let repo = MemoryRepository::new().without_unique_constraint();
        repo.insert_tasks(&[task(Uuid::new_v4(), "a")]).await.unwrap();
        repo.insert_tasks(&[task(Uuid::new_v4(), "a")]).await.unwrap();
        assert_eq!(repo.list_tasks_for_day("u1", &day()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unstudied_items_follow_catalog_order_and_exclusions() {
        let repo = MemoryRepository::with_items(vec![item("a"), item("b"), item("c"), item("d")]);
        let now = Utc::now();
        repo.upsert_scheduling_state(&SchedulingState::fresh("u1", "b", now))
            .await
            .unwrap();

        let ids = repo
            .list_unstudied_items("u1", &["c".to_string()], 10)
            .await
            .unwrap();
        assert_eq!(ids, vec!["a".to_string(), "d".to_string()]);

        let other_user = repo.list_unstudied_items("u2", &[], 2).await.unwrap();
        assert_eq!(other_user, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn injected_failures_surface_as_unavailable() {
        let repo = MemoryRepository::new();
        repo.set_fail_reads(true);
        let err = repo.count_learned("u1").await.unwrap_err();
        assert!(err.is_transient());

        repo.set_fail_reads(false);
        repo.set_fail_writes(true);
        let state = SchedulingState::fresh("u1", "a", Utc::now());
        assert!(repo.upsert_scheduling_state(&state).await.is_err());
        assert_eq!(repo.upsert_calls(), 1);
        assert!(repo.get_scheduling_state("u1", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn due_states_are_ordered_and_limited() {
        let repo = MemoryRepository::new();
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
        for (id, offset) in [("late", 3), ("early", 1), ("future", 48), ("mid", 2)] {
            let mut s = SchedulingState::fresh("u1", id, base);
            s.next_due_at = base + chrono::Duration::hours(offset - 5);
            repo.upsert_scheduling_state(&s).await.unwrap();
        }
        let due = repo.list_due_states("u1", base, 2).await.unwrap();
        let ids: Vec<_> = due.iter().map(|s| s.item_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "mid"]);
        assert_eq!(repo.count_due("u1", base).await.unwrap(), 3);
    }
}
