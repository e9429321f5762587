//! JSON snapshot repository.
//!
//! The whole data set lives in one JSON file. Every write applies the change
//! to a copy of the snapshot, writes the copy to a temporary file in the same
//! directory and renames it over the data file; the in-memory copy is only
//! replaced once the rename succeeded.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use spacedrill_core::error::RepositoryError;
use spacedrill_core::memory::RepositorySnapshot;
use spacedrill_core::model::{DailyTask, DateKey, ItemEntry, SchedulingState};
use spacedrill_core::traits::StudyRepository;

use crate::error::StoreError;

/// Repository persisted to a single JSON file.
pub struct JsonFileRepository {
    path: PathBuf,
    data: Mutex<RepositorySnapshot>,
}

impl JsonFileRepository {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = if path.exists() {
            let content = std::fs::read(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_slice(&content).map_err(|source| StoreError::Decode {
                path: path.clone(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "data file missing, starting empty");
            RepositorySnapshot::default()
        };
        Ok(Self {
            path,
            data: Mutex::new(snapshot),
        })
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> RepositorySnapshot {
        self.data.lock().await.clone()
    }

    async fn read<T>(&self, f: impl FnOnce(&RepositorySnapshot) -> T) -> T {
        let guard = self.data.lock().await;
        f(&guard)
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RepositorySnapshot) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.data.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        write_snapshot(&self.path, &next)?;
        *guard = next;
        Ok(out)
    }
}

fn write_snapshot(path: &Path, snapshot: &RepositorySnapshot) -> Result<(), StoreError> {
    let encoded = serde_json::to_vec_pretty(snapshot)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(&dir).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    tmp.write_all(&encoded).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[async_trait]
impl StudyRepository for JsonFileRepository {
    async fn get_scheduling_state(
        &self,
        user_id: &str,
        item_id: &str,
    ) -> Result<Option<SchedulingState>, RepositoryError> {
        Ok(self.read(|d| d.state(user_id, item_id).cloned()).await)
    }

    async fn upsert_scheduling_state(
        &self,
        state: &SchedulingState,
    ) -> Result<(), RepositoryError> {
        self.mutate(|d| {
            d.upsert_state(state);
            Ok(())
        })
        .await
    }

    async fn list_due_states(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<SchedulingState>, RepositoryError> {
        Ok(self.read(|d| d.due_states(user_id, as_of, limit)).await)
    }

    async fn list_tasks_for_day(
        &self,
        user_id: &str,
        study_date: &DateKey,
    ) -> Result<Vec<DailyTask>, RepositoryError> {
        Ok(self.read(|d| d.tasks_for_day(user_id, study_date)).await)
    }

    async fn insert_tasks(&self, tasks: &[DailyTask]) -> Result<(), RepositoryError> {
        self.mutate(|d| d.insert_tasks(tasks)).await
    }

    async fn mark_task_completed(
        &self,
        user_id: &str,
        item_id: &str,
        study_date: &DateKey,
    ) -> Result<(), RepositoryError> {
        self.mutate(|d| {
            d.complete_task(user_id, item_id, study_date);
            Ok(())
        })
        .await
    }

    async fn list_unstudied_items(
        &self,
        user_id: &str,
        exclude_item_ids: &[String],
        limit: usize,
    ) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .read(|d| d.unstudied_items(user_id, exclude_item_ids, limit))
            .await)
    }

    async fn get_items(&self, item_ids: &[String]) -> Result<Vec<ItemEntry>, RepositoryError> {
        Ok(self.read(|d| d.items_by_id(item_ids)).await)
    }

    async fn upsert_items(&self, items: &[ItemEntry]) -> Result<(), RepositoryError> {
        self.mutate(|d| {
            d.upsert_items(items);
            Ok(())
        })
        .await
    }

    async fn list_states_for_items(
        &self,
        user_id: &str,
        item_ids: &[String],
    ) -> Result<Vec<SchedulingState>, RepositoryError> {
        Ok(self.read(|d| d.states_for_items(user_id, item_ids)).await)
    }

    async fn count_learned(&self, user_id: &str) -> Result<usize, RepositoryError> {
        Ok(self.read(|d| d.count_learned(user_id)).await)
    }

    async fn count_due(
        &self,
        user_id: &str,
        as_of: DateTime<Utc>,
    ) -> Result<usize, RepositoryError> {
        Ok(self.read(|d| d.count_due(user_id, as_of)).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use spacedrill_core::clock::LogicalClock;
    use spacedrill_core::generator::ensure_daily_tasks;
    use spacedrill_core::model::{Quality, TaskKind, TaskStatus};
    use spacedrill_core::review::record_review;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn entry(id: &str) -> ItemEntry {
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

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let clock = LogicalClock::default();

        {
            let repo = JsonFileRepository::open(&path).unwrap();
            repo.upsert_items(&[entry("a"), entry("b")]).await.unwrap();
            ensure_daily_tasks(&repo, &clock, "u1", now(), 5).await.unwrap();
            record_review(&repo, &clock, "u1", "a", Quality::Good, now())
                .await
                .unwrap();
        }

        let reopened = JsonFileRepository::open(&path).unwrap();
        let state = reopened
            .get_scheduling_state("u1", "a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(state.interval_days, 5);

        let plan = ensure_daily_tasks(&reopened, &clock, "u1", now(), 5)
            .await
            .unwrap();
        assert!(plan.already_generated);
        assert_eq!(plan.tasks.len(), 2);
        let a = plan.tasks.iter().find(|t| t.item_id == "a").unwrap();
        assert_eq!(a.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn missing_file_starts_empty_and_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let repo = JsonFileRepository::open(&path).unwrap();
        assert_eq!(repo.count_learned("u1").await.unwrap(), 0);
        assert!(!path.exists());

        repo.upsert_items(&[entry("a")]).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn conflicting_insert_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let repo = JsonFileRepository::open(&path).unwrap();
        let day: DateKey = "2024-06-01".parse().unwrap();

        let task = |item: &str| DailyTask::pending(Uuid::new_v4(), "u1", item, day, TaskKind::New, now());
        repo.insert_tasks(&[task("a")]).await.unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let err = repo.insert_tasks(&[task("b"), task("a")]).await.unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(repo.snapshot().await.tasks.len(), 1);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileRepository::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Decode { .. }));
        let repo_err: RepositoryError = err.into();
        assert!(matches!(repo_err, RepositoryError::Corrupt(_)));
    }
}
