//! Badge and header counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::LogicalClock;
use crate::error::SchedulingError;
use crate::traits::StudyRepository;

/// Learner-level counters shown outside a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyStats {
    /// Items that have left the `new` stage.
    pub learned: usize,
    /// Work left for today.
    pub due: usize,
    /// Whether `due` came from a stored plan rather than the dynamic estimate.
    pub from_plan: bool,
}

/// Compute counters for `user_id` at `now`.
///
/// With a plan for today, `due` is its pending task count. Without one it
/// falls back to the number of states due by `now`, which leaves out the new
/// items a generated plan would add.
pub async fn study_stats(
    repo: &dyn StudyRepository,
    clock: &LogicalClock,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<StudyStats, SchedulingError> {
    let learned = repo.count_learned(user_id).await?;

    let study_date = clock.logical_date(now);
    let tasks = repo.list_tasks_for_day(user_id, &study_date).await?;

    let (due, from_plan) = if tasks.is_empty() {
        (repo.count_due(user_id, now).await?, false)
    } else {
        (tasks.iter().filter(|t| t.is_pending()).count(), true)
    };

    Ok(StudyStats {
        learned,
        due,
        from_plan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::ensure_daily_tasks;
    use crate::memory::MemoryRepository;
    use crate::model::{ItemEntry, Quality};
    use crate::review::record_review;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn entry(id: &str) -> ItemEntry {
        ItemEntry {
            id: id.into(),
            text: id.into(),
            romanization: None,
            part_of_speech: String::new(),
            definition: "d".into(),
            example: None,
            example_meaning: None,
        }
    }

    #[tokio::test]
    async fn falls_back_to_dynamic_count_without_plan() {
        let repo = MemoryRepository::with_items(vec![entry("a"), entry("b"), entry("c")]);
        let clock = LogicalClock::default();
        let earlier = now() - Duration::days(3);
        record_review(&repo, &clock, "u1", "a", Quality::Forgot, earlier)
            .await
            .unwrap();
        record_review(&repo, &clock, "u1", "b", Quality::Good, earlier)
            .await
            .unwrap();

        let stats = study_stats(&repo, &clock, "u1", now()).await.unwrap();
        assert_eq!(stats.learned, 2);
        // Only "a" is due; the unstudied "c" is not counted until a plan exists.
        assert_eq!(stats.due, 1);
        assert!(!stats.from_plan);
    }

    #[tokio::test]
    async fn uses_pending_tasks_once_plan_exists() {
        let repo = MemoryRepository::with_items(vec![entry("a"), entry("b"), entry("c")]);
        let clock = LogicalClock::default();
        ensure_daily_tasks(&repo, &clock, "u1", now(), 10).await.unwrap();

        let stats = study_stats(&repo, &clock, "u1", now()).await.unwrap();
        assert_eq!(stats.due, 3);
        assert!(stats.from_plan);

        record_review(&repo, &clock, "u1", "b", Quality::Easy, now())
            .await
            .unwrap();
        let stats = study_stats(&repo, &clock, "u1", now()).await.unwrap();
        assert_eq!(stats.due, 2);
        assert_eq!(stats.learned, 1);
    }
}
