//! Daily task generation.
//!
//! A study day's plan is materialized once, lazily, the first time it is
//! requested. Later calls for the same day return the stored plan unchanged,
//! even if it is short or stale: generation is once-per-day, never top-up.
//!
//! The existence check and the batch insert are separate repository calls.
//! Two devices generating at the same moment can both pass the check; a store
//! with a `(user_id, item_id, study_date)` unique constraint rejects the loser's
//! batch, which is then treated as "already generated". Stores without the
//! constraint end up with two batches, and readers keep the earliest one.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::LogicalClock;
use crate::error::SchedulingError;
use crate::model::{DailyTask, DateKey, StudyItem, TaskKind, TaskStatus};
use crate::traits::StudyRepository;

/// Default number of tasks in a day's plan.
pub const DEFAULT_DAILY_TARGET: usize = 100;

/// Result of [`ensure_daily_tasks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPlan {
    pub study_date: DateKey,
    /// Every task of the day, pending and completed, in plan order.
    pub tasks: Vec<DailyTask>,
    /// `true` when the plan existed before this call.
    pub already_generated: bool,
    /// Rows dropped because they belonged to a later, duplicate batch.
    #[serde(default)]
    pub discarded_duplicates: usize,
}

impl DailyPlan {
    /// No tasks at all: the caller should show "nothing to study".
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &DailyTask> {
        self.tasks.iter().filter(|t| t.is_pending())
    }

    pub fn completed_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }
}

/// Hydrated pending tasks, ready to seed a study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudySet {
    pub study_date: DateKey,
    pub items: Vec<StudyItem>,
    /// Tasks already completed today.
    pub reviewed_today: u32,
    pub already_generated: bool,
}

/// Return today's plan for `user_id`, generating it if none exists yet.
///
/// Due reviews come first (up to `target_count`); any remaining slots are
/// filled with catalog items the user has never studied. An empty plan is
/// not persisted and not an error.
pub async fn ensure_daily_tasks(
    repo: &dyn StudyRepository,
    clock: &LogicalClock,
    user_id: &str,
    now: DateTime<Utc>,
    target_count: usize,
) -> Result<DailyPlan, SchedulingError> {
    let study_date = clock.logical_date(now);

    let existing = repo.list_tasks_for_day(user_id, &study_date).await?;
    if !existing.is_empty() {
        tracing::debug!(user = %user_id, %study_date, tasks = existing.len(), "plan exists");
        return Ok(existing_plan(user_id, study_date, existing));
    }

    tracing::info!(user = %user_id, %study_date, target_count, "generating daily tasks");
    let batch_id = Uuid::new_v4();

    let due = repo.list_due_states(user_id, now, target_count).await?;
    let mut tasks: Vec<DailyTask> = due
        .iter()
        .take(target_count)
        .map(|s| DailyTask::pending(batch_id, user_id, &s.item_id, study_date, TaskKind::Review, now))
        .collect();

    let remaining = target_count.saturating_sub(tasks.len());
    if remaining > 0 {
        let scheduled: Vec<String> = tasks.iter().map(|t| t.item_id.clone()).collect();
        let fresh = repo
            .list_unstudied_items(user_id, &scheduled, remaining)
            .await?;
        tasks.extend(
            fresh
                .iter()
                .filter(|id| !scheduled.contains(id))
                .take(remaining)
                .map(|id| DailyTask::pending(batch_id, user_id, id, study_date, TaskKind::New, now)),
        );
    }

    if tasks.is_empty() {
        tracing::info!(user = %user_id, %study_date, "nothing due and nothing new");
        return Ok(DailyPlan {
            study_date,
            tasks,
            already_generated: false,
            discarded_duplicates: 0,
        });
    }

    match repo.insert_tasks(&tasks).await {
        Ok(()) => {
            let reviews = tasks.iter().filter(|t| t.kind == TaskKind::Review).count();
            tracing::info!(
                user = %user_id,
                %study_date,
                reviews,
                new = tasks.len() - reviews,
                "daily tasks generated"
            );
            Ok(DailyPlan {
                study_date,
                tasks,
                already_generated: false,
                discarded_duplicates: 0,
            })
        }
        Err(e) if e.is_conflict() => {
            tracing::warn!(user = %user_id, %study_date, "plan generated concurrently, re-reading: {e}");
            let stored = repo.list_tasks_for_day(user_id, &study_date).await?;
            Ok(existing_plan(user_id, study_date, stored))
        }
        Err(e) => Err(e.into()),
    }
}

/// Ensure today's plan and join its pending tasks to catalog entries and
/// current scheduling state, in plan order.
pub async fn load_study_set(
    repo: &dyn StudyRepository,
    clock: &LogicalClock,
    user_id: &str,
    now: DateTime<Utc>,
    target_count: usize,
) -> Result<StudySet, SchedulingError> {
    let plan = ensure_daily_tasks(repo, clock, user_id, now, target_count).await?;
    let reviewed_today = u32::try_from(plan.completed_count()).unwrap_or(u32::MAX);

    let pending: Vec<&DailyTask> = plan.pending().collect();
    if pending.is_empty() {
        return Ok(StudySet {
            study_date: plan.study_date,
            items: Vec::new(),
            reviewed_today,
            already_generated: plan.already_generated,
        });
    }

    let ids: Vec<String> = pending.iter().map(|t| t.item_id.clone()).collect();
    let mut entries: HashMap<String, _> = repo
        .get_items(&ids)
        .await?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();
    let mut states: HashMap<String, _> = repo
        .list_states_for_items(user_id, &ids)
        .await?
        .into_iter()
        .map(|s| (s.item_id.clone(), s))
        .collect();

    let mut items = Vec::with_capacity(pending.len());
    for task in pending {
        let Some(entry) = entries.remove(&task.item_id) else {
            tracing::warn!(item = %task.item_id, "task refers to an item missing from the catalog, skipping");
            continue;
        };
        items.push(StudyItem {
            entry,
            progress: states.remove(&task.item_id),
            kind: task.kind,
        });
    }

    Ok(StudySet {
        study_date: plan.study_date,
        items,
        reviewed_today,
        already_generated: plan.already_generated,
    })
}

fn existing_plan(user_id: &str, study_date: DateKey, rows: Vec<DailyTask>) -> DailyPlan {
    let deduped = dedup_generation_batches(rows);
    if deduped.batches > 1 {
        let race = SchedulingError::GenerationRace {
            user_id: user_id.to_string(),
            study_date,
            batches: deduped.batches,
        };
        tracing::warn!(discarded = deduped.discarded, "{race}; keeping the earliest batch");
    }
    DailyPlan {
        study_date,
        tasks: deduped.kept,
        already_generated: true,
        discarded_duplicates: deduped.discarded,
    }
}

struct Deduped {
    kept: Vec<DailyTask>,
    discarded: usize,
    batches: usize,
}

/// Keep only the earliest-created generation batch for the day, then at most
/// one row per item.
fn dedup_generation_batches(rows: Vec<DailyTask>) -> Deduped {
    let total = rows.len();
    let batches = rows.iter().map(|t| t.batch_id).collect::<HashSet<_>>().len();
    let earliest = rows
        .iter()
        .min_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.batch_id.cmp(&b.batch_id))
        })
        .map(|t| t.batch_id);

    let mut seen = HashSet::new();
    let kept: Vec<DailyTask> = rows
        .into_iter()
        .filter(|t| Some(t.batch_id) == earliest)
        .filter(|t| seen.insert(t.item_id.clone()))
        .collect();
    Deduped {
        discarded: total - kept.len(),
        kept,
        batches,
    }
}
