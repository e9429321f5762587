//! Persisting the effect of an answer.
//!
//! Shared by the session sequencer and by one-off submissions that arrive
//! outside a session.

use chrono::{DateTime, Utc};

use crate::clock::LogicalClock;
use crate::error::{RepositoryError, SchedulingError};
use crate::model::{Quality, ReviewStatus, SchedulingState};
use crate::policy::apply_review;
use crate::traits::StudyRepository;

/// Store a freshly computed state and, for a passing answer, complete the
/// item's task for the current study day.
///
/// Failing answers never touch the task: the item is drilled again instead.
pub async fn persist_review(
    repo: &dyn StudyRepository,
    clock: &LogicalClock,
    state: &SchedulingState,
    quality: Quality,
    now: DateTime<Utc>,
) -> Result<(), RepositoryError> {
    repo.upsert_scheduling_state(state).await?;

    if quality.completes_task() {
        let study_date = clock.logical_date(now);
        repo.mark_task_completed(&state.user_id, &state.item_id, &study_date)
            .await?;
        tracing::debug!(
            user = %state.user_id,
            item = %state.item_id,
            %study_date,
            "task completed"
        );
    }
    Ok(())
}

/// Read the stored state, apply the review policy and persist the result.
pub async fn record_review(
    repo: &dyn StudyRepository,
    clock: &LogicalClock,
    user_id: &str,
    item_id: &str,
    quality: Quality,
    now: DateTime<Utc>,
) -> Result<SchedulingState, SchedulingError> {
    let prior = repo.get_scheduling_state(user_id, item_id).await?;
    let next = apply_review(user_id, item_id, prior.as_ref(), quality, now);
    persist_review(repo, clock, &next, quality, now).await?;

    tracing::info!(
        user = %user_id,
        item = %item_id,
        quality = u8::from(quality),
        interval_days = next.interval_days,
        next_due_at = %next.next_due_at,
        "review recorded"
    );
    Ok(next)
}

/// Count a recitation pass over an item without rescheduling it.
///
/// An item seen for the first time gets a `learning` state that is due
/// immediately. Returns the new review count.
pub async fn record_recitation(
    repo: &dyn StudyRepository,
    user_id: &str,
    item_id: &str,
    now: DateTime<Utc>,
) -> Result<u32, SchedulingError> {
    let state = match repo.get_scheduling_state(user_id, item_id).await? {
        Some(mut existing) => {
            existing.review_count = existing.review_count.saturating_add(1);
            existing.last_reviewed_at = Some(now);
            existing
        }
        None => SchedulingState {
            review_count: 1,
            status: ReviewStatus::Learning,
            last_reviewed_at: Some(now),
            ..SchedulingState::fresh(user_id, item_id, now)
        },
    };
    repo.upsert_scheduling_state(&state).await?;
    Ok(state.review_count)
}
