//! Live study sessions.
//!
//! A [`StudySession`] walks a [`SessionQueue`] built from the day's pending
//! tasks. Every answer is graded by the review policy and persisted; a
//! failing answer also re-inserts a copy of the item a few positions ahead so
//! it comes back before the session ends. The queue is owned by the session
//! and never persisted: abandoning a session discards it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::clock::LogicalClock;
use crate::error::{RepositoryError, SchedulingError};
use crate::generator::StudySet;
use crate::model::{DateKey, ItemEntry, Quality, SchedulingState, StudyItem};
use crate::policy::apply_review;
use crate::review::persist_review;
use crate::traits::{ProgressEvent, ProgressObserver, StudyRepository};

/// Ordered items with a cursor pointing at the one being presented.
#[derive(Debug, Clone, Default)]
pub struct SessionQueue {
    items: Vec<StudyItem>,
    cursor: usize,
}

impl SessionQueue {
    pub fn new(items: Vec<StudyItem>) -> Self {
        Self { items, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The item under the cursor, or `None` once the queue is exhausted.
    pub fn current(&self) -> Option<&StudyItem> {
        self.items.get(self.cursor)
    }

    pub fn get(&self, index: usize) -> Option<&StudyItem> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudyItem> {
        self.items.iter()
    }

    /// Items from the cursor onwards.
    pub fn remaining(&self) -> usize {
        self.items.len().saturating_sub(self.cursor)
    }

    /// Insert a copy of the current item at `cursor + gap`, clamped to the
    /// end of the queue. Returns the insertion index, or `None` if the queue
    /// is exhausted.
    pub fn insert_at_offset(&mut self, gap: usize) -> Option<usize> {
        let copy = self.current()?.clone();
        let index = self.cursor.saturating_add(gap).min(self.items.len());
        self.items.insert(index, copy);
        Some(index)
    }

    /// Move past the current item. Returns `false` once nothing is left.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.items.len() {
            self.cursor += 1;
        }
        self.cursor < self.items.len()
    }
}

/// Where a session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Presenting(usize),
    Complete,
}

/// What happened after an answer.
#[derive(Debug)]
pub struct AnswerOutcome {
    /// The cursor moved on. Always true for an accepted answer.
    pub advanced: bool,
    pub session_complete: bool,
    /// Where a copy of the item was re-inserted, for forgot/hard answers.
    pub requeued_at: Option<usize>,
    /// The state computed for the answered item.
    pub state: SchedulingState,
    /// Set when saving the review failed; the session advanced anyway.
    pub persist_error: Option<RepositoryError>,
}

/// One learner working through one queue.
pub struct StudySession {
    repo: Arc<dyn StudyRepository>,
    clock: LogicalClock,
    observer: Arc<dyn ProgressObserver>,
    user_id: String,
    study_date: DateKey,
    queue: SessionQueue,
    state: SessionState,
    completed_today: u32,
    /// Latest state per item, so a re-queued copy is graded from the result
    /// of its previous answer rather than the hydrated snapshot.
    latest: HashMap<String, SchedulingState>,
}

impl StudySession {
    pub fn new(
        repo: Arc<dyn StudyRepository>,
        clock: LogicalClock,
        observer: Arc<dyn ProgressObserver>,
        user_id: &str,
        study_set: StudySet,
    ) -> Self {
        let queue = SessionQueue::new(study_set.items);
        let state = if queue.is_empty() {
            SessionState::Complete
        } else {
            SessionState::Presenting(0)
        };
        Self {
            repo,
            clock,
            observer,
            user_id: user_id.to_string(),
            study_date: study_set.study_date,
            queue,
            state,
            completed_today: study_set.reviewed_today,
            latest: HashMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn study_date(&self) -> DateKey {
        self.study_date
    }

    pub fn queue(&self) -> &SessionQueue {
        &self.queue
    }

    /// Passing answers today, including those from earlier sessions.
    pub fn completed_today(&self) -> u32 {
        self.completed_today
    }

    /// The entry being presented, or `None` once the session is complete.
    pub fn current(&self) -> Option<&ItemEntry> {
        match self.state {
            SessionState::Presenting(_) => self.queue.current().map(|item| &item.entry),
            SessionState::Complete => None,
        }
    }

    pub fn current_item(&self) -> Option<&StudyItem> {
        match self.state {
            SessionState::Presenting(_) => self.queue.current(),
            SessionState::Complete => None,
        }
    }

    /// Grade the current item and move on.
    ///
    /// The review is always persisted. If that write fails the session still
    /// advances; the error is handed back in the outcome and reported to the
    /// observer so the caller can retry or warn that progress may be lost.
    pub async fn answer(
        &mut self,
        quality: Quality,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SchedulingError> {
        let SessionState::Presenting(index) = self.state else {
            return Err(SchedulingError::SessionComplete);
        };
        let item = self
            .queue
            .current()
            .cloned()
            .ok_or(SchedulingError::SessionComplete)?;
        let item_id = item.entry.id.as_str();

        let prior = self.latest.get(item_id).or(item.progress.as_ref());
        let next = apply_review(&self.user_id, item_id, prior, quality, now);
        self.latest.insert(item_id.to_string(), next.clone());

        let persist_error =
            match persist_review(self.repo.as_ref(), &self.clock, &next, quality, now).await {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(
                        user = %self.user_id,
                        item = %item_id,
                        "review not saved, continuing session: {e}"
                    );
                    self.observer.on_persist_failed(&self.user_id, item_id, &e);
                    Some(e)
                }
            };

        let requeued_at = match quality.requeue_gap() {
            Some(gap) => {
                let at = self.queue.insert_at_offset(gap);
                tracing::debug!(item = %item_id, gap, ?at, "re-queued");
                at
            }
            None => {
                self.completed_today = self.completed_today.saturating_add(1);
                self.observer.on_progress(&ProgressEvent {
                    user_id: self.user_id.clone(),
                    study_date: self.study_date,
                    completed_today: self.completed_today,
                });
                None
            }
        };

        self.state = if self.queue.advance() {
            SessionState::Presenting(index + 1)
        } else {
            tracing::info!(
                user = %self.user_id,
                completed_today = self.completed_today,
                "session complete"
            );
            SessionState::Complete
        };

        Ok(AnswerOutcome {
            advanced: true,
            session_complete: self.is_complete(),
            requeued_at,
            state: next,
            persist_error,
        })
    }

    /// [`answer`](Self::answer) for an unchecked quality value.
    pub async fn answer_raw(
        &mut self,
        quality: u8,
        now: DateTime<Utc>,
    ) -> Result<AnswerOutcome, SchedulingError> {
        let quality = Quality::try_from(quality)?;
        self.answer(quality, now).await
    }
}
