//! Scheduling error types.
//!
//! Repository failures are kept distinct from an empty result so callers can
//! tell "nothing due" from "could not ask".

use thiserror::Error;

use crate::model::DateKey;

/// Failures reported by a [`StudyRepository`](crate::traits::StudyRepository).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    /// The store could not be reached.
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// A write violated a uniqueness constraint.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Reading or writing the backing storage failed.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored data could not be decoded.
    #[error("corrupt repository data: {0}")]
    Corrupt(String),
}

impl RepositoryError {
    /// Returns `true` if this is a uniqueness violation on insert.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RepositoryError::Conflict(_))
    }

    /// Returns `true` if retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_) | RepositoryError::Io(_))
    }
}

/// Errors surfaced by the scheduling engine.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// Quality outside the four recall tiers.
    #[error("invalid quality {0}: expected 0 (forgot), 1 (hard), 2 (good) or 3 (easy)")]
    InvalidQuality(u8),

    /// Quality text that is neither a digit nor a tier name.
    #[error("unrecognized quality '{0}': expected 0-3 or forgot, hard, good, easy")]
    UnrecognizedQuality(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// More than one generation batch exists for a single study day.
    #[error("generation race for user {user_id} on {study_date}: {batches} task batches found")]
    GenerationRace {
        user_id: String,
        study_date: DateKey,
        batches: usize,
    },

    /// `answer` was called after the queue was exhausted.
    #[error("study session is already complete")]
    SessionComplete,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SchedulingError {
    /// Returns `true` for caller bugs that must never be retried.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            SchedulingError::InvalidQuality(_)
                | SchedulingError::UnrecognizedQuality(_)
                | SchedulingError::SessionComplete
                | SchedulingError::InvalidConfig(_)
        )
    }
}
