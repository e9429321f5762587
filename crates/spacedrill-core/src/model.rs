//! Core data model types for spacedrill.
//!
//! These are the records the scheduling engine reads and writes: per-item
//! scheduling state, the day's task list, catalog entries and the joined
//! study items a session presents.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SchedulingError;

/// Starting ease factor for an item that has never been reviewed.
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;

/// Lower bound for the ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Learner's recall rating after seeing the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quality {
    Forgot = 0,
    Hard = 1,
    Good = 2,
    Easy = 3,
}

impl Quality {
    pub const ALL: [Quality; 4] = [Quality::Forgot, Quality::Hard, Quality::Good, Quality::Easy];

    /// Whether an answer of this quality marks the day's task completed.
    pub fn completes_task(self) -> bool {
        matches!(self, Quality::Good | Quality::Easy)
    }

    /// How far ahead a struggling item is re-inserted into the live queue.
    pub fn requeue_gap(self) -> Option<usize> {
        match self {
            Quality::Forgot => Some(3),
            Quality::Hard => Some(10),
            Quality::Good | Quality::Easy => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Forgot => "forgot",
            Quality::Hard => "hard",
            Quality::Good => "good",
            Quality::Easy => "easy",
        }
    }
}

impl TryFrom<u8> for Quality {
    type Error = SchedulingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Quality::Forgot),
            1 => Ok(Quality::Hard),
            2 => Ok(Quality::Good),
            3 => Ok(Quality::Easy),
            other => Err(SchedulingError::InvalidQuality(other)),
        }
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> Self {
        q as u8
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", *self as u8, self.label())
    }
}

impl FromStr for Quality {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "0" | "forgot" | "again" => Ok(Quality::Forgot),
            "1" | "hard" => Ok(Quality::Hard),
            "2" | "good" => Ok(Quality::Good),
            "3" | "easy" => Ok(Quality::Easy),
            other => match other.parse::<u8>() {
                Ok(value) => Err(SchedulingError::InvalidQuality(value)),
                Err(_) => Err(SchedulingError::UnrecognizedQuality(s.trim().to_string())),
            },
        }
    }
}

/// Coarse lifecycle stage of an item for one learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    New,
    Learning,
    Review,
    Relearning,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::New => write!(f, "new"),
            ReviewStatus::Learning => write!(f, "learning"),
            ReviewStatus::Review => write!(f, "review"),
            ReviewStatus::Relearning => write!(f, "relearning"),
        }
    }
}

/// Durable per-user, per-item review history and next due instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingState {
    pub user_id: String,
    pub item_id: String,
    /// Multiplicative growth rate for successful intervals, never below 1.3.
    pub ease_factor: f64,
    /// Days until the next due date, as of the last update.
    pub interval_days: u32,
    /// Completed reviews; only ever increases.
    pub review_count: u32,
    pub status: ReviewStatus,
    pub next_due_at: DateTime<Utc>,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

impl SchedulingState {
    /// The implicit starting point for an item with no stored state.
    pub fn fresh(user_id: &str, item_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            ease_factor: DEFAULT_EASE_FACTOR,
            interval_days: 0,
            review_count: 0,
            status: ReviewStatus::New,
            next_due_at: now,
            last_reviewed_at: None,
        }
    }

    pub fn is_due(&self, as_of: DateTime<Utc>) -> bool {
        self.next_due_at <= as_of
    }
}

/// Logical study-day key, rendered as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(DateKey)
    }
}

/// Why an item is in today's plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Review,
    New,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Review => write!(f, "review"),
            TaskKind::New => write!(f, "new"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One scheduled review or new-item introduction for one study day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: Uuid,
    /// Generation batch this row was inserted with.
    pub batch_id: Uuid,
    pub user_id: String,
    pub item_id: String,
    pub study_date: DateKey,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

impl DailyTask {
    pub fn pending(
        batch_id: Uuid,
        user_id: &str,
        item_id: &str,
        study_date: DateKey,
        kind: TaskKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            user_id: user_id.to_string(),
            item_id: item_id.to_string(),
            study_date,
            kind,
            status: TaskStatus::Pending,
            created_at,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

/// A vocabulary or grammar record from the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEntry {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub romanization: Option<String>,
    #[serde(default)]
    pub part_of_speech: String,
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
    #[serde(default)]
    pub example_meaning: Option<String>,
}

/// A catalog entry joined with the learner's state and its task kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyItem {
    pub entry: ItemEntry,
    #[serde(default)]
    pub progress: Option<SchedulingState>,
    pub kind: TaskKind,
}

impl StudyItem {
    pub fn is_new(&self) -> bool {
        self.kind == TaskKind::New
    }
}
