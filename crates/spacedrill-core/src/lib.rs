//! spacedrill-core — Spaced-repetition scheduling engine.
//!
//! This crate defines the data model, the review policy, daily task
//! generation and live study sessions, plus the repository and observer
//! traits the engine is driven through.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod generator;
pub mod memory;
pub mod model;
pub mod policy;
pub mod review;
pub mod session;
pub mod stats;
pub mod traits;

pub use clock::{logical_date, LogicalClock};
pub use error::{RepositoryError, SchedulingError};
pub use generator::{ensure_daily_tasks, load_study_set, DailyPlan, StudySet};
pub use model::{DailyTask, DateKey, ItemEntry, Quality, SchedulingState, StudyItem};
pub use policy::apply_review;
pub use session::{AnswerOutcome, SessionState, StudySession};
pub use traits::{ProgressObserver, StudyRepository};
