//! Subcommand implementations.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};

use spacedrill_core::clock::LogicalClock;
use spacedrill_core::traits::StudyRepository;
use spacedrill_store::config::{load_config_from, open_repository, SpacedrillConfig};

use crate::GlobalOpts;

pub mod import;
pub mod init;
pub mod plan;
pub mod recite;
pub mod review;
pub mod stats;
pub mod study;
pub mod validate;

/// Config, clock and store resolved from the global options.
pub struct Setup {
    pub config: SpacedrillConfig,
    pub clock: LogicalClock,
    pub repo: Arc<dyn StudyRepository>,
    fixed_now: Option<DateTime<Utc>>,
}

impl Setup {
    pub fn load(global: &GlobalOpts) -> Result<Self> {
        let mut config = load_config_from(global.config.as_deref())?;
        if let Some(data) = &global.data {
            config.set_data_path(data.clone());
        }
        let clock = config.clock()?;
        let repo = open_repository(&config.store)?;
        tracing::debug!(store = ?config.store, "store opened");
        Ok(Self {
            config,
            clock,
            repo,
            fixed_now: global.now,
        })
    }

    /// The `--now` instant if given, otherwise the wall clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.fixed_now.unwrap_or_else(Utc::now)
    }

    pub fn target(&self, override_target: Option<usize>) -> usize {
        override_target.unwrap_or(self.config.daily_target)
    }
}
