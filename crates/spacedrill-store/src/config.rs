//! Engine configuration and repository factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use spacedrill_core::clock::LogicalClock;
use spacedrill_core::generator::DEFAULT_DAILY_TARGET;
use spacedrill_core::memory::MemoryRepository;
use spacedrill_core::traits::StudyRepository;

use crate::json::JsonFileRepository;

/// Where scheduling data is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; nothing survives exit.
    Memory,
    Json {
        #[serde(default = "default_data_path")]
        path: PathBuf,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Json {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./spacedrill-data.json")
}

/// Top-level spacedrill configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacedrillConfig {
    /// Upper bound on tasks generated per study day.
    #[serde(default = "default_daily_target")]
    pub daily_target: usize,
    /// Local hour at which a new study day begins.
    #[serde(default = "default_day_start_hour")]
    pub day_start_hour: u32,
    /// Learner's offset from UTC, in minutes east.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_daily_target() -> usize {
    DEFAULT_DAILY_TARGET
}
fn default_day_start_hour() -> u32 {
    4
}

impl Default for SpacedrillConfig {
    fn default() -> Self {
        Self {
            daily_target: default_daily_target(),
            day_start_hour: default_day_start_hour(),
            utc_offset_minutes: 0,
            store: StoreConfig::default(),
        }
    }
}

impl SpacedrillConfig {
    /// Build the logical clock described by this config.
    pub fn clock(&self) -> Result<LogicalClock> {
        LogicalClock::with_offset_minutes(self.day_start_hour, self.utc_offset_minutes)
            .context("invalid clock settings")
    }

    /// Point the store at a JSON file, replacing whatever was configured.
    pub fn set_data_path(&mut self, path: impl Into<PathBuf>) {
        self.store = StoreConfig::Json { path: path.into() };
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are inserted verbatim and never rescanned.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `spacedrill.toml` in the current directory
/// 2. `~/.config/spacedrill/config.toml`
/// 3. built-in defaults
///
/// Environment variable overrides: `SPACEDRILL_DAILY_TARGET`, `SPACEDRILL_DATA`.
pub fn load_config() -> Result<SpacedrillConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
///
/// An explicit path (`--config`) takes precedence over the search in
/// [`load_config`] and must exist.
pub fn load_config_from(path: Option<&Path>) -> Result<SpacedrillConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("spacedrill.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<SpacedrillConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SpacedrillConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut SpacedrillConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(target) = lookup("SPACEDRILL_DAILY_TARGET") {
        config.daily_target = target
            .trim()
            .parse()
            .with_context(|| format!("SPACEDRILL_DAILY_TARGET is not a number: {target}"))?;
    }
    if let Some(data) = lookup("SPACEDRILL_DATA") {
        config.set_data_path(data);
    }

    if let StoreConfig::Json { path } = &mut config.store {
        let resolved = resolve_env_vars(&path.to_string_lossy());
        *path = PathBuf::from(resolved);
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("spacedrill"))
}

/// Open the repository described by `config`.
pub fn open_repository(config: &StoreConfig) -> Result<Arc<dyn StudyRepository>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryRepository::new())),
        StoreConfig::Json { path } => {
            let repo = JsonFileRepository::open(path)
                .with_context(|| format!("failed to open data file: {}", path.display()))?;
            Ok(Arc::new(repo))
        }
    }
}
