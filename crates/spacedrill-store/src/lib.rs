//! spacedrill-store — Repository backends and configuration.
//!
//! Implements the `StudyRepository` trait on top of a JSON snapshot file and
//! provides the configuration layer that picks a backend.

pub mod config;
pub mod error;
pub mod json;

pub use config::{load_config, open_repository, SpacedrillConfig, StoreConfig};
pub use error::StoreError;
pub use json::JsonFileRepository;
