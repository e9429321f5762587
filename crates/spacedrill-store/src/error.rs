//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

use spacedrill_core::error::RepositoryError;

/// Errors raised by file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The data file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data file could not be written or replaced.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The data file is not a valid snapshot.
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Read { .. } | StoreError::Write { .. } => {
                RepositoryError::Io(err.to_string())
            }
            StoreError::Decode { .. } | StoreError::Encode(_) => {
                RepositoryError::Corrupt(err.to_string())
            }
        }
    }
}
