use std::path::PathBuf;

use thiserror::Error;

/// Storage failures that end the daemon.
///
/// Losing the state file means the hysteresis memory is gone after a
/// restart, so these are never swallowed by the cycle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to replace {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command timed out")]
    Timeout,

    #[error("{0}")]
    NotFound(String),

    #[error("empty command line")]
    Empty,

    #[error("cannot parse command line: {0}")]
    Parse(String),

    #[error("{0}")]
    Io(String),
}
