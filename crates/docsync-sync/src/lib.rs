//! DocSync Sync - content-deduplicating upload engine
//!
//! Provides:
//! - SHA-256 checksum cache keyed by modification time
//! - Sync state store with batched, atomic persistence
//! - Upload task pipeline with bounded retry
//! - Bounded worker pool for full directory scans
//! - Live monitoring via debounced filesystem events
//!
//! ## Modules
//!
//! - [`checksum`] - Checksum cache (hashing on the blocking pool)
//! - [`state`] - Sync state store (`sync_history.json`)
//! - [`task`] - Per-file upload pipeline and retry policy
//! - [`scanner`] - Recursive document discovery
//! - [`coordinator`] - Worker pool, progress and session counters
//! - [`watcher`] - Filesystem watcher and debounced change queue
//! - [`scheduler`] - Forwards settled change events to the coordinator

pub mod checksum;
pub mod coordinator;
pub mod scanner;
pub mod scheduler;
pub mod state;
pub mod task;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::PathBuf;

use thiserror::Error;

/// A file's checksum could not be computed or its bytes could not be read
#[derive(Debug, Error)]
pub enum ComputationError {
    /// The file could not be opened, stat'ed or read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The hashing worker panicked or was cancelled
    #[error("hashing task for {path} did not complete: {reason}")]
    Worker { path: PathBuf, reason: String },
}

impl ComputationError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ComputationError::Io {
            path: path.into(),
            source,
        }
    }

    /// Path of the file that failed
    pub fn path(&self) -> &std::path::Path {
        match self {
            ComputationError::Io { path, .. } | ComputationError::Worker { path, .. } => path,
        }
    }
}

/// The sync state could not be written to durable storage
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors that abort a whole scan pass (never a single task)
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error occurred while enumerating the sync folder
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The scan root does not exist or is not a directory
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}
