//! Checksum cache
//!
//! Maps a path to the `(modification time, checksum)` pair observed the last
//! time its content was hashed. A lookup whose stored timestamp still equals
//! the file's current modification time returns the cached digest without
//! reading the file again.
//!
//! ## Design Decisions
//!
//! - **Streaming**: files are hashed in 8 KiB chunks so memory use does not
//!   depend on file size.
//! - **Blocking pool**: hashing runs under `spawn_blocking`; async workers
//!   only await the result.
//! - **No eviction**: entries live for the process lifetime. A folder of N
//!   documents costs N entries.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use dashmap::DashMap;
use docsync_core::domain::document::Document;
use docsync_core::domain::newtypes::Checksum;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::ComputationError;

/// Read buffer size used while hashing
pub const CHUNK_SIZE: usize = 8192;

/// In-memory, concurrency-safe checksum cache
#[derive(Debug, Default)]
pub struct ChecksumCache {
    entries: DashMap<PathBuf, (SystemTime, Checksum)>,
}

impl ChecksumCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the checksum of the file at `path`
    ///
    /// Uses the cached value when the file's modification time is unchanged;
    /// otherwise streams the file through SHA-256 and refreshes the entry.
    ///
    /// # Errors
    /// Returns [`ComputationError`] if the file cannot be stat'ed or read
    pub async fn checksum(&self, path: &Path) -> Result<Checksum, ComputationError> {
        self.lookup(path).await.map(|(_, checksum)| checksum)
    }

    /// Computes (or reuses) the checksum of a document and stores it on it
    ///
    /// # Errors
    /// Returns [`ComputationError`] if the file cannot be stat'ed or read
    pub async fn refresh(&self, document: &mut Document) -> Result<Checksum, ComputationError> {
        let (modified, checksum) = self.lookup(document.path()).await?;
        document.set_checksum(modified, checksum.clone());
        Ok(checksum)
    }

    #[instrument(skip(self), fields(path = %path.display()))]
    async fn lookup(&self, path: &Path) -> Result<(SystemTime, Checksum), ComputationError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ComputationError::io(path, e))?;
        if !metadata.is_file() {
            return Err(ComputationError::io(
                path,
                std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let modified = metadata
            .modified()
            .map_err(|e| ComputationError::io(path, e))?;

        if let Some(entry) = self.entries.get(path) {
            let (cached_at, checksum) = entry.value();
            if *cached_at == modified {
                debug!(checksum = %checksum.short(), "checksum cache hit");
                return Ok((modified, checksum.clone()));
            }
        }

        let owned = path.to_path_buf();
        let checksum = tokio::task::spawn_blocking(move || hash_file(&owned))
            .await
            .map_err(|e| ComputationError::Worker {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })??;

        debug!(checksum = %checksum.short(), "checksum computed");
        self.entries
            .insert(path.to_path_buf(), (modified, checksum.clone()));
        Ok((modified, checksum))
    }

    /// Drops the cached entry for `path`, if any
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.remove(path).is_some()
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Streams a file through SHA-256 in [`CHUNK_SIZE`] reads
///
/// Blocking; call from `spawn_blocking` in async contexts.
///
/// # Errors
/// Returns [`ComputationError::Io`] on open or read failure
pub fn hash_file(path: &Path) -> Result<Checksum, ComputationError> {
    let mut file = File::open(path).map_err(|e| ComputationError::io(path, e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ComputationError::io(path, e)),
        };
        hasher.update(&buffer[..read]);
    }

    let mut digest = [0u8; Checksum::DIGEST_LEN];
    digest.copy_from_slice(&hasher.finalize());
    Ok(Checksum::from_digest(&digest))
}

// ============================================================================
// Unit tests
// ============================================================================
