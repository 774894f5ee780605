//! Sync state store
//!
//! Holds the set of checksums whose content is known to be on the remote
//! side and persists it to a JSON array (`sync_history.json`).
//!
//! ## Batched persistence
//!
//! Every newly recorded checksum bumps a pending counter. A non-forced
//! [`flush`](SyncStateStore::flush) writes only once the counter reaches the
//! batch threshold; a forced flush always writes. Membership insert and
//! counter increment share one mutex, so concurrent workers can never skip
//! or double count a threshold crossing.
//!
//! ## Claims
//!
//! A task that is about to upload takes a [`Claim`] on its checksum under the
//! same mutex that guards membership. While a claim is held, other tasks
//! with identical content see [`Claim::InFlight`] instead of racing to
//! upload it again. Dropping the [`ClaimGuard`] releases the claim.
//!
//! Writes are serialized by a second (async) lock that is taken *before*
//! the snapshot, so an older snapshot can never land on disk after a newer
//! one. Each write goes to `<file>.tmp` and is renamed over the target.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use docsync_core::domain::newtypes::Checksum;
use tracing::{debug, info, warn};

use crate::PersistenceError;

#[derive(Debug, Default)]
struct StateInner {
    synced: HashSet<Checksum>,
    /// Checksums currently claimed by a running task
    in_flight: HashSet<Checksum>,
    pending: usize,
}

/// Result of [`SyncStateStore::try_claim`]
#[derive(Debug)]
pub enum Claim<'a> {
    /// Already recorded as synced
    Known,
    /// Another task holds the claim
    InFlight,
    /// The caller now owns the checksum until the guard is dropped
    Acquired(ClaimGuard<'a>),
}

/// Exclusive right to upload one checksum
///
/// Releases the claim on drop, including when the owning task is aborted.
#[derive(Debug)]
pub struct ClaimGuard<'a> {
    store: &'a SyncStateStore,
    checksum: Checksum,
}

impl ClaimGuard<'_> {
    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.store.lock().in_flight.remove(&self.checksum);
    }
}

/// Owner of the "already synced" checksum set
#[derive(Debug)]
pub struct SyncStateStore {
    path: PathBuf,
    batch_threshold: usize,
    inner: Mutex<StateInner>,
    write_lock: tokio::sync::Mutex<()>,
}

impl SyncStateStore {
    /// Creates an empty store that persists to `path`
    ///
    /// A threshold of 0 is treated as 1.
    pub fn new(path: PathBuf, batch_threshold: usize) -> Self {
        Self::with_checksums(path, batch_threshold, HashSet::new())
    }

    fn with_checksums(path: PathBuf, batch_threshold: usize, synced: HashSet<Checksum>) -> Self {
        Self {
            path,
            batch_threshold: batch_threshold.max(1),
            inner: Mutex::new(StateInner {
                synced,
                in_flight: HashSet::new(),
                pending: 0,
            }),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Loads the persisted state from `path`
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file
    /// also yields an empty store and logs a warning; startup never fails
    /// because of the state file. Individual entries that are not valid
    /// checksums are skipped.
    pub async fn load(path: PathBuf, batch_threshold: usize) -> Self {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No sync state found, starting empty");
                return Self::new(path, batch_threshold);
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read sync state, starting empty");
                return Self::new(path, batch_threshold);
            }
        };

        let entries: Vec<String> = match serde_json::from_slice(&bytes) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt sync state, starting empty");
                return Self::new(path, batch_threshold);
            }
        };

        let mut synced = HashSet::with_capacity(entries.len());
        for entry in entries {
            match entry.parse::<Checksum>() {
                Ok(checksum) => {
                    synced.insert(checksum);
                }
                Err(e) => warn!(error = %e, "Skipping invalid entry in sync state"),
            }
        }

        info!(path = %path.display(), count = synced.len(), "Loaded sync state");
        Self::with_checksums(path, batch_threshold, synced)
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Returns true if the checksum is already recorded as synced
    pub fn is_known(&self, checksum: &Checksum) -> bool {
        self.lock().synced.contains(checksum)
    }

    /// Claims `checksum` for upload unless it is known or already claimed
    ///
    /// Membership check and claim happen in one critical section.
    pub fn try_claim(&self, checksum: &Checksum) -> Claim<'_> {
        let mut inner = self.lock();
        if inner.synced.contains(checksum) {
            Claim::Known
        } else if !inner.in_flight.insert(checksum.clone()) {
            Claim::InFlight
        } else {
            Claim::Acquired(ClaimGuard {
                store: self,
                checksum: checksum.clone(),
            })
        }
    }

    /// Number of checksums currently claimed
    pub fn in_flight(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Records a checksum as synced
    ///
    /// Idempotent. Returns `true` if the checksum was new, in which case the
    /// pending counter was incremented in the same critical section.
    pub fn record_synced(&self, checksum: Checksum) -> bool {
        let mut inner = self.lock();
        let inserted = inner.synced.insert(checksum);
        if inserted {
            inner.pending += 1;
        }
        inserted
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Writes the full checksum set to disk
    ///
    /// With `force = false` the write only happens once at least
    /// `batch_threshold` checksums were recorded since the last write.
    /// With `force = true` it always happens.
    ///
    /// # Returns
    /// `Ok(true)` if a write took place, `Ok(false)` if below threshold.
    ///
    /// # Errors
    /// Returns [`PersistenceError`] if serialization or the write fails. The
    /// pending count is restored so the next flush retries.
    pub async fn flush(&self, force: bool) -> Result<bool, PersistenceError> {
        let _write_guard = self.write_lock.lock().await;

        let (snapshot, taken) = {
            let mut inner = self.lock();
            if !force && inner.pending < self.batch_threshold {
                return Ok(false);
            }
            let taken = inner.pending;
            inner.pending = 0;

            let mut snapshot: Vec<&str> = inner.synced.iter().map(Checksum::as_str).collect();
            snapshot.sort_unstable();
            let json = serde_json::to_vec_pretty(&snapshot);
            (json, taken)
        };

        let result = match snapshot {
            Ok(json) => self.write_atomic(&json).await,
            Err(e) => Err(PersistenceError::from(e)),
        };

        match result {
            Ok(()) => {
                debug!(path = %self.path.display(), flushed = taken, force, "Sync state written");
                Ok(true)
            }
            Err(e) => {
                self.lock().pending += taken;
                Err(e)
            }
        }
    }

    async fn write_atomic(&self, data: &[u8]) -> Result<(), PersistenceError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| PersistenceError::Io { path, source }
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(io_err(parent))?;
            }
        }

        let tmp_path = {
            let mut p = self.path.as_os_str().to_owned();
            p.push(".tmp");
            PathBuf::from(p)
        };

        tokio::fs::write(&tmp_path, data)
            .await
            .map_err(io_err(&tmp_path))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_err(&self.path))?;
        Ok(())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Number of known checksums
    pub fn len(&self) -> usize {
        self.lock().synced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().synced.is_empty()
    }

    /// Checksums recorded since the last successful write
    pub fn pending(&self) -> usize {
        self.lock().pending
    }

    pub fn batch_threshold(&self) -> usize {
        self.batch_threshold
    }

    /// Location of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Unit tests
// ============================================================================
