//! Sync coordinator
//!
//! The [`SyncCoordinator`] owns the worker pool. A full pass
//! ([`run_scan`](SyncCoordinator::run_scan)) discovers documents, drops the
//! ones whose checksum is already known, and fans the rest out as
//! [`UploadTask`]s. Live change events go through
//! [`on_candidate`](SyncCoordinator::on_candidate), which shares the same
//! worker limit.
//!
//! ## Pool
//!
//! ```text
//!  discover ─→ prefilter ─→ JoinSet::spawn ─┬─ acquire permit ─→ timeout(task) ─┐
//!                                           ├─ ...                              ├─→ join_next ─→ counters
//!                                           └─ ...                              ┘
//! ```
//!
//! Every task is wrapped so that a timeout or a panic becomes a `Failed`
//! outcome for that file; nothing a task does can abort the pass.
//! Counters are only touched by the controlling task, in completion order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use docsync_core::config::Config;
use docsync_core::domain::document::display_name;
use docsync_core::domain::newtypes::Checksum;
use docsync_core::domain::outcome::{DedupSource, SessionCounters, UploadOutcome};
use docsync_core::ports::remote_sync::IRemoteSyncClient;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::checksum::ChecksumCache;
use crate::scanner::discover_documents;
use crate::state::SyncStateStore;
use crate::task::{RetryPolicy, UploadTask};
use crate::SyncError;

/// Progress is logged every this many completions
pub const PROGRESS_INTERVAL: u64 = 10;

// ============================================================================
// Settings and summary
// ============================================================================

/// Pool sizing and per-task limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Maximum number of concurrently running upload tasks
    pub max_workers: usize,
    /// Upper bound for one task including its retries
    pub task_timeout: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_workers: 5,
            task_timeout: Duration::from_secs(70),
        }
    }
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_workers: config.sync.max_workers.max(1),
            task_timeout: config.sync.task_timeout(),
        }
    }
}

/// Result of one full discovery pass
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Folder that was scanned
    pub root: PathBuf,
    /// Recognized documents found on disk
    pub files_found: usize,
    /// Documents counted as already synced before scheduling: known
    /// checksums and repeats of content scheduled earlier in the pass
    pub prefiltered: usize,
    /// Outcomes of the scheduled tasks
    pub counters: SessionCounters,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Whether the pass was cut short by cancellation
    pub cancelled: bool,
}

// ============================================================================
// SyncCoordinator
// ============================================================================

/// Drives scans and live candidates through a bounded worker pool
pub struct SyncCoordinator {
    task: UploadTask,
    cache: Arc<ChecksumCache>,
    state: Arc<SyncStateStore>,
    settings: CoordinatorSettings,
    workers: Arc<Semaphore>,
    counters: Mutex<SessionCounters>,
    cancel: CancellationToken,
}

impl SyncCoordinator {
    pub fn new(
        cache: Arc<ChecksumCache>,
        state: Arc<SyncStateStore>,
        remote: Arc<dyn IRemoteSyncClient>,
        retry: RetryPolicy,
        settings: CoordinatorSettings,
        cancel: CancellationToken,
    ) -> Self {
        let max_workers = settings.max_workers.max(1);
        info!(
            max_workers,
            task_timeout_secs = settings.task_timeout.as_secs(),
            max_attempts = retry.max_attempts,
            retry_delay_secs = retry.delay.as_secs(),
            "Creating sync coordinator"
        );

        Self {
            task: UploadTask::new(Arc::clone(&cache), Arc::clone(&state), remote, retry),
            cache,
            state,
            settings,
            workers: Arc::new(Semaphore::new(max_workers)),
            counters: Mutex::new(SessionCounters::new()),
            cancel,
        }
    }

    /// Wires a coordinator from the loaded configuration
    pub fn from_config(
        config: &Config,
        state: Arc<SyncStateStore>,
        remote: Arc<dyn IRemoteSyncClient>,
        cancel: CancellationToken,
    ) -> Self {
        Self::new(
            Arc::new(ChecksumCache::new()),
            state,
            remote,
            RetryPolicy::from_config(&config.remote),
            CoordinatorSettings::from_config(config),
            cancel,
        )
    }

    pub fn state(&self) -> &Arc<SyncStateStore> {
        &self.state
    }

    pub fn settings(&self) -> CoordinatorSettings {
        self.settings
    }

    /// Snapshot of the counters of the current (or last) pass
    pub fn counters(&self) -> SessionCounters {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, counters: SessionCounters) {
        *self.counters.lock().unwrap_or_else(PoisonError::into_inner) = counters;
    }

    // ========================================================================
    // Full pass
    // ========================================================================

    /// Scans `root` and uploads every document whose content is not yet synced
    ///
    /// Ends with a forced flush of the sync state, also when cancelled.
    ///
    /// # Errors
    /// Returns [`SyncError`] only if `root` cannot be enumerated. Per-file
    /// problems are reported through the counters.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub async fn run_scan(&self, root: &Path) -> Result<ScanSummary, SyncError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.publish(SessionCounters::new());

        let documents = discover_documents(root).await?;
        let files_found = documents.len();
        info!(files_found, "Scan started");

        // Eager hashing drops already-synced files and repeated content
        // before they occupy a worker.
        let mut counters = SessionCounters::new();
        let mut candidates = Vec::with_capacity(documents.len());
        let mut scheduled: HashSet<Checksum> = HashSet::new();
        let mut prefiltered = 0usize;
        for path in documents {
            if self.cancel.is_cancelled() {
                candidates.push(path);
                continue;
            }
            match self.cache.checksum(&path).await {
                Ok(checksum) if self.state.is_known(&checksum) => {
                    info!(file = %display_name(&path), "Already synced");
                    counters.record(&UploadOutcome::AlreadySynced {
                        checksum,
                        source: DedupSource::Local,
                    });
                    prefiltered += 1;
                }
                Ok(checksum) if scheduled.contains(&checksum) => {
                    info!(file = %display_name(&path), "Same content already scheduled in this pass");
                    counters.record(&UploadOutcome::AlreadySynced {
                        checksum,
                        source: DedupSource::Local,
                    });
                    prefiltered += 1;
                }
                Ok(checksum) => {
                    scheduled.insert(checksum);
                    candidates.push(path);
                }
                Err(e) => {
                    // Scheduled anyway so the failure is reported per file.
                    debug!(error = %e, "Prefilter hashing failed");
                    candidates.push(path);
                }
            }
        }
        self.publish(counters);
        info!(
            files_found,
            prefiltered,
            to_process = candidates.len(),
            "Prefilter complete"
        );

        let counters = self.drain_pool(candidates, counters).await;

        if let Err(e) = self.state.flush(true).await {
            error!(error = %e, "Final flush of sync state failed");
        }

        let summary = ScanSummary {
            root: root.to_path_buf(),
            files_found,
            prefiltered,
            counters,
            started_at,
            duration: clock.elapsed(),
            cancelled: self.cancel.is_cancelled(),
        };
        info!(
            files_found = summary.files_found,
            prefiltered = summary.prefiltered,
            synced = counters.synced,
            already_synced = counters.already_synced,
            failed = counters.failed,
            skipped = counters.skipped,
            duration_ms = summary.duration.as_millis() as u64,
            cancelled = summary.cancelled,
            "Scan complete"
        );
        Ok(summary)
    }

    async fn drain_pool(
        &self,
        candidates: Vec<PathBuf>,
        mut counters: SessionCounters,
    ) -> SessionCounters {
        let total = counters.completed() + candidates.len() as u64;
        let mut join_set = JoinSet::new();

        for path in candidates {
            let task = self.task.clone();
            let workers = Arc::clone(&self.workers);
            let cancel = self.cancel.clone();
            let limit = self.settings.task_timeout;

            join_set.spawn(async move {
                let _permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return (path, UploadOutcome::Skipped),
                    permit = workers.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (path, UploadOutcome::Skipped),
                    },
                };
                if cancel.is_cancelled() {
                    return (path, UploadOutcome::Skipped);
                }
                let outcome = run_guarded(task, path.clone(), limit).await;
                (path, outcome)
            });
            counters.submitted += 1;
        }
        self.publish(counters);

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((path, outcome)) => {
                    debug!(file = %display_name(&path), outcome = outcome.label(), "Task finished");
                    counters.record(&outcome);
                }
                Err(e) => {
                    error!(error = %e, "Worker wrapper did not complete");
                    counters.record(&UploadOutcome::failed(e.to_string()));
                }
            }
            self.publish(counters);

            let completed = counters.completed();
            if completed % PROGRESS_INTERVAL == 0 || completed == total {
                info!(
                    completed,
                    total,
                    synced = counters.synced,
                    already_synced = counters.already_synced,
                    failed = counters.failed,
                    "Progress"
                );
            }
        }

        counters
    }

    // ========================================================================
    // Live candidates
    // ========================================================================

    /// Runs the per-file pipeline for a path from the live change stream
    ///
    /// Waits for a worker slot, so live events and a running scan together
    /// never exceed the pool size.
    #[instrument(skip(self), fields(file = %display_name(path)))]
    pub async fn on_candidate(&self, path: &Path) -> UploadOutcome {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return UploadOutcome::Skipped,
            permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return UploadOutcome::Skipped,
            },
        };
        run_guarded(self.task.clone(), path.to_path_buf(), self.settings.task_timeout).await
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Stops accepting work and writes the sync state unconditionally
    ///
    /// Returns whether the final write succeeded.
    pub async fn shutdown(&self) -> bool {
        self.cancel.cancel();
        match self.state.flush(true).await {
            Ok(_) => {
                info!(
                    path = %self.state.path().display(),
                    checksums = self.state.len(),
                    "Sync state saved"
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Final flush of sync state failed");
                false
            }
        }
    }
}

/// Runs one task on its own tokio task under a timeout
///
/// A timeout aborts the inner task; a panic is caught by the join. Both
/// become `Failed` for this file only.
async fn run_guarded(task: UploadTask, path: PathBuf, limit: Duration) -> UploadOutcome {
    let file = display_name(&path);
    let mut handle = tokio::spawn(async move { task.run(&path).await });

    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) if e.is_panic() => {
            error!(file = %file, "Upload task panicked");
            UploadOutcome::failed("upload task panicked")
        }
        Ok(Err(e)) => {
            warn!(file = %file, error = %e, "Upload task cancelled");
            UploadOutcome::failed(format!("upload task cancelled: {e}"))
        }
        Err(_) => {
            handle.abort();
            error!(file = %file, timeout_secs = limit.as_secs(), "Upload task timed out");
            UploadOutcome::failed(format!("timed out after {}s", limit.as_secs_f64()))
        }
    }
}

// ============================================================================
// Unit tests
// ============================================================================
