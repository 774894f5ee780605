//! Per-file upload pipeline
//!
//! An [`UploadTask`] drives one path through the stages
//!
//! ```text
//! Pending ─→ Hashing ─→ LocalDedupCheck ─→ RemoteDedupCheck ─→ Uploading ─→ Recording
//!              │              │                   │                │
//!              ▼              ▼                   ▼                ▼
//!           Failed     AlreadySynced       AlreadySynced   Failed (permanent /
//!                         (local)            (remote)        retries exhausted)
//! ```
//!
//! and always ends with exactly one [`UploadOutcome`]. Errors never escape
//! the task: they are folded into `Failed { reason }`.
//!
//! ## Retry
//!
//! Only the upload stage retries, and only on transient failures: up to
//! `max_attempts` calls with a fixed delay in between. The duplicate check
//! is fail-open instead: if it cannot be answered the upload proceeds.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use docsync_core::config::RemoteConfig;
use docsync_core::domain::document::{display_name, Document};
use docsync_core::domain::newtypes::{Checksum, RemoteId};
use docsync_core::domain::outcome::{DedupSource, UploadOutcome};
use docsync_core::ports::remote_sync::{
    DuplicateCheck, IRemoteSyncClient, UploadRequest, UploadResult,
};
use tracing::{debug, error, info, warn};

use crate::checksum::ChecksumCache;
use crate::state::{Claim, SyncStateStore};
use crate::ComputationError;

// ============================================================================
// RetryPolicy
// ============================================================================

/// Bounded, fixed-delay retry policy for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one (at least 1)
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(remote: &RemoteConfig) -> Self {
        Self::new(remote.retry_count, remote.retry_delay())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

// ============================================================================
// UploadTask
// ============================================================================

/// Runs the dedup-then-upload pipeline for single paths
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct UploadTask {
    cache: Arc<ChecksumCache>,
    state: Arc<SyncStateStore>,
    remote: Arc<dyn IRemoteSyncClient>,
    retry: RetryPolicy,
}

impl UploadTask {
    pub fn new(
        cache: Arc<ChecksumCache>,
        state: Arc<SyncStateStore>,
        remote: Arc<dyn IRemoteSyncClient>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            cache,
            state,
            remote,
            retry,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Processes one path and logs the terminal outcome
    ///
    /// Paths without a recognized document extension are `Skipped` without
    /// touching the file.
    pub async fn run(&self, path: &Path) -> UploadOutcome {
        let outcome = match Document::new(path.to_path_buf()) {
            Some(mut document) => self.process(&mut document).await,
            None => UploadOutcome::Skipped,
        };
        log_outcome(path, &outcome);
        outcome
    }

    async fn process(&self, document: &mut Document) -> UploadOutcome {
        // Hashing
        let checksum = match self.cache.refresh(document).await {
            Ok(checksum) => checksum,
            Err(e) => return UploadOutcome::failed(e.to_string()),
        };

        // LocalDedupCheck; the claim is held until the outcome is recorded
        let _claim = match self.state.try_claim(&checksum) {
            Claim::Acquired(guard) => guard,
            Claim::Known => {
                return UploadOutcome::AlreadySynced {
                    checksum,
                    source: DedupSource::Local,
                }
            }
            Claim::InFlight => {
                debug!(
                    file = %document.file_name(),
                    checksum = %checksum.short(),
                    "Same content is being synced by another task"
                );
                return UploadOutcome::AlreadySynced {
                    checksum,
                    source: DedupSource::Local,
                };
            }
        };

        // RemoteDedupCheck
        match self.remote.check_duplicate(&checksum).await {
            DuplicateCheck::Exists { label } => {
                self.record(checksum.clone()).await;
                return UploadOutcome::AlreadySynced {
                    checksum,
                    source: DedupSource::Remote { label },
                };
            }
            DuplicateCheck::NotFound => {
                debug!(checksum = %checksum.short(), "Not present remotely");
            }
            DuplicateCheck::TransientError(message) => {
                warn!(
                    file = %document.file_name(),
                    error = %message,
                    "Duplicate check failed, uploading anyway"
                );
            }
        }

        // Uploading
        let content = match tokio::fs::read(document.path()).await {
            Ok(content) => content,
            Err(e) => {
                return UploadOutcome::failed(ComputationError::io(document.path(), e).to_string())
            }
        };
        let request = UploadRequest {
            file_name: document.file_name(),
            kind: document.kind(),
            content,
            checksum: checksum.clone(),
            hints: document.metadata_hints(),
        };

        match self.upload_with_retry(&request).await {
            Ok(remote_id) => {
                // Recording
                self.record(checksum.clone()).await;
                UploadOutcome::Synced {
                    checksum,
                    remote_id,
                }
            }
            Err(reason) => UploadOutcome::Failed { reason },
        }
    }

    /// Bounded retry loop around [`IRemoteSyncClient::upload`]
    async fn upload_with_retry(
        &self,
        request: &UploadRequest,
    ) -> Result<RemoteId, String> {
        let max_attempts = self.retry.max_attempts;
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.remote.upload(request).await {
                UploadResult::Success(remote_id) => {
                    if attempt > 1 {
                        info!(file = %request.file_name, attempt, "Upload succeeded after retry");
                    }
                    return Ok(remote_id);
                }
                UploadResult::PermanentError(message) => return Err(message),
                UploadResult::TransientError(message) => {
                    if attempt < max_attempts {
                        warn!(
                            file = %request.file_name,
                            attempt,
                            max_attempts,
                            delay_secs = self.retry.delay.as_secs_f64(),
                            error = %message,
                            "Transient upload error, retrying"
                        );
                        tokio::time::sleep(self.retry.delay).await;
                    }
                    last_error = message;
                }
            }
        }

        Err(format!("{last_error} (gave up after {max_attempts} attempts)"))
    }

    /// Records a checksum and gives batched persistence a chance to run
    async fn record(&self, checksum: Checksum) {
        if self.state.record_synced(checksum) {
            if let Err(e) = self.state.flush(false).await {
                warn!(error = %e, "Failed to persist sync state, will retry on next flush");
            }
        }
    }
}

fn log_outcome(path: &Path, outcome: &UploadOutcome) {
    let file = display_name(path);
    match outcome {
        UploadOutcome::Failed { reason } => error!(file = %file, reason = %reason, "Upload failed"),
        UploadOutcome::Skipped => info!(file = %file, "Skipped"),
        other => info!(file = %file, outcome = %other, "Done"),
    }
}

// ============================================================================
// Unit tests
// ============================================================================
