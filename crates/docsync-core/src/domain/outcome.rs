//! Upload outcomes and per-pass session counters
//!
//! Every upload task ends in exactly one [`UploadOutcome`]. The coordinator
//! folds outcomes into [`SessionCounters`] as tasks complete.

use serde::{Deserialize, Serialize};

use super::newtypes::{Checksum, RemoteId};

/// Where a duplicate was detected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum DedupSource {
    /// The checksum was already in the local sync state
    Local,
    /// The remote service reported the checksum as already present
    Remote {
        /// Human-readable label the server associated with the content
        label: Option<String>,
    },
}

/// Terminal result of one upload task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum UploadOutcome {
    /// Content was transferred and the checksum newly recorded
    Synced {
        checksum: Checksum,
        remote_id: RemoteId,
    },
    /// Content was already known, locally or remotely; no bytes transferred
    AlreadySynced {
        checksum: Checksum,
        #[serde(flatten)]
        source: DedupSource,
    },
    /// Terminal failure (file unreadable, rejected, or retries exhausted)
    Failed { reason: String },
    /// Not a recognized document type, or never scheduled
    Skipped,
}

impl UploadOutcome {
    /// Shorthand for a failure with a message
    pub fn failed(reason: impl Into<String>) -> Self {
        UploadOutcome::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, UploadOutcome::Synced { .. })
    }

    pub fn is_already_synced(&self) -> bool {
        matches!(self, UploadOutcome::AlreadySynced { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UploadOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, UploadOutcome::Skipped)
    }

    /// Checksum carried by the outcome, if any
    pub fn checksum(&self) -> Option<&Checksum> {
        match self {
            UploadOutcome::Synced { checksum, .. }
            | UploadOutcome::AlreadySynced { checksum, .. } => Some(checksum),
            UploadOutcome::Failed { .. } | UploadOutcome::Skipped => None,
        }
    }

    /// Short label used in progress and summary logs
    pub fn label(&self) -> &'static str {
        match self {
            UploadOutcome::Synced { .. } => "synced",
            UploadOutcome::AlreadySynced { .. } => "already_synced",
            UploadOutcome::Failed { .. } => "failed",
            UploadOutcome::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for UploadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadOutcome::Synced { remote_id, .. } => write!(f, "synced -> {}", remote_id),
            UploadOutcome::AlreadySynced {
                source: DedupSource::Local,
                ..
            } => write!(f, "already synced (local)"),
            UploadOutcome::AlreadySynced {
                source: DedupSource::Remote { label },
                ..
            } => write!(
                f,
                "already synced (remote: {})",
                label.as_deref().unwrap_or("Unknown")
            ),
            UploadOutcome::Failed { reason } => write!(f, "failed: {}", reason),
            UploadOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

// ============================================================================
// SessionCounters
// ============================================================================

/// Aggregate counts for one discovery pass
///
/// `submitted` counts tasks handed to the worker pool; every other field
/// counts terminal outcomes. Once a pass has drained,
/// `completed() == submitted` plus any files settled before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    pub submitted: u64,
    pub synced: u64,
    pub already_synced: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl SessionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one terminal outcome into the counters
    pub fn record(&mut self, outcome: &UploadOutcome) {
        match outcome {
            UploadOutcome::Synced { .. } => self.synced += 1,
            UploadOutcome::AlreadySynced { .. } => self.already_synced += 1,
            UploadOutcome::Failed { .. } => self.failed += 1,
            UploadOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Outcomes that count as success (synced or already present)
    pub fn succeeded(&self) -> u64 {
        self.synced + self.already_synced
    }

    /// Total terminal outcomes recorded
    pub fn completed(&self) -> u64 {
        self.synced + self.already_synced + self.failed + self.skipped
    }

    /// Resets all counters for a new pass
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
