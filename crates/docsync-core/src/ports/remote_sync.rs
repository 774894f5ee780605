//! Remote sync client port (driven/secondary port)
//!
//! This module defines the interface the sync engine uses to talk to the
//! remote document service. The HTTP implementation lives in
//! `docsync-remote`; tests use in-memory fakes.
//!
//! ## Design Notes
//!
//! - Both operations return tri-state results instead of `Result`: the
//!   caller's policy (fail-open, retry, give up) depends on which failure
//!   class occurred, so the classification is part of the contract.
//! - Uses `#[async_trait]` for async trait methods.

use crate::domain::document::{DocumentKind, MetadataHints};
use crate::domain::newtypes::{Checksum, RemoteId};

// ============================================================================
// DuplicateCheck
// ============================================================================

/// Answer to "does the remote side already have this checksum?"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    /// Content is already on the remote side
    Exists {
        /// Optional human-readable label (e.g. the candidate name)
        label: Option<String>,
    },
    /// The remote side has never seen this checksum
    NotFound,
    /// The check could not be completed; callers proceed with the upload
    TransientError(String),
}

// ============================================================================
// UploadResult
// ============================================================================

/// Result of a single upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// Content accepted; the server assigned an identifier
    Success(RemoteId),
    /// Request or content rejected; retrying will not help
    PermanentError(String),
    /// Server-side or network failure; a retry may succeed
    TransientError(String),
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, UploadResult::TransientError(_))
    }
}

// ============================================================================
// UploadRequest
// ============================================================================

/// Everything the remote side needs to ingest one document
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File name sent in the multipart form
    pub file_name: String,
    /// Document kind (determines the MIME type)
    pub kind: DocumentKind,
    /// Full file content
    pub content: Vec<u8>,
    /// Checksum of `content`
    pub checksum: Checksum,
    /// Best-effort hints extracted from the path
    pub hints: MetadataHints,
}

impl UploadRequest {
    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }
}

// ============================================================================
// IRemoteSyncClient
// ============================================================================

/// Port trait for the remote document service
///
/// ## Implementation Notes
///
/// - Implementations must not retry internally; the upload task owns the
///   retry policy.
/// - Implementations should apply their own request timeouts; the
///   coordinator's per-task timeout is only a backstop.
#[async_trait::async_trait]
pub trait IRemoteSyncClient: Send + Sync {
    /// Asks whether content with this checksum already exists remotely
    async fn check_duplicate(&self, checksum: &Checksum) -> DuplicateCheck;

    /// Uploads one document
    async fn upload(&self, request: &UploadRequest) -> UploadResult;
}
