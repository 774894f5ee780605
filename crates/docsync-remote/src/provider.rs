//! HttpRemoteSync - IRemoteSyncClient implementation over HTTP
//!
//! Wraps the [`HttpSyncClient`] and folds its [`RemoteError`]s into the
//! tri-state results of the [`IRemoteSyncClient`] port.
//!
//! ## Design Notes
//!
//! - No retries happen here; the upload task owns the retry policy.
//! - Every duplicate-check failure is transient, so the caller can fail
//!   open and upload anyway.

use async_trait::async_trait;
use docsync_core::config::RemoteConfig;
use docsync_core::domain::newtypes::Checksum;
use docsync_core::ports::remote_sync::{
    DuplicateCheck, IRemoteSyncClient, UploadRequest, UploadResult,
};
use tracing::warn;

use crate::client::HttpSyncClient;
use crate::upload;
use crate::RemoteError;

/// Remote sync port backed by the document service's HTTP API
#[derive(Clone)]
pub struct HttpRemoteSync {
    client: HttpSyncClient,
}

impl HttpRemoteSync {
    pub fn new(client: HttpSyncClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(HttpSyncClient::from_config(config))
    }

    pub fn client(&self) -> &HttpSyncClient {
        &self.client
    }
}

/// Maps an upload failure onto the port's permanent/transient split
fn classify_upload_error(error: RemoteError) -> UploadResult {
    if error.is_transient() {
        return UploadResult::TransientError(error.to_string());
    }
    match error {
        RemoteError::Status { message, .. } => UploadResult::PermanentError(message),
        other => UploadResult::PermanentError(other.to_string()),
    }
}

#[async_trait]
impl IRemoteSyncClient for HttpRemoteSync {
    async fn check_duplicate(&self, checksum: &Checksum) -> DuplicateCheck {
        match self.client.check_duplicate(checksum).await {
            Ok(answer) if answer.exists => DuplicateCheck::Exists {
                label: answer.candidate_name,
            },
            Ok(_) => DuplicateCheck::NotFound,
            Err(e) => {
                warn!(checksum = %checksum.short(), error = %e, "Duplicate check failed");
                DuplicateCheck::TransientError(e.to_string())
            }
        }
    }

    async fn upload(&self, request: &UploadRequest) -> UploadResult {
        match upload::upload_document(&self.client, request).await {
            Ok(remote_id) => UploadResult::Success(remote_id),
            Err(e) => classify_upload_error(e),
        }
    }
}
