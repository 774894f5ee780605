//! DocSync Remote - HTTP client for the remote document service
//!
//! Provides the async adapter behind the
//! [`IRemoteSyncClient`](docsync_core::ports::remote_sync::IRemoteSyncClient)
//! port:
//! - Checksum duplicate checks (`POST /api/sync/check-duplicate`)
//! - Multipart document uploads (`POST /api/sync/upload`)
//!
//! ## Modules
//!
//! - [`client`] - HTTP client, request construction and status handling
//! - [`upload`] - Multipart form construction for uploads
//! - [`provider`] - `IRemoteSyncClient` implementation over [`client::HttpSyncClient`]

pub mod client;
pub mod provider;
pub mod upload;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur when talking to the remote document service
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Status {
        /// Status code returned by the server
        status: StatusCode,
        /// The server's `message` field, or `HTTP <status>` when absent
        message: String,
    },

    /// Connection, timeout or body transfer failure
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The response could not be parsed or was missing required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether retrying the same request could succeed
    ///
    /// Server errors, `429 Too Many Requests`, `408 Request Timeout`,
    /// network failures and malformed responses are transient. Any other
    /// status (in practice the remaining 4xx codes) is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::TOO_MANY_REQUESTS
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || !status.is_client_error()
            }
            RemoteError::NetworkError(_) | RemoteError::InvalidResponse(_) => true,
        }
    }
}
