//! DocSync remote service client
//!
//! Provides a typed HTTP client for the remote document service. Handles
//! the API key header, per-operation timeouts, JSON deserialization and
//! endpoint construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsync_core::domain::newtypes::Checksum;
//! use docsync_remote::client::HttpSyncClient;
//!
//! # async fn example(checksum: Checksum) -> anyhow::Result<()> {
//! let client = HttpSyncClient::new("https://docsync.example.com", "api-key");
//! let answer = client.check_duplicate(&checksum).await?;
//! println!("exists: {}", answer.exists);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use docsync_core::config::RemoteConfig;
use docsync_core::domain::newtypes::Checksum;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::RemoteError;

/// Header carrying the API key on every request
pub const API_KEY_HEADER: &str = "X-DocSync-API-Key";

/// Path of the duplicate check endpoint
pub const CHECK_DUPLICATE_PATH: &str = "/api/sync/check-duplicate";

/// Path of the upload endpoint
pub const UPLOAD_PATH: &str = "/api/sync/upload";

/// Default timeout for duplicate checks
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for uploads
pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Serialize)]
struct CheckDuplicateBody<'a> {
    checksum: &'a str,
}

/// Response from the duplicate check endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateResponse {
    /// Whether the checksum is already known to the server
    pub exists: bool,
    /// Name of the existing candidate, if the server reports one
    #[serde(default)]
    pub candidate_name: Option<String>,
}

/// Error body returned alongside 4xx/5xx statuses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ============================================================================
// HttpSyncClient
// ============================================================================

/// HTTP client for the remote document service
///
/// Wraps a single pooled `reqwest::Client`; cloning is cheap and shares
/// connections.
#[derive(Clone)]
pub struct HttpSyncClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL without a trailing slash
    base_url: String,
    api_key: String,
    check_timeout: Duration,
    upload_timeout: Duration,
}

impl HttpSyncClient {
    /// Creates a client with the default timeouts
    ///
    /// # Arguments
    /// * `base_url` - Service root, e.g. `https://docsync.example.com`
    /// * `api_key` - Sent in the [`API_KEY_HEADER`] header
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
        }
    }

    /// Creates a client from the `remote` section of the configuration
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(config.url.as_str(), config.api_key.as_str())
            .with_timeouts(config.check_timeout(), config.upload_timeout())
    }

    /// Overrides the per-request timeouts
    pub fn with_timeouts(mut self, check: Duration, upload: Duration) -> Self {
        self.check_timeout = check;
        self.upload_timeout = upload;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn check_timeout(&self) -> Duration {
        self.check_timeout
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Prepends the base URL and adds the API key header.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Path relative to the base URL (e.g. `/api/sync/upload`)
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .header(API_KEY_HEADER, self.api_key.as_str())
    }

    /// Asks the server whether content with `checksum` already exists
    ///
    /// Makes `POST /api/sync/check-duplicate` with `{"checksum": "..."}`.
    ///
    /// # Errors
    /// Returns [`RemoteError`] on network failure, timeout, any non-success
    /// status, or an undecodable body
    pub async fn check_duplicate(
        &self,
        checksum: &Checksum,
    ) -> Result<DuplicateResponse, RemoteError> {
        debug!(checksum = %checksum.short(), "Checking remote for duplicate");

        let response = self
            .request(Method::POST, CHECK_DUPLICATE_PATH)
            .timeout(self.check_timeout)
            .json(&CheckDuplicateBody {
                checksum: checksum.as_str(),
            })
            .send()
            .await?;

        let answer: DuplicateResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        debug!(
            checksum = %checksum.short(),
            exists = answer.exists,
            "Duplicate check answered"
        );
        Ok(answer)
    }
}

/// Passes a success response through, or turns it into [`RemoteError::Status`]
///
/// The error message is the JSON `message` field of the body when present,
/// otherwise `HTTP <status>`.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    debug!(status = status.as_u16(), %message, "Remote returned error status");
    Err(RemoteError::Status { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let client = HttpSyncClient::new("https://docsync.example.com", "test-key");
        let request = client
            .request(Method::POST, CHECK_DUPLICATE_PATH)
            .build()
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://docsync.example.com/api/sync/check-duplicate"
        );
        let key = request
            .headers()
            .get(API_KEY_HEADER)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(key, "test-key");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = HttpSyncClient::new("http://localhost:8080/", "key");
        assert_eq!(client.base_url(), "http://localhost:8080");

        let request = client.request(Method::POST, UPLOAD_PATH).build().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/api/sync/upload");
    }

    #[test]
    fn test_default_timeouts() {
        let client = HttpSyncClient::new("http://localhost", "key");
        assert_eq!(client.check_timeout(), Duration::from_secs(10));
        assert_eq!(client.upload_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_from_config() {
        let config = RemoteConfig {
            url: "http://sync.local:9000".into(),
            api_key: "secret".into(),
            check_timeout_secs: 3,
            upload_timeout_secs: 30,
            ..RemoteConfig::default()
        };

        let client = HttpSyncClient::from_config(&config);
        assert_eq!(client.base_url(), "http://sync.local:9000");
        assert_eq!(client.check_timeout(), Duration::from_secs(3));
        assert_eq!(client.upload_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_duplicate_response_deserialization() {
        let json = r#"{"exists": true, "candidateName": "Jane Doe"}"#;
        let answer: DuplicateResponse = serde_json::from_str(json).unwrap();
        assert!(answer.exists);
        assert_eq!(answer.candidate_name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_duplicate_response_without_name() {
        let answer: DuplicateResponse = serde_json::from_str(r#"{"exists": false}"#).unwrap();
        assert!(!answer.exists);
        assert!(answer.candidate_name.is_none());
    }

    #[test]
    fn test_duplicate_response_requires_exists() {
        assert!(serde_json::from_str::<DuplicateResponse>(r#"{"candidateName": "x"}"#).is_err());
    }
}
