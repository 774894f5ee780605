//! Shared test helpers for remote service integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! endpoints a test needs and returns a provider pointing at the server.

use std::time::Duration;

use docsync_core::domain::document::{DocumentKind, MetadataHints};
use docsync_core::domain::newtypes::Checksum;
use docsync_core::ports::remote_sync::UploadRequest;
use docsync_remote::client::{HttpSyncClient, CHECK_DUPLICATE_PATH, UPLOAD_PATH};
use docsync_remote::provider::HttpRemoteSync;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-api-key";

/// Starts a mock server and returns a (MockServer, HttpRemoteSync) tuple.
///
/// No endpoints are mounted; use the `mount_*` helpers.
pub async fn setup_remote_mock() -> (MockServer, HttpRemoteSync) {
    let server = MockServer::start().await;
    let client = HttpSyncClient::new(server.uri(), TEST_API_KEY);
    (server, HttpRemoteSync::new(client))
}

/// Like [`setup_remote_mock`], with short request timeouts.
pub async fn setup_remote_mock_with_timeouts(
    check: Duration,
    upload: Duration,
) -> (MockServer, HttpRemoteSync) {
    let server = MockServer::start().await;
    let client = HttpSyncClient::new(server.uri(), TEST_API_KEY).with_timeouts(check, upload);
    (server, HttpRemoteSync::new(client))
}

/// Mounts the duplicate check endpoint with a fixed response.
///
/// Only requests carrying the test API key match.
pub async fn mount_check_duplicate(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(CHECK_DUPLICATE_PATH))
        .and(header("X-DocSync-API-Key", TEST_API_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts the upload endpoint with a fixed response.
pub async fn mount_upload(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header("X-DocSync-API-Key", TEST_API_KEY))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A checksum made of one repeated hex digit.
pub fn checksum(digit: char) -> Checksum {
    Checksum::new(digit.to_string().repeat(Checksum::HEX_LEN)).unwrap()
}

/// A small PDF upload request with both metadata hints set.
pub fn sample_request() -> UploadRequest {
    UploadRequest {
        file_name: "Jane_jane@example.com.pdf".to_string(),
        kind: DocumentKind::Pdf,
        content: b"%PDF-1.4 sample body".to_vec(),
        checksum: checksum('a'),
        hints: MetadataHints {
            job_hint: Some("Backend Engineer".to_string()),
            email: Some("jane@example.com".to_string()),
        },
    }
}
