//! Integration tests for the duplicate check endpoint

use std::time::Duration;

use docsync_core::ports::remote_sync::{DuplicateCheck, IRemoteSyncClient};
use docsync_remote::client::HttpSyncClient;
use docsync_remote::provider::HttpRemoteSync;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_existing_checksum_reports_label() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_check_duplicate(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "exists": true,
            "candidateName": "Jane Doe"
        })),
    )
    .await;

    let answer = remote.check_duplicate(&common::checksum('b')).await;

    assert_eq!(
        answer,
        DuplicateCheck::Exists {
            label: Some("Jane Doe".to_string())
        }
    );
}

#[tokio::test]
async fn test_unknown_checksum_is_not_found() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_check_duplicate(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "exists": false })),
    )
    .await;

    let answer = remote.check_duplicate(&common::checksum('c')).await;
    assert_eq!(answer, DuplicateCheck::NotFound);
}

#[tokio::test]
async fn test_request_body_carries_checksum() {
    let (server, remote) = common::setup_remote_mock().await;
    let checksum = common::checksum('d');

    Mock::given(method("POST"))
        .and(path("/api/sync/check-duplicate"))
        .and(body_json(serde_json::json!({ "checksum": checksum.as_str() })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "exists": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(remote.check_duplicate(&checksum).await, DuplicateCheck::NotFound);
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_check_duplicate(&server, ResponseTemplate::new(500)).await;

    let answer = remote.check_duplicate(&common::checksum('e')).await;
    assert!(matches!(answer, DuplicateCheck::TransientError(_)));
}

#[tokio::test]
async fn test_client_error_is_still_transient() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_check_duplicate(
        &server,
        ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Invalid API key"
        })),
    )
    .await;

    match remote.check_duplicate(&common::checksum('f')).await {
        DuplicateCheck::TransientError(msg) => assert!(msg.contains("Invalid API key")),
        other => panic!("expected TransientError, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_transient() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_check_duplicate(
        &server,
        ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"),
    )
    .await;

    let answer = remote.check_duplicate(&common::checksum('a')).await;
    assert!(matches!(answer, DuplicateCheck::TransientError(_)));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let (server, remote) =
        common::setup_remote_mock_with_timeouts(Duration::from_millis(100), Duration::from_secs(5))
            .await;
    common::mount_check_duplicate(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "exists": true }))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let answer = remote.check_duplicate(&common::checksum('b')).await;
    assert!(matches!(answer, DuplicateCheck::TransientError(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    // Port 1 is reserved; nothing listens there.
    let remote = HttpRemoteSync::new(HttpSyncClient::new("http://127.0.0.1:1", "key"));

    let answer = remote.check_duplicate(&common::checksum('c')).await;
    assert!(matches!(answer, DuplicateCheck::TransientError(_)));
}
