//! Integration tests for the upload endpoint

use std::time::Duration;

use docsync_core::ports::remote_sync::{IRemoteSyncClient, UploadResult};
use docsync_remote::client::UPLOAD_PATH;
use wiremock::matchers::{body_string_contains, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_upload_returns_candidate_id() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_upload(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidateId": "cand-001"
        })),
    )
    .await;

    match remote.upload(&common::sample_request()).await {
        UploadResult::Success(id) => assert_eq!(id.as_str(), "cand-001"),
        other => panic!("expected Success, got {other:?}"),
    }
}

#[tokio::test]
async fn test_multipart_form_contents() {
    let (server, remote) = common::setup_remote_mock().await;
    let request = common::sample_request();

    Mock::given(method("POST"))
        .and(path(UPLOAD_PATH))
        .and(header_exists("content-type"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("filename=\"Jane_jane@example.com.pdf\""))
        .and(body_string_contains("application/pdf"))
        .and(body_string_contains("%PDF-1.4 sample body"))
        .and(body_string_contains("name=\"checksum\""))
        .and(body_string_contains(request.checksum.as_str()))
        .and(body_string_contains("name=\"job_hint\""))
        .and(body_string_contains("Backend Engineer"))
        .and(body_string_contains("name=\"email\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidateId": "cand-002"
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(remote.upload(&request).await.is_success());

    let received = server.received_requests().await.unwrap();
    let content_type = received[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
}

#[tokio::test]
async fn test_hints_are_omitted_when_absent() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_upload(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidateId": "c" })),
    )
    .await;

    let mut request = common::sample_request();
    request.hints = Default::default();
    assert!(remote.upload(&request).await.is_success());

    let received = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(!body.contains("name=\"job_hint\""));
    assert!(!body.contains("name=\"email\""));
}

#[tokio::test]
async fn test_rejection_is_permanent_with_server_message() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_upload(
        &server,
        ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "Unsupported file format"
        })),
    )
    .await;

    let result = remote.upload(&common::sample_request()).await;
    assert_eq!(
        result,
        UploadResult::PermanentError("Unsupported file format".to_string())
    );
}

#[tokio::test]
async fn test_rejection_without_body_uses_status() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_upload(&server, ResponseTemplate::new(413)).await;

    let result = remote.upload(&common::sample_request()).await;
    assert_eq!(result, UploadResult::PermanentError("HTTP 413".to_string()));
}

#[tokio::test]
async fn test_server_errors_are_transient() {
    for status in [500, 502, 503] {
        let (server, remote) = common::setup_remote_mock().await;
        common::mount_upload(&server, ResponseTemplate::new(status)).await;

        let result = remote.upload(&common::sample_request()).await;
        assert!(result.is_transient(), "status {status} gave {result:?}");
    }
}

#[tokio::test]
async fn test_throttling_and_request_timeout_are_transient() {
    for status in [429, 408] {
        let (server, remote) = common::setup_remote_mock().await;
        common::mount_upload(&server, ResponseTemplate::new(status)).await;

        let result = remote.upload(&common::sample_request()).await;
        assert!(result.is_transient(), "status {status} gave {result:?}");
    }
}

#[tokio::test]
async fn test_slow_upload_times_out_as_transient() {
    let (server, remote) =
        common::setup_remote_mock_with_timeouts(Duration::from_secs(5), Duration::from_millis(100))
            .await;
    common::mount_upload(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({ "candidateId": "late" }))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let result = remote.upload(&common::sample_request()).await;
    assert!(result.is_transient());
}

#[tokio::test]
async fn test_success_without_candidate_id_is_transient() {
    let (server, remote) = common::setup_remote_mock().await;
    common::mount_upload(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ok" })),
    )
    .await;

    let result = remote.upload(&common::sample_request()).await;
    assert!(result.is_transient());
}
