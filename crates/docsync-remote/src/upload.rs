//! Document upload
//!
//! Uploads one document to `POST /api/sync/upload` as `multipart/form-data`:
//!
//! | Part       | Content                                        |
//! |------------|------------------------------------------------|
//! | `file`     | raw bytes, with file name and MIME type        |
//! | `checksum` | hex checksum of the bytes                      |
//! | `job_hint` | optional, enclosing folder name                |
//! | `email`    | optional, address found in the file name       |
//!
//! A `200` response carries `{"candidateId": ...}`, which becomes the
//! document's [`RemoteId`].

use docsync_core::domain::newtypes::RemoteId;
use docsync_core::ports::remote_sync::UploadRequest;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::{ensure_success, HttpSyncClient, UPLOAD_PATH};
use crate::RemoteError;

/// Response from the upload endpoint
///
/// `candidateId` is a string in practice; numeric IDs are accepted too.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    candidate_id: Option<serde_json::Value>,
}

impl UploadResponse {
    fn into_remote_id(self) -> Result<RemoteId, RemoteError> {
        let raw = match self.candidate_id {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            other => {
                return Err(RemoteError::InvalidResponse(format!(
                    "missing or invalid candidateId: {other:?}"
                )))
            }
        };
        RemoteId::new(raw).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

/// Builds the multipart form for `request`
///
/// # Errors
/// Returns [`RemoteError::NetworkError`] if the MIME type is rejected by
/// the HTTP client
pub fn build_form(request: &UploadRequest) -> Result<Form, RemoteError> {
    let file = Part::bytes(request.content.clone())
        .file_name(request.file_name.clone())
        .mime_str(request.mime_type())?;

    let mut form = Form::new()
        .part("file", file)
        .text("checksum", request.checksum.as_str().to_string());

    if let Some(job_hint) = &request.hints.job_hint {
        form = form.text("job_hint", job_hint.clone());
    }
    if let Some(email) = &request.hints.email {
        form = form.text("email", email.clone());
    }

    Ok(form)
}

/// Uploads one document and returns the server-assigned identifier
///
/// # Arguments
/// * `client` - Configured client (provides base URL, key and timeout)
/// * `request` - File name, content, checksum and hints
///
/// # Errors
/// Returns [`RemoteError`] on network failure, timeout, non-success status,
/// or a success response without a usable `candidateId`
pub async fn upload_document(
    client: &HttpSyncClient,
    request: &UploadRequest,
) -> Result<RemoteId, RemoteError> {
    debug!(
        file = %request.file_name,
        size = request.content.len(),
        mime = request.mime_type(),
        "Uploading document"
    );

    let form = build_form(request)?;
    let response = client
        .request(Method::POST, UPLOAD_PATH)
        .timeout(client.upload_timeout())
        .multipart(form)
        .send()
        .await?;

    let body: UploadResponse = ensure_success(response)
        .await?
        .json()
        .await
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

    let remote_id = body.into_remote_id()?;
    info!(file = %request.file_name, remote_id = %remote_id, "Upload accepted");
    Ok(remote_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RemoteId, RemoteError> {
        serde_json::from_str::<UploadResponse>(json)
            .unwrap()
            .into_remote_id()
    }

    #[test]
    fn test_string_candidate_id() {
        assert_eq!(parse(r#"{"candidateId": "cand-42"}"#).unwrap().as_str(), "cand-42");
    }

    #[test]
    fn test_numeric_candidate_id() {
        assert_eq!(parse(r#"{"candidateId": 42}"#).unwrap().as_str(), "42");
    }

    #[test]
    fn test_missing_candidate_id_is_invalid() {
        assert!(matches!(parse("{}"), Err(RemoteError::InvalidResponse(_))));
    }

    #[test]
    fn test_empty_candidate_id_is_invalid() {
        assert!(matches!(
            parse(r#"{"candidateId": "  "}"#),
            Err(RemoteError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_null_candidate_id_is_invalid() {
        assert!(matches!(
            parse(r#"{"candidateId": null}"#),
            Err(RemoteError::InvalidResponse(_))
        ));
    }
}
