use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{future, stream, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio_util::io::ReaderStream;
use uuid::Uuid;

use crate::models::{errors::AppError, upload::RemoteUploadResult};
use crate::services::google_auth::ServiceAccountAuthenticator;

const RESULT_FIELDS: &str = "id,name,webViewLink";

/// Destination for staged uploads.
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Streams the file at `path` to the provider under `original_name`.
    async fn upload(
        &self,
        path: &Path,
        original_name: &str,
        mime_type: &str,
    ) -> Result<RemoteUploadResult, AppError>;

    /// Confirms the configured destination folder is reachable.
    async fn check_folder_access(&self) -> Result<(), AppError>;
}

#[derive(Debug, Serialize)]
struct DriveFileMetadata<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parents: Option<Vec<&'a str>>,
}

#[derive(Debug, Deserialize)]
struct DriveErrorBody {
    error: DriveErrorDetail,
}

#[derive(Debug, Deserialize)]
struct DriveErrorDetail {
    message: String,
}

/// Google Drive v3 files API client.
pub struct GoogleDriveClient {
    http: reqwest::Client,
    auth: ServiceAccountAuthenticator,
    folder_id: Option<String>,
    api_base: String,
    upload_base: String,
}

impl GoogleDriveClient {
    pub fn new(
        http: reqwest::Client,
        auth: ServiceAccountAuthenticator,
        folder_id: Option<String>,
        api_base: impl Into<String>,
        upload_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth,
            folder_id,
            api_base: api_base.into(),
            upload_base: upload_base.into(),
        }
    }

    pub fn authenticator(&self) -> &ServiceAccountAuthenticator {
        &self.auth
    }

    async fn bearer_token(&self) -> Result<String, AppError> {
        self.auth
            .access_token()
            .await
            .map_err(|e| AppError::remote_transfer(e.to_string()))
    }
}

#[async_trait]
impl RemoteStorage for GoogleDriveClient {
    async fn upload(
        &self,
        path: &Path,
        original_name: &str,
        mime_type: &str,
    ) -> Result<RemoteUploadResult, AppError> {
        let metadata = DriveFileMetadata {
            name: original_name,
            parents: self.folder_id.as_deref().map(|id| vec![id]),
        };
        let metadata = serde_json::to_string(&metadata)
            .map_err(|e| AppError::internal_error(format!("Failed to encode file metadata: {}", e)))?;

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to open staged file: {}", e)))?;
        let file_len = file
            .metadata()
            .await
            .map_err(|e| AppError::storage_failed(format!("Failed to read staged file metadata: {}", e)))?
            .len();

        let boundary = format!("relay-{}", Uuid::new_v4().simple());
        let head = multipart_head(&boundary, &metadata, mime_type);
        let tail = multipart_tail(&boundary);
        let content_length = head.len() as u64 + file_len + tail.len() as u64;

        let body = stream::once(future::ready(Ok::<_, std::io::Error>(head)))
            .chain(ReaderStream::new(file))
            .chain(stream::once(future::ready(Ok(tail))));

        let token = self.bearer_token().await?;

        tracing::debug!(
            "Uploading {} ({} bytes, {}) to Google Drive",
            original_name,
            file_len,
            mime_type
        );

        let response = self
            .http
            .post(format!("{}/files", self.upload_base))
            .query(&[
                ("uploadType", "multipart"),
                ("fields", RESULT_FIELDS),
                ("supportsAllDrives", "true"),
            ])
            .bearer_auth(token)
            .header(CONTENT_TYPE, format!("multipart/related; boundary={}", boundary))
            .header(CONTENT_LENGTH, content_length)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| AppError::remote_transfer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::remote_transfer(format!(
                "Drive API responded with {}: {}",
                status,
                describe_drive_error(&body)
            )));
        }

        response
            .json::<RemoteUploadResult>()
            .await
            .map_err(|e| AppError::remote_transfer(format!("Unexpected Drive API response: {}", e)))
    }

    async fn check_folder_access(&self) -> Result<(), AppError> {
        let Some(folder_id) = self.folder_id.as_deref() else {
            return Ok(());
        };

        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(format!("{}/files/{}", self.api_base, folder_id))
            .query(&[("fields", "id,name"), ("supportsAllDrives", "true")])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::remote_transfer(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::remote_transfer(format!(
                "Folder {} is not accessible ({}): {}",
                folder_id,
                status,
                describe_drive_error(&body)
            )))
        }
    }
}

fn multipart_head(boundary: &str, metadata_json: &str, mime_type: &str) -> Bytes {
    Bytes::from(format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{m}\r\n--{b}\r\nContent-Type: {t}\r\n\r\n",
        b = boundary,
        m = metadata_json,
        t = mime_type
    ))
}

fn multipart_tail(boundary: &str) -> Bytes {
    Bytes::from(format!("\r\n--{}--\r\n", boundary))
}

fn describe_drive_error(body: &str) -> String {
    serde_json::from_str::<DriveErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
