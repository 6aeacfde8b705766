#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tempfile::TempDir;

use image_drive_relay::{
    build_router,
    models::{errors::AppError, upload::RemoteUploadResult},
    services::{drive::RemoteStorage, file_storage::FileStorageService},
    utils::config::AppConfig,
    AppState,
};

pub const BOUNDARY: &str = "----relay-test-boundary";

/// What the fake provider saw for a single upload.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub contents: Vec<u8>,
}

/// In-memory stand-in for Google Drive.
pub struct FakeDrive {
    fail_with: Option<String>,
    panic_on_upload: bool,
    delay: Duration,
    calls: AtomicUsize,
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl FakeDrive {
    pub fn succeeding() -> Self {
        Self {
            fail_with: None,
            panic_on_upload: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::succeeding()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_upload: true,
            ..Self::succeeding()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteStorage for FakeDrive {
    async fn upload(
        &self,
        path: &Path,
        original_name: &str,
        mime_type: &str,
    ) -> Result<RemoteUploadResult, AppError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::remote_transfer(format!("staged file unreadable: {}", e)))?;

        self.uploads.lock().unwrap().push(RecordedUpload {
            path: path.to_path_buf(),
            original_name: original_name.to_string(),
            mime_type: mime_type.to_string(),
            contents,
        });

        tokio::time::sleep(self.delay).await;

        if self.panic_on_upload {
            panic!("fake drive blew up");
        }

        if let Some(message) = &self.fail_with {
            return Err(AppError::remote_transfer(message.clone()));
        }

        Ok(RemoteUploadResult {
            id: format!("drive-file-{}", n),
            name: original_name.to_string(),
            web_view_link: format!("https://drive.google.com/file/d/drive-file-{}/view", n),
        })
    }

    async fn check_folder_access(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub drive: Arc<FakeDrive>,
    pub staging: TempDir,
}

impl TestApp {
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path()).unwrap().count()
    }
}

pub fn test_config(staging: &Path) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 3000,
        folder_id: Some("folder123".to_string()),
        temp_dir: staging.to_path_buf(),
        ..AppConfig::default()
    }
}

/// Setup a test application with temporary staging and a fake provider
pub fn setup_test_app(drive: FakeDrive) -> TestApp {
    setup_test_app_with(drive, |_| {})
}

/// Same as [`setup_test_app`] but lets the caller adjust the configuration
pub fn setup_test_app_with(drive: FakeDrive, configure: impl FnOnce(&mut AppConfig)) -> TestApp {
    let staging = TempDir::new().unwrap();
    let drive = Arc::new(drive);

    let mut config = test_config(staging.path());
    configure(&mut config);
    let storage = FileStorageService::new(staging.path()).expect("Failed to create storage service");
    let app_state = AppState::new(config, storage, drive.clone());

    TestApp {
        router: build_router(app_state),
        drive,
        staging,
    }
}

/// One part of a multipart form.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

/// Create a multipart form body with raw binary parts
pub fn create_multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .uri("/api/upload")
        .method("POST")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(create_multipart_body(parts)))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Create a test PNG image (1x1 pixel)
pub fn create_test_image() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
        0x00, 0x00, 0x00, 0x0D, // IHDR chunk length
        0x49, 0x48, 0x44, 0x52, // IHDR
        0x00, 0x00, 0x00, 0x01, // Width: 1
        0x00, 0x00, 0x00, 0x01, // Height: 1
        0x08, 0x02, 0x00, 0x00, 0x00, // Bit depth, color type, etc.
        0x90, 0x77, 0x53, 0xDE, // CRC
        0x00, 0x00, 0x00, 0x0C, // IDAT chunk length
        0x49, 0x44, 0x41, 0x54, // IDAT
        0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, // Compressed data
        0x03, 0x01, 0x01, 0x00,
        0x18, 0xDD, 0x8D, 0xB4, // CRC
        0x00, 0x00, 0x00, 0x00, // IEND chunk length
        0x49, 0x45, 0x4E, 0x44, // IEND
        0xAE, 0x42, 0x60, 0x82, // CRC
    ]
}
