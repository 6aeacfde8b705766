// Library exports for testing and external use

pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    error_handling::HandleErrorLayer,
    http::Method,
    response::{IntoResponse, Response},
    routing::{get, post},
    BoxError, Router,
};
use std::{any::Any, sync::Arc, time::Duration};
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as CorsAny, CorsLayer},
    trace::TraceLayer,
};

use handlers::{health, pages, upload};
use models::errors::{self, AppError};
use services::{
    drive::{GoogleDriveClient, RemoteStorage},
    file_storage::FileStorageService,
    google_auth::ServiceAccountAuthenticator,
};
use utils::config::AppConfig;

const STAGING_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<FileStorageService>,
    pub uploader: Arc<dyn RemoteStorage>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: FileStorageService, uploader: Arc<dyn RemoteStorage>) -> Self {
        Self {
            config: Arc::new(config),
            storage: Arc::new(storage),
            uploader,
        }
    }
}

/// Loads credentials, authorizes against Google and prepares the staging area.
///
/// Every error returned here is fatal; the caller decides how to terminate.
pub async fn initialize(config: AppConfig) -> Result<AppState, AppError> {
    let key = config.credentials.load()?;

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("image-drive-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::internal_error(format!("Failed to build HTTP client: {}", e)))?;

    let auth = ServiceAccountAuthenticator::new(key, http.clone())?;
    auth.authorize().await?;
    tracing::info!("Google Drive API initialized");

    let drive = GoogleDriveClient::new(
        http,
        auth,
        config.folder_id.clone(),
        &config.drive_api_base,
        &config.drive_upload_base,
    );

    match config.folder_id.as_deref() {
        Some(folder_id) => match drive.check_folder_access().await {
            Ok(()) => tracing::info!("Access to Google Drive folder {} confirmed", folder_id),
            Err(e) => tracing::warn!(
                "Could not access folder {}; make sure it is shared with the service account: {}",
                folder_id,
                e
            ),
        },
        None => tracing::warn!("FOLDER_ID is not set; files will be created without a parent folder"),
    }

    let mut storage = FileStorageService::new(&config.temp_dir)?;
    storage.set_max_file_age(Duration::from_secs(config.stale_upload_max_age_seconds));

    Ok(AppState::new(config, storage, Arc::new(drive)))
}

/// Sweeps staged files left behind by earlier runs, now and then hourly.
pub fn spawn_staging_sweeper(storage: Arc<FileStorageService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STAGING_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = storage.cleanup_temp_files().await {
                tracing::error!("Failed to clean up staged files: {}", e);
            }
        }
    })
}

pub fn build_router(app_state: AppState) -> Router {
    let timeout_seconds = app_state.config.request_timeout_seconds;
    let timeout = Duration::from_secs(timeout_seconds);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(CorsAny)
        .allow_origin(CorsAny);

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(health::health_check))
        .route("/api/health", get(health::health_check))
        .route("/api/upload", post(upload::upload_image))
        .fallback(pages::not_found)
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    handle_middleware_error(err, timeout_seconds)
                }))
                .timeout(timeout)
                .layer(CatchPanicLayer::custom(|_: Box<dyn Any + Send + 'static>| {
                    tracing::error!("Handler panicked");
                    errors::panic_response()
                })),
        )
}

fn handle_middleware_error(err: BoxError, timeout_seconds: u64) -> Response {
    if err.is::<Elapsed>() {
        tracing::warn!("Request exceeded {}s and was cancelled", timeout_seconds);
        return AppError::Timeout { seconds: timeout_seconds }.into_response();
    }

    AppError::internal_error(format!("Unhandled middleware error: {}", err)).into_response()
}
