use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Message returned to clients whenever the failure must not leak detail.
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

/// Client-correctable problems with an upload request. Always answered with 400.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file provided")]
    NoFile,

    #[error("File exceeds size limit of {limit_mb}MB")]
    TooLarge { limit_mb: usize },

    #[error("Only one file per request")]
    TooManyFiles,

    #[error("Only images allowed")]
    NotAnImage,

    #[error("Unexpected file field '{field}'")]
    UnexpectedField { field: String },

    #[error("Malformed upload: {message}")]
    Malformed { message: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to upload file to Google Drive: {message}")]
    RemoteTransfer { message: String },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration { message: message.into() }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        AppError::Authentication { message: message.into() }
    }

    pub fn remote_transfer(message: impl Into<String>) -> Self {
        AppError::RemoteTransfer { message: message.into() }
    }

    pub fn storage_failed(message: impl Into<String>) -> Self {
        AppError::Storage { message: message.into() }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        AppError::Internal { message: message.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the `error` field of the JSON body.
    ///
    /// Validation, timeout and remote-transfer failures are descriptive; everything
    /// else collapses to [`GENERIC_ERROR_MESSAGE`].
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(_) | AppError::Timeout { .. } | AppError::RemoteTransfer { .. } => {
                self.to_string()
            }
            _ => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Rejected upload: {}", self);
        }

        (status, Json(json!({ "error": self.client_message() }))).into_response()
    }
}

/// Body used for unrouted paths.
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}

/// Body used when a handler panics.
pub fn panic_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": GENERIC_ERROR_MESSAGE })),
    )
        .into_response()
}
