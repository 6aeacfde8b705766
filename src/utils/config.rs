use std::{env, fmt, path::PathBuf};

use crate::models::{credentials::ServiceAccountKey, errors::AppError};

pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Where the service-account key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    Inline(String),
    File(PathBuf),
}

impl fmt::Debug for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsSource::Inline(_) => f.write_str("Inline(<redacted>)"),
            CredentialsSource::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl CredentialsSource {
    pub fn load(&self) -> Result<ServiceAccountKey, AppError> {
        match self {
            CredentialsSource::Inline(raw) => ServiceAccountKey::from_json(raw),
            CredentialsSource::File(path) => ServiceAccountKey::from_file(path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub folder_id: Option<String>,
    pub credentials: CredentialsSource,
    pub max_file_size: usize,
    pub temp_dir: PathBuf,
    pub request_timeout_seconds: u64,
    pub stale_upload_max_age_seconds: u64,
    pub drive_api_base: String,
    pub drive_upload_base: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            folder_id: None,
            credentials: CredentialsSource::File(PathBuf::from(DEFAULT_CREDENTIALS_FILE)),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            temp_dir: env::temp_dir().join("image-drive-relay"),
            request_timeout_seconds: 300,
            stale_upload_max_age_seconds: 3600,
            drive_api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            drive_upload_base: DEFAULT_DRIVE_UPLOAD_BASE.to_string(),
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => tracing::debug!("No .env file found, using process environment"),
            Err(e) => return Err(AppError::configuration(format!("Failed to read .env file: {}", e))),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        let folder_id = var("FOLDER_ID")
            .ok_or_else(|| AppError::configuration("Missing required environment variable FOLDER_ID"))?;
        config.folder_id = Some(folder_id);

        let port = var("PORT")
            .ok_or_else(|| AppError::configuration("Missing required environment variable PORT"))?;
        config.port = parse_port(&port)?;

        if let Some(host) = var("HOST") {
            config.host = host;
        }

        config.credentials = match var("GOOGLE_CREDENTIALS") {
            Some(raw) => CredentialsSource::Inline(raw),
            None => CredentialsSource::File(PathBuf::from(
                var("GOOGLE_CREDENTIALS_FILE").unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string()),
            )),
        };

        if let Some(dir) = var("UPLOAD_DIR") {
            config.temp_dir = PathBuf::from(dir);
        }

        if let Some(size) = var("MAX_FILE_SIZE") {
            config.max_file_size = parse_positive("MAX_FILE_SIZE", &size)?;
        }

        if let Some(timeout) = var("REQUEST_TIMEOUT_SECONDS") {
            config.request_timeout_seconds = parse_positive("REQUEST_TIMEOUT_SECONDS", &timeout)?;
        }

        if let Some(age) = var("STALE_UPLOAD_MAX_AGE_SECONDS") {
            config.stale_upload_max_age_seconds = parse_positive("STALE_UPLOAD_MAX_AGE_SECONDS", &age)?;
        }

        if let Some(base) = var("DRIVE_API_BASE") {
            config.drive_api_base = base.trim_end_matches('/').to_string();
        }

        if let Some(base) = var("DRIVE_UPLOAD_BASE") {
            config.drive_upload_base = base.trim_end_matches('/').to_string();
        }

        // The sweep must never reach a file whose request can still be running
        if config.stale_upload_max_age_seconds <= config.request_timeout_seconds {
            return Err(AppError::configuration(format!(
                "STALE_UPLOAD_MAX_AGE_SECONDS ({}) must be larger than REQUEST_TIMEOUT_SECONDS ({})",
                config.stale_upload_max_age_seconds, config.request_timeout_seconds
            )));
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16, AppError> {
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(AppError::configuration(format!(
            "PORT must be a positive integer no larger than 65535, got '{}'",
            raw
        ))),
    }
}

fn parse_positive<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(AppError::configuration(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}
