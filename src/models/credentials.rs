use serde::Deserialize;
use std::{fmt, path::Path};

use crate::models::errors::AppError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// The parts of a Google service-account key file the relay needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| AppError::configuration(format!("Invalid service account JSON: {}", e)))?;

        if key.client_email.trim().is_empty() {
            return Err(AppError::configuration("Service account JSON has an empty client_email"));
        }
        if key.private_key.trim().is_empty() {
            return Err(AppError::configuration("Service account JSON has an empty private_key"));
        }

        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::configuration(format!(
                "Credentials file {} could not be read ({}). Create a service account and download its JSON key.",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&raw)
    }
}
