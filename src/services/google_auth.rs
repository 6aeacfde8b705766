use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::models::{credentials::ServiceAccountKey, errors::AppError};

/// Write access limited to files the service account itself creates.
pub const DRIVE_FILE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// Claims of the self-signed assertion exchanged for an access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// OAuth2 service-account flow (JWT bearer grant) with a cached access token.
pub struct ServiceAccountAuthenticator {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    http: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuthenticator {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, AppError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::authentication(format!("Invalid service account private key: {}", e)))?;

        Ok(Self {
            key,
            encoding_key,
            scope: DRIVE_FILE_SCOPE.to_string(),
            http,
            token: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    pub fn assertion_claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        }
    }

    pub fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        encode(
            &Header::new(Algorithm::RS256),
            &self.assertion_claims(now),
            &self.encoding_key,
        )
        .map_err(|e| AppError::authentication(format!("Failed to sign token request: {}", e)))
    }

    /// Fetches a fresh token unconditionally. Used once at startup.
    pub async fn authorize(&self) -> Result<(), AppError> {
        let mut cached = self.token.lock().await;
        *cached = Some(self.fetch_token().await?);
        tracing::info!("Authorized as {}", self.key.client_email);
        Ok(())
    }

    /// Returns the cached token, refreshing it when it is close to expiry.
    pub async fn access_token(&self) -> Result<String, AppError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }

        tracing::debug!("Refreshing access token for {}", self.key.client_email);
        let token = self.fetch_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken, AppError> {
        let now = Utc::now();
        let assertion = self.sign_assertion(now)?;

        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::authentication(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::authentication(format!(
                "Token endpoint responded with {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::authentication(format!("Invalid token response: {}", e)))?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
