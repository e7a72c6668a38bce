//! IAM authentication
//!
//! Requests carry a bearer token. The token is either supplied up front or
//! obtained by exchanging an API key with IAM, and then cached until shortly
//! before it expires.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::ApiError;
use crate::config::{ConfigError, ProviderConfig};

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens are refreshed this long before IAM says they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

enum Credentials {
    Token(String),
    ApiKey(String),
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: u64,
}

pub struct Authenticator {
    credentials: Credentials,
    token_url: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl Authenticator {
    /// A pre-issued token takes precedence over an API key
    pub fn from_config(config: &ProviderConfig, http: reqwest::Client) -> Result<Self, ConfigError> {
        let credentials = match (&config.iam_token, &config.api_key) {
            (Some(token), _) => Credentials::Token(strip_bearer(token).to_string()),
            (None, Some(key)) => Credentials::ApiKey(key.clone()),
            (None, None) => return Err(ConfigError::MissingCredentials),
        };

        Ok(Self {
            credentials,
            token_url: format!("{}/identity/token", config.endpoints.iam),
            http,
            cached: Mutex::new(None),
        })
    }

    /// Current bearer token, exchanging the API key when needed
    pub async fn token(&self) -> Result<String, ApiError> {
        let api_key = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::ApiKey(key) => key,
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.access_token.clone());
        }

        log::debug!("Requesting IAM token from {}", self.token_url);
        let response = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", APIKEY_GRANT_TYPE), ("apikey", api_key.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!("IAM returned {}: {}", status, body)));
        }

        let token: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Auth(format!("invalid IAM response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

fn strip_bearer(token: &str) -> &str {
    token
        .strip_prefix("Bearer ")
        .or_else(|| token.strip_prefix("bearer "))
        .unwrap_or(token)
}
