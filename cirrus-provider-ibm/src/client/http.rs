//! Authenticated JSON transport shared by the service clients

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::auth::Authenticator;
use crate::config::{ConfigError, ProviderConfig};

#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with a non-2xx status
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    auth: Arc<Authenticator>,
}

impl HttpClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        let auth = Authenticator::from_config(config, http.clone())?;
        Ok(Self {
            http,
            auth: Arc::new(auth),
        })
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send with a bearer token, turning non-2xx answers into [`ApiError::Status`]
    pub async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let token = self.auth.token().await?;
        let request = request.bearer_auth(token).build()?;
        let method = request.method().to_string();
        let url = request.url().to_string();

        log::debug!("{} {}", method, url);
        let response = self.http.execute(request).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            method,
            url,
            status: status.as_u16(),
            body,
        })
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let url = response.url().to_string();
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            url,
            reason: e.to_string(),
        })
    }

    /// Send and discard whatever body comes back
    pub async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> HttpClient {
        let config = ProviderConfig::new("us-south")
            .with_iam_token("test-token")
            .with_endpoints(Endpoints::all(&server.base_url()));
        HttpClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_send_json_with_bearer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/thing")
                    .header("Authorization", "Bearer test-token");
                then.status(200).json_body(json!({"id": "t-1"}));
            })
            .await;

        let http = client(&server);
        let body: serde_json::Value = http
            .send_json(http.request(Method::GET, &server.url("/thing")))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body["id"], "t-1");
    }

    #[tokio::test]
    async fn test_status_error_keeps_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/thing");
                then.status(404).body("{\"errors\":[{\"code\":\"not_found\"}]}");
            })
            .await;

        let http = client(&server);
        let err = http
            .send_empty(http.request(Method::DELETE, &server.url("/thing")))
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("not_found"));
        assert!(err.to_string().starts_with("DELETE "));
    }

    #[tokio::test]
    async fn test_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/thing");
                then.status(200).body("not json");
            })
            .await;

        let http = client(&server);
        let result: Result<serde_json::Value, _> = http
            .send_json(http.request(Method::GET, &server.url("/thing")))
            .await;
        assert!(matches!(result, Err(ApiError::Decode { .. })));
    }
}
