//! App ID management API
//!
//! Configuration objects of a tenant. They always exist; "creating" one means
//! writing it and "deleting" one means writing the service defaults back.

use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient, endpoint};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaim {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_claim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_claim: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<AccessTokenConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<TokenSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous_access: Option<TokenSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_claims: Option<Vec<TokenClaim>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_claims: Option<Vec<TokenClaim>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityConfirmation {
    /// `FULL`, `RESTRICTIVE` or `OFF`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methods: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDirectoryInteractions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_confirmation: Option<IdentityConfirmation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_password_notification_enable: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDirectorySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_service_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signup_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<CloudDirectoryInteractions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_field: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDirectoryIdp {
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CloudDirectorySettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomIdpSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomIdp {
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<CustomIdpSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmsChannelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub key: String,
    pub secret: String,
    pub from: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaChannel {
    #[serde(rename = "type")]
    pub channel_type: String,
    pub is_active: bool,
    #[serde(default)]
    pub config: Option<SmsChannelConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct MfaChannelList {
    #[serde(default)]
    channels: Vec<MfaChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaChannelUpdate {
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<SmsChannelConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionUrlResponse {
    #[serde(default)]
    action_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ApplicationScopes {
    #[serde(default)]
    scopes: Vec<String>,
}

#[derive(Clone)]
pub struct AppIdClient {
    http: HttpClient,
    base: String,
}

impl AppIdClient {
    pub fn new(http: HttpClient, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
        }
    }

    fn request(&self, method: Method, tenant_id: &str, path: &str) -> RequestBuilder {
        let path = format!("/{}/{}", tenant_id, path.trim_start_matches('/'));
        self.http.request(method, &endpoint(&self.base, &path))
    }

    pub async fn get_token_config(&self, tenant_id: &str) -> Result<TokenConfig, ApiError> {
        self.http
            .send_json(self.request(Method::GET, tenant_id, "/config/tokens"))
            .await
    }

    pub async fn put_token_config(&self, tenant_id: &str, config: &TokenConfig) -> Result<(), ApiError> {
        let request = self.request(Method::PUT, tenant_id, "/config/tokens").json(config);
        self.http.send_empty(request).await
    }

    pub async fn get_cloud_directory_idp(&self, tenant_id: &str) -> Result<CloudDirectoryIdp, ApiError> {
        self.http
            .send_json(self.request(Method::GET, tenant_id, "/config/idps/cloud_directory"))
            .await
    }

    pub async fn set_cloud_directory_idp(
        &self,
        tenant_id: &str,
        idp: &CloudDirectoryIdp,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::PUT, tenant_id, "/config/idps/cloud_directory")
            .json(idp);
        self.http.send_empty(request).await
    }

    pub async fn get_custom_idp(&self, tenant_id: &str) -> Result<CustomIdp, ApiError> {
        self.http
            .send_json(self.request(Method::GET, tenant_id, "/config/idps/custom"))
            .await
    }

    pub async fn set_custom_idp(&self, tenant_id: &str, idp: &CustomIdp) -> Result<(), ApiError> {
        let request = self.request(Method::PUT, tenant_id, "/config/idps/custom").json(idp);
        self.http.send_empty(request).await
    }

    pub async fn list_mfa_channels(&self, tenant_id: &str) -> Result<Vec<MfaChannel>, ApiError> {
        let list: MfaChannelList = self
            .http
            .send_json(self.request(
                Method::GET,
                tenant_id,
                "/config/cloud_directory/mfa/channels",
            ))
            .await?;
        Ok(list.channels)
    }

    pub async fn update_mfa_channel(
        &self,
        tenant_id: &str,
        channel: &str,
        update: &MfaChannelUpdate,
    ) -> Result<(), ApiError> {
        let path = format!("/config/cloud_directory/mfa/channels/{}", channel);
        let request = self.request(Method::PUT, tenant_id, &path).json(update);
        self.http.send_empty(request).await
    }

    pub async fn get_action_url(&self, tenant_id: &str, action: &str) -> Result<Option<String>, ApiError> {
        let path = format!("/config/cloud_directory/action_url/{}", action);
        let response: ActionUrlResponse = self
            .http
            .send_json(self.request(Method::GET, tenant_id, &path))
            .await?;
        Ok(response.action_url)
    }

    pub async fn get_application_scopes(&self, tenant_id: &str, client_id: &str) -> Result<Vec<String>, ApiError> {
        let path = format!("/applications/{}/scopes", client_id);
        let response: ApplicationScopes = self
            .http
            .send_json(self.request(Method::GET, tenant_id, &path))
            .await?;
        Ok(response.scopes)
    }
}
