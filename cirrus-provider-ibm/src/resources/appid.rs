//! App ID tenant configuration: tokens, MFA channel, Cloud Directory and
//! custom identity providers
//!
//! These objects always exist on a tenant, so create and update both write
//! the configuration, and delete writes the service defaults back. The
//! tenant ID is the identifier.

use cirrus_core::provider::{ProviderError, ProviderResult};
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use crate::client::{
    AccessTokenConfig, CloudDirectoryIdp, CloudDirectoryInteractions, CloudDirectorySettings,
    CustomIdp, CustomIdpSettings, IdentityConfirmation, MfaChannel, MfaChannelUpdate,
    SmsChannelConfig, TokenClaim, TokenConfig, TokenSettings,
};
use crate::provider::IbmProvider;
use crate::utils::{
    Attributes, api_error, block, first_block, get_blocks, get_bool, get_int, get_str,
    get_str_list, require_str, set_opt, string_list,
};

pub const TOKEN_CONFIG_TYPE: &str = "ibm_appid_token_config";
pub const MFA_CHANNEL_TYPE: &str = "ibm_appid_mfa_channel";
pub const CLOUD_DIRECTORY_TYPE: &str = "ibm_appid_idp_cloud_directory";
pub const CUSTOM_IDP_TYPE: &str = "ibm_appid_idp_custom";

const TOKEN_EXPIRES_IN_DEFAULT: i64 = 2_592_000;
const ACCESS_TOKEN_EXPIRES_IN_DEFAULT: i64 = 3600;

const CLAIM_SOURCES: &[&str] = &[
    "saml",
    "cloud_directory",
    "appid_custom",
    "facebook",
    "google",
    "ibmid",
    "attributes",
    "roles",
];

fn tenant_id_attribute() -> AttributeSchema {
    AttributeSchema::new("tenant_id", AttributeType::String)
        .required()
        .force_new()
        .with_description("The AppID instance GUID")
}

fn not_found(id: &ResourceId, what: &str, tenant_id: &str) -> State {
    log::warn!("AppID {} of tenant {} not found, removing it from state", what, tenant_id);
    State::not_found(id.clone())
}

// =============================================================================
// Token Configuration
// =============================================================================

fn claim_block() -> AttributeType {
    AttributeType::Block(Box::new(
        BlockSchema::new()
            .attribute(AttributeSchema::new("source", types::one_of(CLAIM_SOURCES)).required())
            .attribute(AttributeSchema::new("source_claim", AttributeType::String))
            .attribute(AttributeSchema::new("destination_claim", AttributeType::String)),
    ))
}

pub fn token_config_schema() -> ResourceSchema {
    ResourceSchema::new(TOKEN_CONFIG_TYPE)
        .with_description("Token lifetimes and custom claims of an AppID tenant")
        .attribute(tenant_id_attribute())
        .attribute(AttributeSchema::new("access_token_expires_in", AttributeType::Int).optional_computed())
        .attribute(
            AttributeSchema::new("refresh_token_expires_in", AttributeType::Int)
                .with_default(TOKEN_EXPIRES_IN_DEFAULT),
        )
        .attribute(
            AttributeSchema::new("anonymous_token_expires_in", AttributeType::Int)
                .with_default(TOKEN_EXPIRES_IN_DEFAULT),
        )
        .attribute(AttributeSchema::new("anonymous_access_enabled", AttributeType::Bool).optional_computed())
        .attribute(AttributeSchema::new("refresh_token_enabled", AttributeType::Bool).optional_computed())
        .attribute(
            AttributeSchema::new("access_token_claim", claim_block())
                .with_description("Custom claims added to access tokens"),
        )
        .attribute(
            AttributeSchema::new("id_token_claim", claim_block())
                .with_description("Custom claims added to identity tokens"),
        )
}

fn claims_from_attributes(attributes: &Attributes, key: &str) -> Option<Vec<TokenClaim>> {
    if !attributes.contains_key(key) {
        return None;
    }
    let claims = get_blocks(attributes, key)
        .into_iter()
        .map(|claim| TokenClaim {
            source: get_str(claim, "source").unwrap_or_default().to_string(),
            source_claim: get_str(claim, "source_claim").map(str::to_string),
            destination_claim: get_str(claim, "destination_claim").map(str::to_string),
        })
        .collect();
    Some(claims)
}

fn claims_value(claims: &[TokenClaim]) -> Value {
    Value::List(
        claims
            .iter()
            .map(|c| {
                block([
                    ("source", Some(Value::from(c.source.as_str()))),
                    ("source_claim", c.source_claim.as_deref().map(Value::from)),
                    ("destination_claim", c.destination_claim.as_deref().map(Value::from)),
                ])
            })
            .collect(),
    )
}

fn token_config_from_attributes(attributes: &Attributes) -> TokenConfig {
    TokenConfig {
        access: get_int(attributes, "access_token_expires_in")
            .map(|expires_in| AccessTokenConfig { expires_in: Some(expires_in) }),
        refresh: Some(TokenSettings {
            enabled: Some(get_bool(attributes, "refresh_token_enabled").unwrap_or(false)),
            expires_in: get_int(attributes, "refresh_token_expires_in"),
        }),
        anonymous_access: Some(TokenSettings {
            enabled: Some(get_bool(attributes, "anonymous_access_enabled").unwrap_or(false)),
            expires_in: get_int(attributes, "anonymous_token_expires_in"),
        }),
        access_token_claims: claims_from_attributes(attributes, "access_token_claim"),
        id_token_claims: claims_from_attributes(attributes, "id_token_claim"),
    }
}

fn token_config_attributes(tenant_id: &str, config: &TokenConfig) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("tenant_id".to_string(), Value::from(tenant_id));
    set_opt(
        &mut attributes,
        "access_token_expires_in",
        config.access.as_ref().and_then(|a| a.expires_in),
    );
    if let Some(refresh) = &config.refresh {
        set_opt(&mut attributes, "refresh_token_enabled", refresh.enabled);
        set_opt(&mut attributes, "refresh_token_expires_in", refresh.expires_in);
    }
    if let Some(anonymous) = &config.anonymous_access {
        set_opt(&mut attributes, "anonymous_access_enabled", anonymous.enabled);
        set_opt(&mut attributes, "anonymous_token_expires_in", anonymous.expires_in);
    }
    set_opt(
        &mut attributes,
        "access_token_claim",
        config.access_token_claims.as_deref().map(claims_value),
    );
    set_opt(
        &mut attributes,
        "id_token_claim",
        config.id_token_claims.as_deref().map(claims_value),
    );
    attributes
}

pub async fn read_token_config(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let config = match provider.appid.get_token_config(identifier).await {
        Ok(config) => config,
        Err(e) if e.is_not_found() => return Ok(not_found(id, "token configuration", identifier)),
        Err(e) => return Err(api_error(id, "Error reading AppID token configuration", e)),
    };

    Ok(State::existing(id.clone(), token_config_attributes(identifier, &config)).with_identifier(identifier))
}

pub async fn apply_token_config(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let tenant_id = require_str(&resource.attributes, "tenant_id", id)?;

    provider
        .appid
        .put_token_config(tenant_id, &token_config_from_attributes(&resource.attributes))
        .await
        .map_err(|e| api_error(id, "Error updating AppID token configuration", e))?;

    read_token_config(provider, id, tenant_id).await
}

pub async fn reset_token_config(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    let defaults = TokenConfig {
        access: Some(AccessTokenConfig {
            expires_in: Some(ACCESS_TOKEN_EXPIRES_IN_DEFAULT),
        }),
        refresh: Some(TokenSettings {
            enabled: Some(false),
            expires_in: Some(TOKEN_EXPIRES_IN_DEFAULT),
        }),
        anonymous_access: Some(TokenSettings {
            enabled: Some(true),
            expires_in: Some(TOKEN_EXPIRES_IN_DEFAULT),
        }),
        ..Default::default()
    };

    provider
        .appid
        .put_token_config(identifier, &defaults)
        .await
        .map_err(|e| api_error(id, "Error resetting AppID token configuration", e))
}

// =============================================================================
// MFA Channel
// =============================================================================

const MFA_PROVIDER: &str = "nexmo";

pub fn mfa_channel_schema() -> ResourceSchema {
    ResourceSchema::new(MFA_CHANNEL_TYPE)
        .with_description("Active multi-factor authentication channel of an AppID tenant")
        .attribute(tenant_id_attribute())
        .attribute(AttributeSchema::new("active", types::one_of(&["email", "sms"])).required())
        .attribute(
            AttributeSchema::new(
                "sms_config",
                AttributeType::Block(Box::new(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new("key", AttributeType::String).required().sensitive())
                        .attribute(AttributeSchema::new("secret", AttributeType::String).required().sensitive())
                        .attribute(AttributeSchema::new("from", AttributeType::String).required())
                        .with_max_items(1),
                )),
            )
            .sensitive(),
        )
}

fn sms_config_from_attributes(attributes: &Attributes) -> Option<SmsChannelConfig> {
    let config = first_block(attributes, "sms_config")?;
    Some(SmsChannelConfig {
        provider: None,
        key: get_str(config, "key").unwrap_or_default().to_string(),
        secret: get_str(config, "secret").unwrap_or_default().to_string(),
        from: get_str(config, "from").unwrap_or_default().to_string(),
    })
}

fn mfa_channel_attributes(tenant_id: &str, channels: &[MfaChannel]) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("tenant_id".to_string(), Value::from(tenant_id));

    for channel in channels {
        if channel.is_active {
            attributes.insert("active".to_string(), Value::from(channel.channel_type.as_str()));
        }
        if channel.channel_type == "sms"
            && let Some(config) = &channel.config
        {
            let config = block([
                ("key", Some(Value::from(config.key.as_str()))),
                ("secret", Some(Value::from(config.secret.as_str()))),
                ("from", Some(Value::from(config.from.as_str()))),
            ]);
            attributes.insert("sms_config".to_string(), Value::List(vec![config]));
        }
    }
    attributes
}

pub async fn read_mfa_channel(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let channels = provider
        .appid
        .list_mfa_channels(identifier)
        .await
        .map_err(|e| api_error(id, "Error getting AppID MFA channels", e))?;

    Ok(State::existing(id.clone(), mfa_channel_attributes(identifier, &channels)).with_identifier(identifier))
}

pub async fn apply_mfa_channel(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let tenant_id = require_str(attrs, "tenant_id", id)?;
    let active = require_str(attrs, "active", id)?;

    let config = sms_config_from_attributes(attrs);
    if active == "sms" && config.is_none() {
        return Err(ProviderError::new("sms_config is required when the active channel is sms")
            .for_resource(id.clone()));
    }

    let update = MfaChannelUpdate {
        is_active: active == "sms",
        config,
    };
    provider
        .appid
        .update_mfa_channel(tenant_id, MFA_PROVIDER, &update)
        .await
        .map_err(|e| api_error(id, "Error updating AppID MFA channel", e))?;

    read_mfa_channel(provider, id, tenant_id).await
}

pub async fn reset_mfa_channel(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    // Placeholder credentials the service ships with
    let defaults = MfaChannelUpdate {
        is_active: false,
        config: Some(SmsChannelConfig {
            provider: Some(MFA_PROVIDER.to_string()),
            key: "<key>".to_string(),
            secret: "<secret>".to_string(),
            from: "+12223334444".to_string(),
        }),
    };

    provider
        .appid
        .update_mfa_channel(identifier, MFA_PROVIDER, &defaults)
        .await
        .map_err(|e| api_error(id, "Error resetting AppID MFA channel", e))
}

// =============================================================================
// Cloud Directory IDP
// =============================================================================

const ACCESS_MODES: &[&str] = &["FULL", "RESTRICTIVE", "OFF"];

/// Attributes shared with the cloud directory data source
pub(crate) fn cloud_directory_settings(schema: ResourceSchema, settable: bool) -> ResourceSchema {
    let setting = |name: &str, attr_type: AttributeType, default: Option<Value>| {
        let attribute = AttributeSchema::new(name, attr_type);
        match (settable, default) {
            (false, _) => attribute.computed(),
            (true, Some(default)) => attribute.with_default(default),
            (true, None) => attribute,
        }
    };

    schema
        .attribute(setting("self_service_enabled", AttributeType::Bool, Some(Value::Bool(true))))
        .attribute(setting("signup_enabled", AttributeType::Bool, Some(Value::Bool(true))))
        .attribute(setting("welcome_enabled", AttributeType::Bool, Some(Value::Bool(true))))
        .attribute(setting("reset_password_enabled", AttributeType::Bool, Some(Value::Bool(true))))
        .attribute(setting(
            "reset_password_notification_enabled",
            AttributeType::Bool,
            Some(Value::Bool(true)),
        ))
        .attribute(setting(
            "identity_confirm_access_mode",
            types::one_of(ACCESS_MODES),
            Some(Value::from("FULL")),
        ))
        .attribute(setting("identity_confirm_methods", types::string_list(), None))
        .attribute(setting("identity_field", AttributeType::String, None))
}

pub fn cloud_directory_schema() -> ResourceSchema {
    let schema = ResourceSchema::new(CLOUD_DIRECTORY_TYPE)
        .with_description("Cloud Directory identity provider of an AppID tenant")
        .attribute(tenant_id_attribute())
        .attribute(AttributeSchema::new("is_active", AttributeType::Bool).required());
    cloud_directory_settings(schema, true)
}

fn cloud_directory_from_attributes(attributes: &Attributes) -> CloudDirectoryIdp {
    let is_active = get_bool(attributes, "is_active").unwrap_or(false);
    if !is_active {
        return CloudDirectoryIdp {
            is_active,
            config: None,
        };
    }

    let methods = attributes
        .contains_key("identity_confirm_methods")
        .then(|| get_str_list(attributes, "identity_confirm_methods"));

    CloudDirectoryIdp {
        is_active,
        config: Some(CloudDirectorySettings {
            self_service_enabled: get_bool(attributes, "self_service_enabled"),
            signup_enabled: get_bool(attributes, "signup_enabled"),
            interactions: Some(CloudDirectoryInteractions {
                identity_confirmation: Some(IdentityConfirmation {
                    access_mode: get_str(attributes, "identity_confirm_access_mode").map(str::to_string),
                    methods,
                }),
                welcome_enabled: get_bool(attributes, "welcome_enabled"),
                reset_password_enabled: get_bool(attributes, "reset_password_enabled"),
                reset_password_notification_enable: get_bool(
                    attributes,
                    "reset_password_notification_enabled",
                ),
            }),
            identity_field: get_str(attributes, "identity_field").map(str::to_string),
        }),
    }
}

pub(crate) fn cloud_directory_attributes(tenant_id: &str, idp: &CloudDirectoryIdp) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("tenant_id".to_string(), Value::from(tenant_id));
    attributes.insert("is_active".to_string(), Value::Bool(idp.is_active));

    let Some(config) = &idp.config else {
        return attributes;
    };
    set_opt(&mut attributes, "self_service_enabled", config.self_service_enabled);
    set_opt(&mut attributes, "signup_enabled", config.signup_enabled);
    set_opt(&mut attributes, "identity_field", config.identity_field.clone());

    if let Some(interactions) = &config.interactions {
        set_opt(&mut attributes, "welcome_enabled", interactions.welcome_enabled);
        set_opt(&mut attributes, "reset_password_enabled", interactions.reset_password_enabled);
        set_opt(
            &mut attributes,
            "reset_password_notification_enabled",
            interactions.reset_password_notification_enable,
        );
        if let Some(confirmation) = &interactions.identity_confirmation {
            set_opt(
                &mut attributes,
                "identity_confirm_access_mode",
                confirmation.access_mode.clone(),
            );
            set_opt(
                &mut attributes,
                "identity_confirm_methods",
                confirmation.methods.as_deref().map(string_list),
            );
        }
    }
    attributes
}

pub async fn read_cloud_directory(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let idp = match provider.appid.get_cloud_directory_idp(identifier).await {
        Ok(idp) => idp,
        Err(e) if e.is_not_found() => return Ok(not_found(id, "Cloud Directory IDP", identifier)),
        Err(e) => return Err(api_error(id, "Error reading AppID Cloud Directory IDP", e)),
    };

    Ok(State::existing(id.clone(), cloud_directory_attributes(identifier, &idp)).with_identifier(identifier))
}

pub async fn apply_cloud_directory(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let tenant_id = require_str(&resource.attributes, "tenant_id", id)?;

    provider
        .appid
        .set_cloud_directory_idp(tenant_id, &cloud_directory_from_attributes(&resource.attributes))
        .await
        .map_err(|e| api_error(id, "Error updating AppID Cloud Directory IDP", e))?;

    read_cloud_directory(provider, id, tenant_id).await
}

pub async fn reset_cloud_directory(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    let defaults = CloudDirectoryIdp {
        is_active: false,
        config: Some(CloudDirectorySettings {
            self_service_enabled: Some(true),
            signup_enabled: Some(true),
            interactions: Some(CloudDirectoryInteractions {
                identity_confirmation: Some(IdentityConfirmation {
                    access_mode: Some("FULL".to_string()),
                    methods: Some(vec!["email".to_string()]),
                }),
                welcome_enabled: Some(true),
                reset_password_enabled: Some(true),
                reset_password_notification_enable: Some(true),
            }),
            identity_field: None,
        }),
    };

    provider
        .appid
        .set_cloud_directory_idp(identifier, &defaults)
        .await
        .map_err(|e| api_error(id, "Error resetting AppID Cloud Directory IDP", e))
}

// =============================================================================
// Custom IDP
// =============================================================================

pub fn custom_idp_schema() -> ResourceSchema {
    ResourceSchema::new(CUSTOM_IDP_TYPE)
        .with_description("Custom identity provider (JWT) of an AppID tenant")
        .attribute(tenant_id_attribute())
        .attribute(AttributeSchema::new("is_active", AttributeType::Bool).required())
        .attribute(
            AttributeSchema::new("public_key", AttributeType::String)
                .with_description("Key used to verify the JWTs issued by the custom identity provider"),
        )
}

pub async fn read_custom_idp(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let idp = match provider.appid.get_custom_idp(identifier).await {
        Ok(idp) => idp,
        Err(e) if e.is_not_found() => return Ok(not_found(id, "custom IDP", identifier)),
        Err(e) => return Err(api_error(id, "Error reading AppID custom IDP", e)),
    };

    let mut attributes = Attributes::new();
    attributes.insert("tenant_id".to_string(), Value::from(identifier));
    attributes.insert("is_active".to_string(), Value::Bool(idp.is_active));
    set_opt(
        &mut attributes,
        "public_key",
        idp.config.and_then(|c| c.public_key),
    );

    Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
}

pub async fn apply_custom_idp(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let tenant_id = require_str(attrs, "tenant_id", id)?;
    let is_active = get_bool(attrs, "is_active").unwrap_or(false);

    let idp = CustomIdp {
        is_active,
        config: is_active.then(|| CustomIdpSettings {
            public_key: get_str(attrs, "public_key").map(str::to_string),
        }),
    };
    provider
        .appid
        .set_custom_idp(tenant_id, &idp)
        .await
        .map_err(|e| api_error(id, "Error updating AppID custom IDP", e))?;

    read_custom_idp(provider, id, tenant_id).await
}

pub async fn reset_custom_idp(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    provider
        .appid
        .set_custom_idp(identifier, &CustomIdp::default())
        .await
        .map_err(|e| api_error(id, "Error resetting AppID custom IDP", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::provider_for;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_token_config_applies_defaults_and_claims() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT).path("/tenant-1/config/tokens").json_body(json!({
                    "access": {"expires_in": 7200},
                    "refresh": {"enabled": true, "expires_in": 2592000},
                    "anonymousAccess": {"enabled": false, "expires_in": 2592000},
                    "accessTokenClaims": [
                        {"source": "saml", "sourceClaim": "name", "destinationClaim": "user"}
                    ]
                }));
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tenant-1/config/tokens");
                then.status(200).json_body(json!({
                    "access": {"expires_in": 7200},
                    "refresh": {"enabled": true, "expires_in": 2592000},
                    "anonymousAccess": {"enabled": false, "expires_in": 2592000},
                    "accessTokenClaims": [
                        {"source": "saml", "sourceClaim": "name", "destinationClaim": "user"}
                    ]
                }));
            })
            .await;

        let claim = block([
            ("source", Some(Value::from("saml"))),
            ("source_claim", Some(Value::from("name"))),
            ("destination_claim", Some(Value::from("user"))),
        ]);
        let resource = Resource::new(TOKEN_CONFIG_TYPE, "tokens")
            .with_attribute("tenant_id", "tenant-1")
            .with_attribute("access_token_expires_in", Value::Int(7200))
            .with_attribute("refresh_token_enabled", true)
            .with_attribute("access_token_claim", Value::List(vec![claim]));

        let provider = provider_for(&server);
        let state = provider.create_resource(resource).await.unwrap();

        put.assert_async().await;
        assert_eq!(state.identifier.as_deref(), Some("tenant-1"));
        assert_eq!(
            state.attributes.get("anonymous_token_expires_in"),
            Some(&Value::Int(2_592_000))
        );
        assert_eq!(state.attributes.get("refresh_token_enabled"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_token_config_reset_on_delete() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT).path("/tenant-1/config/tokens").json_body(json!({
                    "access": {"expires_in": 3600},
                    "refresh": {"enabled": false, "expires_in": 2592000},
                    "anonymousAccess": {"enabled": true, "expires_in": 2592000}
                }));
                then.status(200);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(TOKEN_CONFIG_TYPE, "tokens");
        provider
            .delete_resource(&id, "tenant-1", &Attributes::new())
            .await
            .unwrap();
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_mfa_channel_sms() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/tenant-1/config/cloud_directory/mfa/channels/nexmo")
                    .json_body(json!({
                        "isActive": true,
                        "config": {"key": "k", "secret": "s", "from": "+15550100"}
                    }));
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tenant-1/config/cloud_directory/mfa/channels");
                then.status(200).json_body(json!({"channels": [
                    {"type": "email", "isActive": false},
                    {"type": "sms", "isActive": true,
                     "config": {"key": "k", "secret": "s", "from": "+15550100"}}
                ]}));
            })
            .await;

        let sms = block([
            ("key", Some(Value::from("k"))),
            ("secret", Some(Value::from("s"))),
            ("from", Some(Value::from("+15550100"))),
        ]);
        let resource = Resource::new(MFA_CHANNEL_TYPE, "mfa")
            .with_attribute("tenant_id", "tenant-1")
            .with_attribute("active", "sms")
            .with_attribute("sms_config", sms);

        let provider = provider_for(&server);
        let state = provider.create_resource(resource).await.unwrap();

        put.assert_async().await;
        assert_eq!(state.attributes.get("active"), Some(&Value::from("sms")));
        let config = first_block(&state.attributes, "sms_config").unwrap();
        assert_eq!(get_str(config, "from"), Some("+15550100"));
    }

    #[tokio::test]
    async fn test_mfa_channel_sms_requires_config() {
        let server = MockServer::start_async().await;
        let provider = provider_for(&server);
        let resource = Resource::new(MFA_CHANNEL_TYPE, "mfa")
            .with_attribute("tenant_id", "tenant-1")
            .with_attribute("active", "sms");

        let err = provider.create_resource(resource).await.unwrap_err();
        assert!(err.message.contains("sms_config"));
    }

    #[tokio::test]
    async fn test_cloud_directory_sends_interactions() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/tenant-1/config/idps/cloud_directory")
                    .json_body(json!({
                        "isActive": true,
                        "config": {
                            "selfServiceEnabled": true,
                            "signupEnabled": false,
                            "interactions": {
                                "identityConfirmation": {"accessMode": "FULL", "methods": ["email"]},
                                "welcomeEnabled": true,
                                "resetPasswordEnabled": true,
                                "resetPasswordNotificationEnable": true
                            },
                            "identityField": "email"
                        }
                    }));
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tenant-1/config/idps/cloud_directory");
                then.status(200).json_body(json!({"isActive": true, "config": {"signupEnabled": false}}));
            })
            .await;

        let resource = Resource::new(CLOUD_DIRECTORY_TYPE, "cd")
            .with_attribute("tenant_id", "tenant-1")
            .with_attribute("is_active", true)
            .with_attribute("signup_enabled", false)
            .with_attribute("identity_confirm_methods", Value::List(vec![Value::from("email")]))
            .with_attribute("identity_field", "email");

        let provider = provider_for(&server);
        let state = provider.create_resource(resource).await.unwrap();
        put.assert_async().await;
        assert_eq!(state.attributes.get("signup_enabled"), Some(&Value::Bool(false)));
    }

    #[tokio::test]
    async fn test_custom_idp_omits_key_when_inactive() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/tenant-1/config/idps/custom")
                    .json_body(json!({"isActive": false}));
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tenant-1/config/idps/custom");
                then.status(200).json_body(json!({"isActive": false}));
            })
            .await;

        let resource = Resource::new(CUSTOM_IDP_TYPE, "jwt")
            .with_attribute("tenant_id", "tenant-1")
            .with_attribute("is_active", false)
            .with_attribute("public_key", "-----BEGIN PUBLIC KEY-----");

        let provider = provider_for(&server);
        let state = provider.create_resource(resource).await.unwrap();
        put.assert_async().await;
        assert_eq!(state.attributes.get("is_active"), Some(&Value::Bool(false)));
        assert!(!state.attributes.contains_key("public_key"));
    }

    #[tokio::test]
    async fn test_custom_idp_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tenant-1/config/idps/custom");
                then.status(404);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(CUSTOM_IDP_TYPE, "jwt");
        assert!(!provider.read_resource(&id, Some("tenant-1")).await.unwrap().exists);
    }
}
