//! Provider configuration
//!
//! Credentials, region and service endpoints are read from the environment,
//! using the same variable names as the IBM Cloud CLI tooling.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_REGION: &str = "us-south";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("either IC_API_KEY or IC_IAM_TOKEN must be set")]
    MissingCredentials,

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Base URLs of the services the provider talks to
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoints {
    pub iam: String,
    pub vpc: String,
    pub power: String,
    pub event_notifications: String,
    pub schematics: String,
    pub appid: String,
}

impl Endpoints {
    /// Public endpoints for a region
    pub fn for_region(region: &str) -> Self {
        Self {
            iam: "https://iam.cloud.ibm.com".to_string(),
            vpc: format!("https://{}.iaas.cloud.ibm.com/v1", region),
            power: format!("https://{}.power-iaas.cloud.ibm.com/pcloud", region),
            event_notifications: format!(
                "https://{}.event-notifications.cloud.ibm.com/event-notifications/v1",
                region
            ),
            schematics: "https://schematics.cloud.ibm.com".to_string(),
            appid: format!("https://{}.appid.cloud.ibm.com/management/v4", region),
        }
    }

    /// Point every service at one base URL (used against local mock servers)
    pub fn all(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            iam: base.clone(),
            vpc: base.clone(),
            power: base.clone(),
            event_notifications: base.clone(),
            schematics: base.clone(),
            appid: base,
        }
    }
}

/// Overrides for the delay and poll interval of every status wait
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOverride {
    pub delay: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub iam_token: Option<String>,
    pub region: String,
    pub zone: Option<String>,
    pub account_id: Option<String>,
    pub http_timeout: Duration,
    pub endpoints: Endpoints,
    pub wait_override: Option<WaitOverride>,
}

impl ProviderConfig {
    pub fn new(region: impl Into<String>) -> Self {
        let region = region.into();
        Self {
            api_key: None,
            iam_token: None,
            endpoints: Endpoints::for_region(&region),
            region,
            zone: None,
            account_id: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            wait_override: None,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k));

        let region = first(&["IC_REGION", "IBMCLOUD_REGION"])
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let mut config = Self::new(region);

        config.api_key = first(&["IC_API_KEY", "IBMCLOUD_API_KEY"]);
        config.iam_token = first(&["IC_IAM_TOKEN", "IBMCLOUD_IAM_TOKEN"]);
        if config.api_key.is_none() && config.iam_token.is_none() {
            return Err(ConfigError::MissingCredentials);
        }

        config.zone = first(&["IC_ZONE", "IBMCLOUD_ZONE"]);
        config.account_id = first(&["IC_ACCOUNT_ID", "IBMCLOUD_ACCOUNT_ID"]);

        if let Some(raw) = lookup("IBMCLOUD_TIMEOUT") {
            let secs = raw.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
                key: "IBMCLOUD_TIMEOUT",
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        let endpoints = &mut config.endpoints;
        let overrides: [(&str, &mut String); 6] = [
            ("IBMCLOUD_IAM_API_ENDPOINT", &mut endpoints.iam),
            ("IBMCLOUD_IS_NG_API_ENDPOINT", &mut endpoints.vpc),
            ("IBMCLOUD_PI_API_ENDPOINT", &mut endpoints.power),
            (
                "IBMCLOUD_EVENT_NOTIFICATIONS_API_ENDPOINT",
                &mut endpoints.event_notifications,
            ),
            ("IBMCLOUD_SCHEMATICS_API_ENDPOINT", &mut endpoints.schematics),
            ("IBMCLOUD_APPID_MANAGEMENT_API_ENDPOINT", &mut endpoints.appid),
        ];
        for (key, slot) in overrides {
            if let Some(url) = lookup(key) {
                *slot = url.trim_end_matches('/').to_string();
            }
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_iam_token(mut self, token: impl Into<String>) -> Self {
        self.iam_token = Some(token.into());
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    pub fn with_wait_override(mut self, delay: Duration, poll_interval: Duration) -> Self {
        self.wait_override = Some(WaitOverride {
            delay,
            poll_interval,
        });
        self
    }

    /// Zone used in Power Systems CRNs, falling back to the region
    pub fn power_zone(&self) -> &str {
        self.zone.as_deref().unwrap_or(&self.region)
    }
}
