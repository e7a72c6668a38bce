//! IBM Cloud provider implementation
//!
//! Holds one REST client per service and dispatches each operation to the
//! adapter of the resource type.

use std::collections::HashMap;
use std::time::Duration;

use cirrus_core::provider::{ProviderError, ProviderResult};
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::wait::StateChangeConf;

use crate::client::{
    AppIdClient, EventNotificationsClient, HttpClient, PowerClient, SchematicsClient, VpcClient,
};
use crate::config::{ConfigError, ProviderConfig};
use crate::data_sources;
use crate::resources::{self, appid, en_destination, pi_dhcp, pi_image, schematics, volume};

/// Refresh interval of every status wait
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// IBM Cloud Provider
pub struct IbmProvider {
    config: ProviderConfig,
    pub(crate) vpc: VpcClient,
    pub(crate) power: PowerClient,
    pub(crate) event_notifications: EventNotificationsClient,
    pub(crate) schematics: SchematicsClient,
    pub(crate) appid: AppIdClient,
}

impl IbmProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ConfigError> {
        let http = HttpClient::new(&config)?;
        let endpoints = &config.endpoints;

        Ok(Self {
            vpc: VpcClient::new(http.clone(), endpoints.vpc.clone()),
            power: PowerClient::new(
                http.clone(),
                endpoints.power.clone(),
                config.power_zone(),
                config.account_id.clone(),
            ),
            event_notifications: EventNotificationsClient::new(
                http.clone(),
                endpoints.event_notifications.clone(),
            ),
            schematics: SchematicsClient::new(http.clone(), endpoints.schematics.clone()),
            appid: AppIdClient::new(http, endpoints.appid.clone()),
            config,
        })
    }

    /// Create a provider configured from `IC_*` / `IBMCLOUD_*` variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ProviderConfig::from_env()?)
    }

    /// Poller for a status wait: sleeps `delay` before the first refresh, then
    /// polls every [`DEFAULT_POLL_INTERVAL`] unless the config overrides both
    pub(crate) fn state_change(
        &self,
        pending: &[&str],
        target: &[&str],
        timeout: Duration,
        delay: Duration,
    ) -> StateChangeConf {
        let conf = StateChangeConf::new(pending, target, timeout);
        match self.config.wait_override {
            Some(o) => conf.with_delay(o.delay).with_poll_interval(o.poll_interval),
            None => conf.with_delay(delay).with_poll_interval(DEFAULT_POLL_INTERVAL),
        }
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    pub async fn read_resource(&self, id: &ResourceId, identifier: Option<&str>) -> ProviderResult<State> {
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };

        match id.resource_type.as_str() {
            volume::RESOURCE_TYPE => volume::read(self, id, identifier).await,
            pi_dhcp::RESOURCE_TYPE => pi_dhcp::read(self, id, identifier).await,
            pi_image::RESOURCE_TYPE => pi_image::read(self, id, identifier).await,
            en_destination::RESOURCE_TYPE => en_destination::read(self, id, identifier).await,
            schematics::INVENTORY_TYPE => schematics::read_inventory(self, id, identifier).await,
            schematics::RESOURCE_QUERY_TYPE => {
                schematics::read_resource_query(self, id, identifier).await
            }
            appid::TOKEN_CONFIG_TYPE => appid::read_token_config(self, id, identifier).await,
            appid::MFA_CHANNEL_TYPE => appid::read_mfa_channel(self, id, identifier).await,
            appid::CLOUD_DIRECTORY_TYPE => {
                appid::read_cloud_directory(self, id, identifier).await
            }
            appid::CUSTOM_IDP_TYPE => appid::read_custom_idp(self, id, identifier).await,
            other => Err(unknown_type(id, other)),
        }
    }

    pub async fn create_resource(&self, resource: Resource) -> ProviderResult<State> {
        let resource = with_defaults(resource);
        let id = &resource.id;

        match id.resource_type.as_str() {
            volume::RESOURCE_TYPE => volume::create(self, &resource).await,
            pi_dhcp::RESOURCE_TYPE => pi_dhcp::create(self, &resource).await,
            pi_image::RESOURCE_TYPE => pi_image::create(self, &resource).await,
            en_destination::RESOURCE_TYPE => en_destination::create(self, &resource).await,
            schematics::INVENTORY_TYPE => schematics::create_inventory(self, &resource).await,
            schematics::RESOURCE_QUERY_TYPE => {
                schematics::create_resource_query(self, &resource).await
            }
            appid::TOKEN_CONFIG_TYPE => appid::apply_token_config(self, &resource).await,
            appid::MFA_CHANNEL_TYPE => appid::apply_mfa_channel(self, &resource).await,
            appid::CLOUD_DIRECTORY_TYPE => appid::apply_cloud_directory(self, &resource).await,
            appid::CUSTOM_IDP_TYPE => appid::apply_custom_idp(self, &resource).await,
            other => Err(unknown_type(id, other)),
        }
    }

    pub async fn update_resource(
        &self,
        id: ResourceId,
        identifier: &str,
        from: State,
        to: Resource,
    ) -> ProviderResult<State> {
        let to = with_defaults(to);

        match id.resource_type.as_str() {
            volume::RESOURCE_TYPE => volume::update(self, &id, identifier, &from, &to).await,
            pi_dhcp::RESOURCE_TYPE => Err(ProviderError::new(
                "DHCP servers cannot be updated in place, delete and recreate",
            )
            .for_resource(id)),
            // Only image_id could change and it forces a new image
            pi_image::RESOURCE_TYPE => pi_image::read(self, &id, identifier).await,
            en_destination::RESOURCE_TYPE => {
                en_destination::update(self, &id, identifier, &from, &to).await
            }
            schematics::INVENTORY_TYPE => {
                schematics::update_inventory(self, &id, identifier, &from, &to).await
            }
            schematics::RESOURCE_QUERY_TYPE => {
                schematics::update_resource_query(self, &id, identifier, &from, &to).await
            }
            appid::TOKEN_CONFIG_TYPE => appid::apply_token_config(self, &to).await,
            appid::MFA_CHANNEL_TYPE => appid::apply_mfa_channel(self, &to).await,
            appid::CLOUD_DIRECTORY_TYPE => appid::apply_cloud_directory(self, &to).await,
            appid::CUSTOM_IDP_TYPE => appid::apply_custom_idp(self, &to).await,
            other => Err(unknown_type(&id, other)),
        }
    }

    pub async fn delete_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        attributes: &HashMap<String, Value>,
    ) -> ProviderResult<()> {
        match id.resource_type.as_str() {
            volume::RESOURCE_TYPE => volume::delete(self, id, identifier, attributes).await,
            pi_dhcp::RESOURCE_TYPE => pi_dhcp::delete(self, id, identifier, attributes).await,
            pi_image::RESOURCE_TYPE => pi_image::delete(self, id, identifier).await,
            en_destination::RESOURCE_TYPE => en_destination::delete(self, id, identifier).await,
            schematics::INVENTORY_TYPE => schematics::delete_inventory(self, id, identifier).await,
            schematics::RESOURCE_QUERY_TYPE => {
                schematics::delete_resource_query(self, id, identifier).await
            }
            appid::TOKEN_CONFIG_TYPE => appid::reset_token_config(self, id, identifier).await,
            appid::MFA_CHANNEL_TYPE => appid::reset_mfa_channel(self, id, identifier).await,
            appid::CLOUD_DIRECTORY_TYPE => {
                appid::reset_cloud_directory(self, id, identifier).await
            }
            appid::CUSTOM_IDP_TYPE => appid::reset_custom_idp(self, id, identifier).await,
            other => Err(unknown_type(id, other)),
        }
    }

    // =========================================================================
    // Data Sources
    // =========================================================================

    pub async fn read_data_source(&self, resource: &Resource) -> ProviderResult<State> {
        let id = &resource.id;
        let attributes = &resource.attributes;

        match id.resource_type.as_str() {
            data_sources::PI_VOLUME_TYPE => data_sources::read_pi_volume(self, id, attributes).await,
            data_sources::PI_DHCP_TYPE => data_sources::read_pi_dhcp(self, id, attributes).await,
            data_sources::EN_TOPIC_TYPE => data_sources::read_en_topic(self, id, attributes).await,
            data_sources::APPID_CLOUD_DIRECTORY_TYPE => {
                data_sources::read_appid_cloud_directory(self, id, attributes).await
            }
            data_sources::APPID_ACTION_URL_TYPE => {
                data_sources::read_appid_action_url(self, id, attributes).await
            }
            data_sources::APPID_APPLICATION_SCOPES_TYPE => {
                data_sources::read_appid_application_scopes(self, id, attributes).await
            }
            other => Err(ProviderError::new(format!("Unknown data source type: {}", other))
                .for_resource(id.clone())),
        }
    }
}

fn unknown_type(id: &ResourceId, resource_type: &str) -> ProviderError {
    ProviderError::new(format!("Unknown resource type: {}", resource_type)).for_resource(id.clone())
}

/// Fill schema defaults the manifest left out
fn with_defaults(mut resource: Resource) -> Resource {
    if let Some(schema) = resources::schema_for(&resource.id.resource_type) {
        schema.apply_defaults(&mut resource.attributes);
    }
    resource
}
