//! Data sources
//!
//! Read-only lookups. Each takes its inputs from the declared attributes,
//! issues a single GET and returns the result as a State.

use cirrus_core::identifier::join_id;
use cirrus_core::provider::{ProviderError, ProviderResult, ResourceType};
use cirrus_core::resource::{ResourceId, State, Value, attributes_from_json};
use cirrus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use crate::provider::IbmProvider;
use crate::resources::{appid, define_resource_type, pi_dhcp};
use crate::utils::{Attributes, api_error, require_str, set_opt, string_list};

pub const PI_VOLUME_TYPE: &str = "ibm_pi_volume";
pub const PI_DHCP_TYPE: &str = "ibm_pi_dhcp";
pub const EN_TOPIC_TYPE: &str = "ibm_en_topic";
pub const APPID_CLOUD_DIRECTORY_TYPE: &str = "ibm_appid_idp_cloud_directory";
pub const APPID_ACTION_URL_TYPE: &str = "ibm_appid_action_url";
pub const APPID_APPLICATION_SCOPES_TYPE: &str = "ibm_appid_application_scopes";

const ACTIONS: &[&str] = &["on_user_verified", "on_reset_password"];

fn input(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::String).required()
}

fn output(name: &str, attr_type: AttributeType) -> AttributeSchema {
    AttributeSchema::new(name, attr_type).computed()
}

// =============================================================================
// Schemas
// =============================================================================

pub fn pi_volume_schema() -> ResourceSchema {
    ResourceSchema::new(PI_VOLUME_TYPE)
        .with_description("Volume of a Power Systems Virtual Server workspace")
        .attribute(input("pi_volume_name").with_description("Volume name or ID"))
        .attribute(input("pi_cloud_instance_id"))
        .attribute(output("state", AttributeType::String))
        .attribute(output("size", AttributeType::Int))
        .attribute(output("shareable", AttributeType::Bool))
        .attribute(output("bootable", AttributeType::Bool))
        .attribute(output("disk_type", AttributeType::String))
        .attribute(output("volume_pool", AttributeType::String))
        .attribute(output("wwn", AttributeType::String))
}

pub fn pi_dhcp_schema() -> ResourceSchema {
    let lease = BlockSchema::new()
        .attribute(AttributeSchema::new("instance_ip", AttributeType::String))
        .attribute(AttributeSchema::new("instance_mac", AttributeType::String));

    ResourceSchema::new(PI_DHCP_TYPE)
        .with_description("DHCP server of a Power Systems Virtual Server workspace")
        .attribute(input("pi_cloud_instance_id"))
        .attribute(input("dhcp_id"))
        .attribute(output("status", AttributeType::String))
        .attribute(output("network", AttributeType::String))
        .attribute(output("leases", AttributeType::Block(Box::new(lease))))
}

pub fn en_topic_schema() -> ResourceSchema {
    let rule = BlockSchema::new()
        .attribute(AttributeSchema::new("id", AttributeType::String))
        .attribute(AttributeSchema::new("enabled", AttributeType::Bool))
        .attribute(AttributeSchema::new("event_type_filter", AttributeType::String))
        .attribute(AttributeSchema::new("notification_filter", AttributeType::String))
        .attribute(AttributeSchema::new("updated_at", AttributeType::String));
    let source = BlockSchema::new()
        .attribute(AttributeSchema::new("id", AttributeType::String))
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("rules", AttributeType::Block(Box::new(rule))));
    let subscription = [
        "id",
        "name",
        "description",
        "destination_type",
        "destination_id",
        "topic_id",
        "updated_at",
    ]
    .into_iter()
    .fold(BlockSchema::new(), |block, name| {
        block.attribute(AttributeSchema::new(name, AttributeType::String))
    });

    ResourceSchema::new(EN_TOPIC_TYPE)
        .with_description("Topic of an Event Notifications instance")
        .attribute(input("instance_guid"))
        .attribute(input("topic_id"))
        .attribute(output("name", AttributeType::String))
        .attribute(output("description", AttributeType::String))
        .attribute(output("source_count", AttributeType::Int))
        .attribute(output("sources", AttributeType::Block(Box::new(source))))
        .attribute(output("subscription_count", AttributeType::Int))
        .attribute(output("subscriptions", AttributeType::Block(Box::new(subscription))))
        .attribute(output("updated_at", AttributeType::String))
}

pub fn appid_cloud_directory_schema() -> ResourceSchema {
    let schema = ResourceSchema::new(APPID_CLOUD_DIRECTORY_TYPE)
        .with_description("Cloud Directory identity provider settings of an AppID tenant")
        .attribute(input("tenant_id"))
        .attribute(output("is_active", AttributeType::Bool));
    appid::cloud_directory_settings(schema, false)
}

pub fn appid_action_url_schema() -> ResourceSchema {
    ResourceSchema::new(APPID_ACTION_URL_TYPE)
        .with_description("Redirect URL of a Cloud Directory action")
        .attribute(input("tenant_id"))
        .attribute(AttributeSchema::new("action", types::one_of(ACTIONS)).required())
        .attribute(output("url", AttributeType::String))
}

pub fn appid_application_scopes_schema() -> ResourceSchema {
    ResourceSchema::new(APPID_APPLICATION_SCOPES_TYPE)
        .with_description("Scopes of an AppID application")
        .attribute(input("tenant_id"))
        .attribute(input("client_id"))
        .attribute(output("scopes", types::string_list()))
}

define_resource_type!(PiVolumeDataSource, PI_VOLUME_TYPE, pi_volume_schema);
define_resource_type!(PiDhcpDataSource, PI_DHCP_TYPE, pi_dhcp_schema);
define_resource_type!(EnTopicDataSource, EN_TOPIC_TYPE, en_topic_schema);
define_resource_type!(
    AppIdCloudDirectoryDataSource,
    APPID_CLOUD_DIRECTORY_TYPE,
    appid_cloud_directory_schema
);
define_resource_type!(
    AppIdActionUrlDataSource,
    APPID_ACTION_URL_TYPE,
    appid_action_url_schema
);
define_resource_type!(
    AppIdApplicationScopesDataSource,
    APPID_APPLICATION_SCOPES_TYPE,
    appid_application_scopes_schema
);

/// Returns all data source types supported by this provider
pub fn data_source_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(PiVolumeDataSource),
        Box::new(PiDhcpDataSource),
        Box::new(EnTopicDataSource),
        Box::new(AppIdCloudDirectoryDataSource),
        Box::new(AppIdActionUrlDataSource),
        Box::new(AppIdApplicationScopesDataSource),
    ]
}

// =============================================================================
// Reads
// =============================================================================

pub async fn read_pi_volume(provider: &IbmProvider, id: &ResourceId, attributes: &Attributes) -> ProviderResult<State> {
    let cloud_instance_id = require_str(attributes, "pi_cloud_instance_id", id)?;
    let name = require_str(attributes, "pi_volume_name", id)?;

    let volume = provider
        .power
        .get_volume(cloud_instance_id, name)
        .await
        .map_err(|e| api_error(id, format!("Error getting volume ({})", name), e))?;

    let mut result = attributes.clone();
    set_opt(&mut result, "state", volume.state);
    set_opt(&mut result, "size", volume.size.map(|s| s as i64));
    set_opt(&mut result, "shareable", volume.shareable);
    set_opt(&mut result, "bootable", volume.bootable);
    set_opt(&mut result, "disk_type", volume.disk_type);
    set_opt(&mut result, "volume_pool", volume.volume_pool);
    set_opt(&mut result, "wwn", volume.wwn);

    Ok(State::existing(id.clone(), result).with_identifier(volume.volume_id))
}

pub async fn read_pi_dhcp(provider: &IbmProvider, id: &ResourceId, attributes: &Attributes) -> ProviderResult<State> {
    let cloud_instance_id = require_str(attributes, "pi_cloud_instance_id", id)?;
    let dhcp_id = require_str(attributes, "dhcp_id", id)?;

    let dhcp = match provider.power.get_dhcp(cloud_instance_id, dhcp_id).await {
        Ok(dhcp) => dhcp,
        Err(e) if e.is_not_found() => {
            log::debug!("DHCP server {} does not exist", dhcp_id);
            return Ok(State::not_found(id.clone()));
        }
        Err(e) => return Err(api_error(id, format!("Error getting DHCP server ({})", dhcp_id), e)),
    };

    Ok(State::existing(id.clone(), pi_dhcp::dhcp_attributes(cloud_instance_id, &dhcp)).with_identifier(dhcp.id))
}

pub async fn read_en_topic(provider: &IbmProvider, id: &ResourceId, attributes: &Attributes) -> ProviderResult<State> {
    let instance_guid = require_str(attributes, "instance_guid", id)?;
    let topic_id = require_str(attributes, "topic_id", id)?;

    let topic = provider
        .event_notifications
        .get_topic(instance_guid, topic_id)
        .await
        .map_err(|e| api_error(id, "GetTopic failed", e))?;

    let json = serde_json::to_value(&topic).map_err(|e| {
        ProviderError::new(format!("Failed to convert topic {}: {}", topic_id, e)).for_resource(id.clone())
    })?;
    let mut result = json.as_object().map(attributes_from_json).unwrap_or_default();
    result.remove("id");
    result.insert("instance_guid".to_string(), Value::from(instance_guid));
    result.insert("topic_id".to_string(), Value::from(topic_id));

    Ok(State::existing(id.clone(), result).with_identifier(join_id(&[instance_guid, topic_id])))
}

pub async fn read_appid_cloud_directory(
    provider: &IbmProvider,
    id: &ResourceId,
    attributes: &Attributes,
) -> ProviderResult<State> {
    let tenant_id = require_str(attributes, "tenant_id", id)?;

    let idp = provider
        .appid
        .get_cloud_directory_idp(tenant_id)
        .await
        .map_err(|e| api_error(id, "Error reading AppID Cloud Directory IDP", e))?;

    Ok(State::existing(id.clone(), appid::cloud_directory_attributes(tenant_id, &idp)).with_identifier(tenant_id))
}

pub async fn read_appid_action_url(
    provider: &IbmProvider,
    id: &ResourceId,
    attributes: &Attributes,
) -> ProviderResult<State> {
    let tenant_id = require_str(attributes, "tenant_id", id)?;
    let action = require_str(attributes, "action", id)?;
    if !ACTIONS.contains(&action) {
        return Err(ProviderError::new(format!(
            "Invalid action '{}', expected one of: {}",
            action,
            ACTIONS.join(", ")
        ))
        .for_resource(id.clone()));
    }

    let url = provider
        .appid
        .get_action_url(tenant_id, action)
        .await
        .map_err(|e| api_error(id, "Error getting AppID Cloud Directory action URL", e))?;

    let mut result = attributes.clone();
    set_opt(&mut result, "url", url);
    Ok(State::existing(id.clone(), result).with_identifier(join_id(&[tenant_id, action])))
}

pub async fn read_appid_application_scopes(
    provider: &IbmProvider,
    id: &ResourceId,
    attributes: &Attributes,
) -> ProviderResult<State> {
    let tenant_id = require_str(attributes, "tenant_id", id)?;
    let client_id = require_str(attributes, "client_id", id)?;

    let scopes = provider
        .appid
        .get_application_scopes(tenant_id, client_id)
        .await
        .map_err(|e| api_error(id, "Error getting AppID application scopes", e))?;

    let mut result = attributes.clone();
    result.insert("scopes".to_string(), string_list(&scopes));
    Ok(State::existing(id.clone(), result).with_identifier(join_id(&[tenant_id, client_id])))
}
