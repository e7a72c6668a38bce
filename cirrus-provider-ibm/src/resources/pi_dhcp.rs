//! ibm_pi_dhcp - DHCP server of a Power Systems workspace

use std::time::Duration;

use cirrus_core::identifier::{join_id, split_pair};
use cirrus_core::provider::ProviderResult;
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema};

use crate::client::{ApiError, DhcpServer, DhcpServerCreate};
use crate::provider::IbmProvider;
use crate::utils::{
    Attributes, Timeouts, api_error, block, get_str, invalid_identifier, require_str, set_opt,
    wait_error,
};

pub const RESOURCE_TYPE: &str = "ibm_pi_dhcp";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(30, 30, 10);
const WAIT_DELAY: Duration = Duration::from_secs(10);

const STATUS_ACTIVE: &str = "ACTIVE";
const STATUS_BUILDING: &str = "Building";
const STATUS_DELETING: &str = "Deleting";
const STATUS_DELETED: &str = "Deleted";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("DHCP server of a Power Systems Virtual Server workspace")
        .attribute(
            AttributeSchema::new("pi_cloud_instance_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("pi_cloud_connection_id", AttributeType::String)
                .force_new()
                .with_description("Cloud connection to attach the DHCP private network to"),
        )
        .attribute(AttributeSchema::new("dhcp_id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(AttributeSchema::new("network", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new(
                "leases",
                AttributeType::Block(Box::new(
                    BlockSchema::new()
                        .attribute(AttributeSchema::new("instance_ip", AttributeType::String))
                        .attribute(AttributeSchema::new("instance_mac", AttributeType::String)),
                )),
            )
            .computed(),
        )
}

pub(crate) fn dhcp_attributes(cloud_instance_id: &str, dhcp: &DhcpServer) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("pi_cloud_instance_id".to_string(), Value::from(cloud_instance_id));
    attributes.insert("dhcp_id".to_string(), Value::from(dhcp.id.as_str()));
    attributes.insert("status".to_string(), Value::from(dhcp.status.as_str()));
    set_opt(&mut attributes, "network", dhcp.network.as_ref().map(|n| n.id.clone()));

    let leases = dhcp
        .leases
        .iter()
        .map(|l| {
            block([
                ("instance_ip", Some(Value::from(l.instance_ip.as_str()))),
                ("instance_mac", Some(Value::from(l.instance_mac.as_str()))),
            ])
        })
        .collect();
    attributes.insert("leases".to_string(), Value::List(leases));
    attributes
}

pub async fn read(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let (cloud_instance_id, dhcp_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;

    let dhcp = match provider.power.get_dhcp(&cloud_instance_id, &dhcp_id).await {
        Ok(dhcp) => dhcp,
        Err(e) if e.is_not_found() => {
            log::warn!("DHCP server {} not found, removing it from state", dhcp_id);
            return Ok(State::not_found(id.clone()));
        }
        Err(e) => return Err(api_error(id, format!("Error getting DHCP server ({})", dhcp_id), e)),
    };

    Ok(State::existing(id.clone(), dhcp_attributes(&cloud_instance_id, &dhcp)).with_identifier(identifier))
}

pub async fn create(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let timeouts = Timeouts::from_attributes(DEFAULT_TIMEOUTS, attrs, id)?;
    let cloud_instance_id = require_str(attrs, "pi_cloud_instance_id", id)?;

    let body = DhcpServerCreate {
        cloud_connection_id: get_str(attrs, "pi_cloud_connection_id").map(str::to_string),
    };
    let created = provider
        .power
        .create_dhcp(cloud_instance_id, &body)
        .await
        .map_err(|e| api_error(id, "Error creating DHCP server", e))?;
    log::info!("DHCP server {} created", created.id);

    let power = &provider.power;
    let dhcp_id = created.id.as_str();
    let dhcp = provider
        .state_change(&[STATUS_BUILDING], &[STATUS_ACTIVE], timeouts.create, WAIT_DELAY)
        .wait_for_state(|| async move {
            let dhcp = power.get_dhcp(cloud_instance_id, dhcp_id).await?;
            let status = if dhcp.status == STATUS_ACTIVE {
                STATUS_ACTIVE
            } else {
                STATUS_BUILDING
            };
            Ok::<_, ApiError>((dhcp, status.to_string()))
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for DHCP server ({}) to be active", dhcp_id), e))?;

    let identifier = join_id(&[cloud_instance_id, dhcp_id]);
    Ok(State::existing(id.clone(), dhcp_attributes(cloud_instance_id, &dhcp)).with_identifier(identifier))
}

pub async fn delete(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    attributes: &Attributes,
) -> ProviderResult<()> {
    let timeouts = Timeouts::from_attributes(DEFAULT_TIMEOUTS, attributes, id)?;
    let (cloud_instance_id, dhcp_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;

    match provider.power.delete_dhcp(&cloud_instance_id, &dhcp_id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(api_error(id, format!("Error deleting DHCP server ({})", dhcp_id), e)),
    }

    let power = &provider.power;
    let (cloud_instance_id, dhcp_id) = (cloud_instance_id.as_str(), dhcp_id.as_str());
    provider
        .state_change(&[STATUS_DELETING], &[STATUS_DELETED], timeouts.delete, WAIT_DELAY)
        .wait_for_state(|| async move {
            // Any lookup failure counts as gone
            let status = match power.get_dhcp(cloud_instance_id, dhcp_id).await {
                Ok(_) => STATUS_DELETING,
                Err(_) => STATUS_DELETED,
            };
            Ok::<_, ApiError>(((), status.to_string()))
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for DHCP server ({}) to be deleted", dhcp_id), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::provider_for;
    use httpmock::prelude::*;
    use serde_json::json;

    fn dhcp_json(status: &str) -> serde_json::Value {
        json!({
            "id": "dhcp-1",
            "status": status,
            "network": {"id": "net-1", "name": "DHCPSERVERnet"},
            "leases": [{"instanceIP": "192.168.0.10", "instanceMacAddress": "fa:16:3e:aa:bb:cc"}]
        })
    }

    #[tokio::test]
    async fn test_create_returns_composite_identifier() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/cloud-instances/cid-1/services/dhcp")
                    .json_body(json!({"cloudConnectionID": "cc-1"}));
                then.status(202).json_body(json!({"id": "dhcp-1", "status": "BUILD"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/services/dhcp/dhcp-1");
                then.status(200).json_body(dhcp_json("ACTIVE"));
            })
            .await;

        let provider = provider_for(&server);
        let resource = Resource::new(RESOURCE_TYPE, "dhcp")
            .with_attribute("pi_cloud_instance_id", "cid-1")
            .with_attribute("pi_cloud_connection_id", "cc-1");
        let state = provider.create_resource(resource).await.unwrap();

        create.assert_async().await;
        assert_eq!(state.identifier.as_deref(), Some("cid-1/dhcp-1"));
        assert_eq!(state.attributes.get("network"), Some(&Value::from("net-1")));
        let leases = state.attributes.get("leases").and_then(Value::as_list).unwrap();
        assert_eq!(
            leases[0].as_map().unwrap().get("instance_mac"),
            Some(&Value::from("fa:16:3e:aa:bb:cc"))
        );
    }

    #[tokio::test]
    async fn test_create_times_out_while_building() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/cloud-instances/cid-1/services/dhcp");
                then.status(202).json_body(json!({"id": "dhcp-1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/services/dhcp/dhcp-1");
                then.status(200).json_body(dhcp_json("BUILD"));
            })
            .await;

        let provider = provider_for(&server);
        let resource = Resource::new(RESOURCE_TYPE, "dhcp")
            .with_attribute("pi_cloud_instance_id", "cid-1")
            .with_attribute(
                "timeouts",
                Value::Map([("create".to_string(), Value::from("30ms"))].into()),
            );
        let err = provider.create_resource(resource).await.unwrap_err();
        assert!(err.message.contains("last state: 'Building'"));
    }

    #[tokio::test]
    async fn test_read_not_found_and_bad_identifier() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/services/dhcp/dhcp-1");
                then.status(404);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "dhcp");
        let state = provider.read_resource(&id, Some("cid-1/dhcp-1")).await.unwrap();
        assert!(!state.exists);

        let err = provider.read_resource(&id, Some("dhcp-1")).await.unwrap_err();
        assert!(err.message.contains("Incorrect ID dhcp-1"));
    }

    #[tokio::test]
    async fn test_delete_waits_until_gone() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/cloud-instances/cid-1/services/dhcp/dhcp-1");
                then.status(202);
            })
            .await;
        let get = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/services/dhcp/dhcp-1");
                then.status(404);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "dhcp");
        provider
            .delete_resource(&id, "cid-1/dhcp-1", &Attributes::new())
            .await
            .unwrap();

        delete.assert_async().await;
        get.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_delete_already_gone() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/cloud-instances/cid-1/services/dhcp/dhcp-1");
                then.status(404);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "dhcp");
        provider
            .delete_resource(&id, "cid-1/dhcp-1", &Attributes::new())
            .await
            .unwrap();
    }
}
