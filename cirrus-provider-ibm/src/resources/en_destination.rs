//! ibm_en_destination - webhook destination of an Event Notifications instance

use std::collections::BTreeMap;

use cirrus_core::differ::find_changed_attributes;
use cirrus_core::identifier::{join_id, split_pair};
use cirrus_core::provider::ProviderResult;
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use crate::client::{Destination, DestinationConfig, DestinationRequest, WebhookParams};
use crate::provider::IbmProvider;
use crate::utils::{
    Attributes, api_error, block, first_block, get_str, get_str_list, invalid_identifier,
    require_str, set_opt, string_list,
};

pub const RESOURCE_TYPE: &str = "ibm_en_destination";

const DESTINATION_TYPES: &[&str] = &["webhook"];

fn params_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(
            AttributeSchema::new("url", AttributeType::String)
                .required()
                .with_description("URL of the webhook"),
        )
        .attribute(
            AttributeSchema::new("verb", AttributeType::String)
                .required()
                .with_description("HTTP method of the webhook"),
        )
        .attribute(AttributeSchema::new(
            "custom_headers",
            AttributeType::Map(Box::new(AttributeType::String)),
        ))
        .attribute(AttributeSchema::new("sensitive_headers", types::string_list()))
        .with_max_items(1)
}

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Destination that receives notifications of an Event Notifications instance")
        .attribute(
            AttributeSchema::new("instance_guid", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("type", types::one_of(DESTINATION_TYPES))
                .required()
                .force_new(),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(AttributeSchema::new(
            "config",
            AttributeType::Block(Box::new(
                BlockSchema::new()
                    .attribute(AttributeSchema::new(
                        "params",
                        AttributeType::Block(Box::new(params_block())),
                    ))
                    .with_max_items(1),
            )),
        ))
        .attribute(AttributeSchema::new("destination_id", AttributeType::String).computed())
        .attribute(AttributeSchema::new("updated_at", AttributeType::String).computed())
        .attribute(AttributeSchema::new("subscription_count", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("subscription_names", types::string_list()).computed())
}

fn config_from_attributes(attributes: &Attributes) -> Option<DestinationConfig> {
    let params = first_block(attributes, "config").and_then(|c| first_block(c, "params"))?;

    let custom_headers: BTreeMap<String, String> = params
        .get("custom_headers")
        .and_then(Value::as_map)
        .map(|headers| {
            headers
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Some(DestinationConfig {
        params: WebhookParams {
            url: get_str(params, "url").unwrap_or_default().to_string(),
            verb: get_str(params, "verb").unwrap_or_default().to_string(),
            custom_headers,
            sensitive_headers: get_str_list(params, "sensitive_headers"),
        },
    })
}

fn config_value(config: &DestinationConfig) -> Value {
    let params = &config.params;
    let headers = (!params.custom_headers.is_empty()).then(|| {
        Value::Map(
            params
                .custom_headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect(),
        )
    });
    let sensitive = (!params.sensitive_headers.is_empty()).then(|| string_list(&params.sensitive_headers));

    let params = block([
        ("url", Some(Value::from(params.url.as_str()))),
        ("verb", Some(Value::from(params.verb.as_str()))),
        ("custom_headers", headers),
        ("sensitive_headers", sensitive),
    ]);
    Value::List(vec![block([("params", Some(Value::List(vec![params])))])])
}

fn request_from_attributes(attributes: &Attributes, id: &ResourceId) -> ProviderResult<DestinationRequest> {
    Ok(DestinationRequest {
        name: require_str(attributes, "name", id)?.to_string(),
        destination_type: require_str(attributes, "type", id)?.to_string(),
        description: get_str(attributes, "description").map(str::to_string),
        config: config_from_attributes(attributes),
    })
}

fn destination_attributes(instance_guid: &str, destination: &Destination) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("instance_guid".to_string(), Value::from(instance_guid));
    attributes.insert("destination_id".to_string(), Value::from(destination.id.as_str()));
    attributes.insert("name".to_string(), Value::from(destination.name.as_str()));
    attributes.insert(
        "type".to_string(),
        Value::from(destination.destination_type.as_str()),
    );
    set_opt(&mut attributes, "description", destination.description.clone());
    set_opt(&mut attributes, "config", destination.config.as_ref().map(config_value));
    set_opt(&mut attributes, "updated_at", destination.updated_at.clone());
    attributes.insert(
        "subscription_count".to_string(),
        Value::Int(destination.subscription_count.unwrap_or(0)),
    );
    if !destination.subscription_names.is_empty() {
        attributes.insert(
            "subscription_names".to_string(),
            string_list(&destination.subscription_names),
        );
    }
    attributes
}

pub async fn read(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let (instance_guid, destination_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;

    let destination = match provider
        .event_notifications
        .get_destination(&instance_guid, &destination_id)
        .await
    {
        Ok(destination) => destination,
        Err(e) if e.is_not_found() => {
            log::warn!("Destination {} not found, removing it from state", destination_id);
            return Ok(State::not_found(id.clone()));
        }
        Err(e) => return Err(api_error(id, "GetDestination failed", e)),
    };

    Ok(State::existing(id.clone(), destination_attributes(&instance_guid, &destination)).with_identifier(identifier))
}

pub async fn create(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let instance_guid = require_str(attrs, "instance_guid", id)?;
    let request = request_from_attributes(attrs, id)?;

    let created = provider
        .event_notifications
        .create_destination(instance_guid, &request)
        .await
        .map_err(|e| api_error(id, "CreateDestination failed", e))?;

    let identifier = join_id(&[instance_guid, &created.id]);
    read(provider, id, &identifier).await
}

pub async fn update(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let (instance_guid, destination_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;
    let attrs = &to.attributes;

    let changed = find_changed_attributes(attrs, &from.attributes);
    if changed
        .iter()
        .any(|c| matches!(c.as_str(), "name" | "description" | "config"))
    {
        let request = request_from_attributes(attrs, id)?;
        provider
            .event_notifications
            .update_destination(&instance_guid, &destination_id, &request)
            .await
            .map_err(|e| api_error(id, "UpdateDestination failed", e))?;
    }

    read(provider, id, identifier).await
}

pub async fn delete(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    let (instance_guid, destination_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;

    match provider
        .event_notifications
        .delete_destination(&instance_guid, &destination_id)
        .await
    {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(api_error(id, "DeleteDestination failed", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::provider_for;
    use httpmock::prelude::*;
    use serde_json::json;

    const PATH: &str = "/instances/guid-1/destinations/dest-1";

    fn config_attribute() -> Value {
        let params = block([
            ("url", Some(Value::from("https://example.com/hook"))),
            ("verb", Some(Value::from("post"))),
            (
                "custom_headers",
                Some(Value::Map([("X-Env".to_string(), Value::from("prod"))].into())),
            ),
        ]);
        block([("params", Some(params))])
    }

    fn destination_json(name: &str) -> serde_json::Value {
        json!({
            "id": "dest-1",
            "name": name,
            "type": "webhook",
            "config": {"params": {
                "url": "https://example.com/hook",
                "verb": "post",
                "custom_headers": {"X-Env": "prod"}
            }},
            "updated_at": "2021-09-01T10:00:00Z",
            "subscription_count": 2,
            "subscription_names": ["alerts", "audit"]
        })
    }

    #[tokio::test]
    async fn test_create_sends_config() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/instances/guid-1/destinations")
                    .json_body(json!({
                        "name": "hook",
                        "type": "webhook",
                        "config": {"params": {
                            "url": "https://example.com/hook",
                            "verb": "post",
                            "custom_headers": {"X-Env": "prod"}
                        }}
                    }));
                then.status(201).json_body(destination_json("hook"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PATH);
                then.status(200).json_body(destination_json("hook"));
            })
            .await;

        let provider = provider_for(&server);
        let resource = Resource::new(RESOURCE_TYPE, "hook")
            .with_attribute("instance_guid", "guid-1")
            .with_attribute("name", "hook")
            .with_attribute("type", "webhook")
            .with_attribute("config", config_attribute());
        let state = provider.create_resource(resource).await.unwrap();

        create.assert_async().await;
        assert_eq!(state.identifier.as_deref(), Some("guid-1/dest-1"));
        assert_eq!(state.attributes.get("subscription_count"), Some(&Value::Int(2)));
        assert_eq!(
            get_str_list(&state.attributes, "subscription_names"),
            vec!["alerts", "audit"]
        );
        assert!(find_changed_attributes(
            &[("config".to_string(), config_attribute())].into(),
            &state.attributes
        )
        .is_empty());
    }

    #[tokio::test]
    async fn test_update_skips_unchanged() {
        let server = MockServer::start_async().await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH").path(PATH);
                then.status(200).json_body(destination_json("hook"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PATH);
                then.status(200).json_body(destination_json("hook"));
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "hook");
        let current = read(&provider, &id, "guid-1/dest-1").await.unwrap();
        let desired = Resource::new(RESOURCE_TYPE, "hook")
            .with_attribute("instance_guid", "guid-1")
            .with_attribute("name", "hook")
            .with_attribute("type", "webhook")
            .with_attribute("config", config_attribute());

        provider
            .update_resource(id, "guid-1/dest-1", current, desired)
            .await
            .unwrap();
        patch.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_update_renames() {
        let server = MockServer::start_async().await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH").path(PATH).body_contains("\"name\":\"hook-2\"");
                then.status(200).json_body(destination_json("hook-2"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PATH);
                then.status(200).json_body(destination_json("hook"));
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "hook");
        let current = read(&provider, &id, "guid-1/dest-1").await.unwrap();
        let desired = Resource::new(RESOURCE_TYPE, "hook")
            .with_attribute("instance_guid", "guid-1")
            .with_attribute("name", "hook-2")
            .with_attribute("type", "webhook");

        provider
            .update_resource(id, "guid-1/dest-1", current, desired)
            .await
            .unwrap();
        patch.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_and_delete_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(PATH);
                then.status(404);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path(PATH);
                then.status(404);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "hook");
        assert!(!provider.read_resource(&id, Some("guid-1/dest-1")).await.unwrap().exists);
        provider
            .delete_resource(&id, "guid-1/dest-1", &Attributes::new())
            .await
            .unwrap();
    }
}
