//! ibm_is_volume - VPC block storage volume

use std::time::Duration;

use cirrus_core::differ::find_changed_attributes;
use cirrus_core::provider::{ProviderError, ProviderResult};
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::client::{ApiError, Reference, Volume, VolumePatch, VolumePrototype};
use crate::provider::IbmProvider;
use crate::utils::{
    Attributes, Timeouts, api_error, block, get_bool, get_int, get_str, keep_inputs, require_str,
    set_opt, wait_error,
};

pub const RESOURCE_TYPE: &str = "ibm_is_volume";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(10, 10, 10);
const WAIT_DELAY: Duration = Duration::from_secs(10);

const NAME_PATTERN: &str = r"^([a-z]|[a-z][-a-z0-9]*[a-z0-9])$";
const PROFILES: &[&str] = &["general-purpose", "5iops-tier", "10iops-tier", "custom"];
const DEFAULT_CAPACITY: i64 = 100;

/// Accepted by the API but never returned on read
const WRITE_ONLY: &[&str] = &["delete_all_snapshots"];

const STATUS_AVAILABLE: &str = "available";
const STATUS_FAILED: &str = "failed";
const STATUS_PROVISIONING: &str = "provisioning";
const STATUS_DELETING: &str = "deleting";
const STATUS_DONE: &str = "done";

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Block storage volume in a VPC zone")
        .attribute(
            AttributeSchema::new("name", types::regex_len(NAME_PATTERN, 1, 63))
                .required()
                .with_description("Volume name"),
        )
        .attribute(
            AttributeSchema::new("profile", types::one_of(PROFILES))
                .required()
                .with_description("Volume profile"),
        )
        .attribute(
            AttributeSchema::new("zone", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("encryption_key", AttributeType::String)
                .force_new()
                .with_description("CRN of the Key Protect root key"),
        )
        .attribute(
            AttributeSchema::new("capacity", types::int_between(10, 16000))
                .with_default(DEFAULT_CAPACITY)
                .with_description("Capacity in GB"),
        )
        .attribute(
            AttributeSchema::new("resource_group", AttributeType::String)
                .optional_computed()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("iops", types::int_between(100, 48000))
                .optional_computed()
                .with_description("Total IOPS for a custom profile"),
        )
        .attribute(
            AttributeSchema::new("delete_all_snapshots", AttributeType::Bool)
                .with_description("Delete all snapshots created from this volume"),
        )
        .attribute(AttributeSchema::new("encryption_type", AttributeType::String).computed())
        .attribute(AttributeSchema::new("bandwidth", AttributeType::Int).computed())
        .attribute(AttributeSchema::new("crn", AttributeType::String).computed())
        .attribute(AttributeSchema::new("status", AttributeType::String).computed())
        .attribute(
            AttributeSchema::new(
                "status_reasons",
                AttributeType::List(Box::new(AttributeType::Map(Box::new(
                    AttributeType::String,
                )))),
            )
            .computed(),
        )
        .attribute(AttributeSchema::new("source_snapshot", AttributeType::String).computed())
        .attribute(AttributeSchema::new("resource_group_name", AttributeType::String).computed())
}

fn volume_attributes(volume: &Volume) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("name".to_string(), Value::from(volume.name.as_str()));
    attributes.insert("status".to_string(), Value::from(volume.status.as_str()));
    set_opt(&mut attributes, "crn", volume.crn.clone());
    set_opt(&mut attributes, "capacity", volume.capacity);
    set_opt(&mut attributes, "iops", volume.iops);
    set_opt(&mut attributes, "bandwidth", volume.bandwidth);
    set_opt(&mut attributes, "encryption_type", volume.encryption.clone());
    set_opt(
        &mut attributes,
        "profile",
        volume.profile.as_ref().and_then(|p| p.name.clone()),
    );
    set_opt(
        &mut attributes,
        "zone",
        volume.zone.as_ref().and_then(|z| z.name.clone()),
    );
    set_opt(
        &mut attributes,
        "encryption_key",
        volume.encryption_key.as_ref().and_then(|k| k.crn.clone()),
    );
    set_opt(
        &mut attributes,
        "source_snapshot",
        volume.source_snapshot.as_ref().and_then(|s| s.id.clone()),
    );
    if let Some(group) = &volume.resource_group {
        set_opt(&mut attributes, "resource_group", group.id.clone());
        set_opt(&mut attributes, "resource_group_name", group.name.clone());
    }

    let reasons = volume
        .status_reasons
        .iter()
        .map(|r| {
            block([
                ("code", Some(Value::from(r.code.as_str()))),
                ("message", Some(Value::from(r.message.as_str()))),
            ])
        })
        .collect();
    attributes.insert("status_reasons".to_string(), Value::List(reasons));

    attributes
}

pub async fn read(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    match provider.vpc.get_volume(identifier).await {
        Ok(volume) => Ok(State::existing(id.clone(), volume_attributes(&volume)).with_identifier(identifier)),
        Err(e) if e.is_not_found() => {
            log::warn!("Volume {} not found, removing it from state", identifier);
            Ok(State::not_found(id.clone()))
        }
        Err(e) => Err(api_error(id, format!("Error getting Volume ({})", identifier), e)),
    }
}

pub async fn create(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let timeouts = Timeouts::from_attributes(DEFAULT_TIMEOUTS, attrs, id)?;

    let prototype = VolumePrototype {
        name: require_str(attrs, "name", id)?.to_string(),
        capacity: get_int(attrs, "capacity").unwrap_or(DEFAULT_CAPACITY),
        zone: Reference::by_name(require_str(attrs, "zone", id)?),
        profile: Reference::by_name(require_str(attrs, "profile", id)?),
        encryption_key: get_str(attrs, "encryption_key").map(Reference::by_crn),
        resource_group: get_str(attrs, "resource_group").map(Reference::by_id),
        iops: get_int(attrs, "iops"),
    };

    let volume = provider
        .vpc
        .create_volume(&prototype)
        .await
        .map_err(|e| api_error(id, "Error creating Volume", e))?;
    log::info!("Volume {} created", volume.id);

    let volume = wait_for_available(provider, id, &volume.id, timeouts.create).await?;

    let mut attributes = volume_attributes(&volume);
    keep_inputs(&mut attributes, attrs, WRITE_ONLY);
    Ok(State::existing(id.clone(), attributes).with_identifier(volume.id))
}

pub async fn update(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    let attrs = &to.attributes;
    let timeouts = Timeouts::from_attributes(DEFAULT_TIMEOUTS, attrs, id)?;
    let changed = find_changed_attributes(attrs, &from.attributes);
    let has_change = |name: &str| changed.iter().any(|c| c == name);

    if get_bool(attrs, "delete_all_snapshots") == Some(true) {
        provider
            .vpc
            .delete_snapshots_for_volume(identifier)
            .await
            .map_err(|e| api_error(id, format!("Error deleting snapshots from volume {}", identifier), e))?;
    }

    if has_change("name") {
        let patch = VolumePatch {
            name: Some(require_str(attrs, "name", id)?.to_string()),
            ..Default::default()
        };
        patch_volume(provider, id, identifier, &patch, timeouts.update).await?;
    }

    if has_change("profile") || has_change("iops") {
        let volume = get_volume(provider, id, identifier).await?;
        let Some(attachment) = volume.volume_attachments.first() else {
            return Err(ProviderError::new(format!(
                "Error updating Volume profile/iops because the specified volume {} is not attached to a virtual server instance",
                identifier
            ))
            .for_resource(id.clone()));
        };
        ensure_instance_running(provider, id, &attachment.instance.id, timeouts.create).await?;

        let mut patch = VolumePatch {
            profile: Some(Reference::by_name(require_str(attrs, "profile", id)?)),
            ..Default::default()
        };
        // A profile change lets the service pick the IOPS; otherwise send the new value
        if !has_change("profile") {
            patch.iops = get_int(attrs, "iops");
        }
        patch_volume(provider, id, identifier, &patch, timeouts.update).await?;
    }

    if has_change("capacity") {
        let volume = get_volume(provider, id, identifier).await?;
        let Some(attachment) = volume.volume_attachments.first() else {
            return Err(ProviderError::new(format!(
                "Error volume capacity can't be updated since volume {} is not attached to any instance for VolumePatch",
                identifier
            ))
            .for_resource(id.clone()));
        };
        ensure_instance_running(provider, id, &attachment.instance.id, timeouts.create).await?;

        let patch = VolumePatch {
            capacity: get_int(attrs, "capacity"),
            ..Default::default()
        };
        patch_volume(provider, id, identifier, &patch, timeouts.update).await?;
    }

    let volume = get_volume(provider, id, identifier).await?;
    let mut attributes = volume_attributes(&volume);
    keep_inputs(&mut attributes, attrs, WRITE_ONLY);
    Ok(State::existing(id.clone(), attributes).with_identifier(identifier))
}

pub async fn delete(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    attributes: &Attributes,
) -> ProviderResult<()> {
    let timeouts = Timeouts::from_attributes(DEFAULT_TIMEOUTS, attributes, id)?;

    let volume = match provider.vpc.get_volume(identifier).await {
        Ok(volume) => volume,
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(api_error(id, format!("Error getting Volume ({})", identifier), e)),
    };

    for attachment in &volume.volume_attachments {
        let instance_id = attachment.instance.id.as_str();
        provider
            .vpc
            .delete_instance_volume_attachment(instance_id, &attachment.id)
            .await
            .map_err(|e| {
                api_error(
                    id,
                    format!(
                        "Error while removing volume attachment {} for instance {}",
                        attachment.id, instance_id
                    ),
                    e,
                )
            })?;
        wait_for_detached(provider, id, instance_id, &attachment.id, timeouts.delete).await?;
    }

    provider
        .vpc
        .delete_volume(identifier)
        .await
        .map_err(|e| api_error(id, "Error deleting Volume", e))?;

    wait_for_deleted(provider, id, identifier, timeouts.delete).await
}

// =============================================================================
// Helpers
// =============================================================================

async fn get_volume(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<Volume> {
    provider
        .vpc
        .get_volume(identifier)
        .await
        .map_err(|e| api_error(id, format!("Error getting Volume ({})", identifier), e))
}

async fn patch_volume(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    patch: &VolumePatch,
    timeout: Duration,
) -> ProviderResult<()> {
    provider
        .vpc
        .update_volume(identifier, patch)
        .await
        .map_err(|e| api_error(id, "Error updating vpc volume", e))?;
    wait_for_available(provider, id, identifier, timeout).await?;
    Ok(())
}

fn provisioning_status(volume: &Volume) -> String {
    match volume.status.as_str() {
        STATUS_AVAILABLE | STATUS_FAILED => volume.status.clone(),
        _ => STATUS_PROVISIONING.to_string(),
    }
}

async fn wait_for_available(
    provider: &IbmProvider,
    id: &ResourceId,
    volume_id: &str,
    timeout: Duration,
) -> ProviderResult<Volume> {
    log::info!("Waiting for Volume ({}) to be available", volume_id);
    let vpc = &provider.vpc;
    provider
        .state_change(&[STATUS_PROVISIONING], &[STATUS_AVAILABLE], timeout, WAIT_DELAY)
        .wait_for_state(|| async move {
            let volume = vpc.get_volume(volume_id).await?;
            let status = provisioning_status(&volume);
            Ok::<_, ApiError>((volume, status))
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for Volume ({}) to be available", volume_id), e))
}

async fn wait_for_deleted(
    provider: &IbmProvider,
    id: &ResourceId,
    volume_id: &str,
    timeout: Duration,
) -> ProviderResult<()> {
    log::info!("Waiting for Volume ({}) to be deleted", volume_id);
    let vpc = &provider.vpc;
    provider
        .state_change(&[STATUS_DELETING], &[STATUS_DONE], timeout, WAIT_DELAY)
        .wait_for_state(|| async move {
            match vpc.get_volume(volume_id).await {
                Ok(_) => Ok(((), STATUS_DELETING.to_string())),
                Err(e) if e.is_not_found() => Ok(((), STATUS_DONE.to_string())),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for Volume ({}) to be deleted", volume_id), e))
}

async fn wait_for_detached(
    provider: &IbmProvider,
    id: &ResourceId,
    instance_id: &str,
    attachment_id: &str,
    timeout: Duration,
) -> ProviderResult<()> {
    log::info!("Waiting for volume attachment ({}) to be detached", attachment_id);
    let vpc = &provider.vpc;
    provider
        .state_change(&[STATUS_DELETING], &[STATUS_DONE], timeout, WAIT_DELAY)
        .wait_for_state(|| async move {
            match vpc.get_instance_volume_attachment(instance_id, attachment_id).await {
                Ok(_) => Ok(((), STATUS_DELETING.to_string())),
                Err(e) if e.is_not_found() => Ok(((), STATUS_DONE.to_string())),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(|e| {
            wait_error(
                id,
                format!("Error waiting for volume attachment ({}) to be detached", attachment_id),
                e,
            )
        })
}

/// Start the instance a volume is attached to unless it is already running
async fn ensure_instance_running(
    provider: &IbmProvider,
    id: &ResourceId,
    instance_id: &str,
    timeout: Duration,
) -> ProviderResult<()> {
    let instance = provider
        .vpc
        .get_instance(instance_id)
        .await
        .map_err(|e| api_error(id, format!("Error retrieving Instance ({})", instance_id), e))?;
    if instance.status == "running" {
        return Ok(());
    }

    log::info!("Starting Instance ({}) to update its attached volume", instance_id);
    provider
        .vpc
        .create_instance_action(instance_id, "start")
        .await
        .map_err(|e| api_error(id, format!("Error starting Instance ({})", instance_id), e))?;

    let vpc = &provider.vpc;
    provider
        .state_change(
            &["pending", "starting", "stopped", "stopping", "restarting"],
            &["running"],
            timeout,
            WAIT_DELAY,
        )
        .wait_for_state(|| async move {
            let instance = vpc.get_instance(instance_id).await?;
            let status = instance.status.clone();
            Ok::<_, ApiError>((instance, status))
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for Instance ({}) to be running", instance_id), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::provider_for;
    use httpmock::prelude::*;
    use serde_json::json;

    fn volume_json(status: &str) -> serde_json::Value {
        json!({
            "id": "r006-vol",
            "name": "data",
            "crn": "crn:v1:bluemix:public:is:us-south-1:a/acct::volume:r006-vol",
            "status": status,
            "status_reasons": [],
            "capacity": 100,
            "iops": 3000,
            "bandwidth": 393,
            "encryption": "provider_managed",
            "profile": {"name": "general-purpose"},
            "zone": {"name": "us-south-1"},
            "resource_group": {"id": "rg-1", "name": "default"},
            "volume_attachments": []
        })
    }

    fn desired() -> Resource {
        Resource::new(RESOURCE_TYPE, "data")
            .with_attribute("name", "data")
            .with_attribute("profile", "general-purpose")
            .with_attribute("zone", "us-south-1")
            .with_attribute("capacity", Value::Int(100))
    }

    #[test]
    fn test_schema_validation() {
        let schema = schema();
        let mut attrs = desired().attributes;
        assert!(schema.validate(&attrs).is_ok());

        attrs.insert("name".to_string(), Value::from("Data_Volume"));
        attrs.insert("capacity".to_string(), Value::from(5));
        let errors = schema.validate(&attrs).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn test_create_waits_for_available() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method(POST).path("/volumes").json_body(json!({
                    "name": "data",
                    "capacity": 100,
                    "zone": {"name": "us-south-1"},
                    "profile": {"name": "general-purpose"}
                }));
                then.status(201).json_body(volume_json("pending"));
            })
            .await;
        let get = server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(volume_json("available"));
            })
            .await;

        let provider = provider_for(&server);
        let state = create_resource(&provider, desired()).await;

        create.assert_async().await;
        get.assert_hits_async(1).await;
        assert_eq!(state.identifier.as_deref(), Some("r006-vol"));
        assert_eq!(state.attributes.get("status"), Some(&Value::from("available")));
        assert_eq!(state.attributes.get("resource_group_name"), Some(&Value::from("default")));
    }

    async fn create_resource(provider: &IbmProvider, resource: Resource) -> State {
        provider.create_resource(resource).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_fails_on_failed_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/volumes");
                then.status(201).json_body(volume_json("pending"));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(volume_json("failed"));
            })
            .await;

        let provider = provider_for(&server);
        let err = provider.create_resource(desired()).await.unwrap_err();
        assert!(err.message.contains("unexpected state 'failed'"));
    }

    #[tokio::test]
    async fn test_read_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/gone");
                then.status(404).json_body(json!({"errors": [{"code": "not_found"}]}));
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "data");
        let state = provider.read_resource(&id, Some("gone")).await.unwrap();
        assert!(!state.exists);
    }

    #[tokio::test]
    async fn test_read_error_has_context() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(500).body("internal");
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "data");
        let err = provider.read_resource(&id, Some("r006-vol")).await.unwrap_err();
        assert!(err.message.starts_with("Error getting Volume (r006-vol)"));
        assert_eq!(err.resource_id, Some(id));
    }

    #[tokio::test]
    async fn test_update_profile_requires_attachment() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(volume_json("available"));
            })
            .await;

        let provider = provider_for(&server);
        let current = State::existing(
            ResourceId::new(RESOURCE_TYPE, "data"),
            volume_attributes(&serde_json::from_value(volume_json("available")).unwrap()),
        )
        .with_identifier("r006-vol");
        let to = desired().with_attribute("profile", "10iops-tier");

        let err = provider
            .update_resource(to.id.clone(), "r006-vol", current, to)
            .await
            .unwrap_err();
        assert!(err.message.contains("is not attached to a virtual server instance"));
    }

    #[tokio::test]
    async fn test_update_capacity_patches_attached_volume() {
        let server = MockServer::start_async().await;
        let mut attached = volume_json("available");
        attached["volume_attachments"] = json!([{"id": "att-1", "instance": {"id": "ins-1"}}]);

        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(attached);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/instances/ins-1");
                then.status(200).json_body(json!({"id": "ins-1", "status": "running"}));
            })
            .await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH")
                    .path("/volumes/r006-vol")
                    .json_body(json!({"capacity": 200}));
                then.status(200).json_body(volume_json("updating"));
            })
            .await;

        let provider = provider_for(&server);
        let current = State::existing(
            ResourceId::new(RESOURCE_TYPE, "data"),
            volume_attributes(&serde_json::from_value(volume_json("available")).unwrap()),
        )
        .with_identifier("r006-vol");
        let to = desired().with_attribute("capacity", Value::Int(200));

        provider
            .update_resource(to.id.clone(), "r006-vol", current, to)
            .await
            .unwrap();
        patch.assert_async().await;
    }

    fn attached_volume_json(profile: &str) -> serde_json::Value {
        let mut volume = volume_json("available");
        volume["profile"] = json!({"name": profile});
        volume["volume_attachments"] = json!([{"id": "att-1", "instance": {"id": "ins-1"}}]);
        volume
    }

    fn current_state(volume: serde_json::Value) -> State {
        State::existing(
            ResourceId::new(RESOURCE_TYPE, "data"),
            volume_attributes(&serde_json::from_value(volume).unwrap()),
        )
        .with_identifier("r006-vol")
    }

    async fn mock_attached_volume(server: &MockServer, profile: &str, instance_status: &str) {
        let volume = attached_volume_json(profile);
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(volume);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/instances/ins-1");
                then.status(200)
                    .json_body(json!({"id": "ins-1", "status": instance_status}));
            })
            .await;
    }

    #[tokio::test]
    async fn test_update_capacity_starts_stopped_instance() {
        let server = MockServer::start_async().await;
        mock_attached_volume(&server, "general-purpose", "stopped").await;
        let start = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/instances/ins-1/actions")
                    .json_body(json!({"type": "start"}));
                then.status(201).json_body(json!({"type": "start", "status": "pending"}));
            })
            .await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH").path("/volumes/r006-vol");
                then.status(200).json_body(volume_json("updating"));
            })
            .await;

        let provider = provider_for(&server);
        let to = desired()
            .with_attribute("capacity", Value::Int(200))
            .with_attribute(
                "timeouts",
                Value::Map([("create".to_string(), Value::from("30ms"))].into()),
            );

        // The instance never leaves `stopped`, so the running wait times out
        let err = provider
            .update_resource(to.id.clone(), "r006-vol", current_state(volume_json("available")), to)
            .await
            .unwrap_err();

        start.assert_hits_async(1).await;
        patch.assert_hits_async(0).await;
        assert!(err.message.starts_with("Error waiting for Instance (ins-1) to be running"));
        assert!(err.message.contains("last state: 'stopped'"));
    }

    #[tokio::test]
    async fn test_update_profile_lets_service_pick_iops() {
        let server = MockServer::start_async().await;
        mock_attached_volume(&server, "general-purpose", "running").await;
        let start = server
            .mock_async(|when, then| {
                when.method(POST).path("/instances/ins-1/actions");
                then.status(201);
            })
            .await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH")
                    .path("/volumes/r006-vol")
                    .json_body(json!({"profile": {"name": "10iops-tier"}}));
                then.status(200).json_body(volume_json("updating"));
            })
            .await;

        let provider = provider_for(&server);
        let to = desired()
            .with_attribute("profile", "10iops-tier")
            .with_attribute("iops", Value::Int(3000));

        provider
            .update_resource(to.id.clone(), "r006-vol", current_state(volume_json("available")), to)
            .await
            .unwrap();

        patch.assert_async().await;
        start.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_update_iops_sends_profile_and_iops() {
        let server = MockServer::start_async().await;
        mock_attached_volume(&server, "custom", "running").await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH")
                    .path("/volumes/r006-vol")
                    .json_body(json!({"profile": {"name": "custom"}, "iops": 5000}));
                then.status(200).json_body(volume_json("updating"));
            })
            .await;

        let provider = provider_for(&server);
        let to = desired()
            .with_attribute("profile", "custom")
            .with_attribute("iops", Value::Int(5000));

        provider
            .update_resource(to.id.clone(), "r006-vol", current_state(attached_volume_json("custom")), to)
            .await
            .unwrap();

        patch.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_deletes_snapshots_before_patching() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(volume_json("available"));
            })
            .await;
        let snapshots = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/snapshots")
                    .query_param("source_volume.id", "r006-vol");
                then.status(204);
            })
            .await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH")
                    .path("/volumes/r006-vol")
                    .json_body(json!({"name": "data-2"}));
                then.status(200).json_body(volume_json("updating"));
            })
            .await;

        let provider = provider_for(&server);
        let to = desired()
            .with_attribute("name", "data-2")
            .with_attribute("delete_all_snapshots", true);

        let state = provider
            .update_resource(to.id.clone(), "r006-vol", current_state(volume_json("available")), to)
            .await
            .unwrap();

        snapshots.assert_hits_async(1).await;
        patch.assert_hits_async(1).await;
        assert_eq!(state.attributes.get("delete_all_snapshots"), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_update_stops_when_snapshot_delete_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/snapshots");
                then.status(500).body("internal");
            })
            .await;
        let patch = server
            .mock_async(|when, then| {
                when.method("PATCH").path("/volumes/r006-vol");
                then.status(200).json_body(volume_json("updating"));
            })
            .await;

        let provider = provider_for(&server);
        let to = desired()
            .with_attribute("name", "data-2")
            .with_attribute("delete_all_snapshots", true);

        let err = provider
            .update_resource(to.id.clone(), "r006-vol", current_state(volume_json("available")), to)
            .await
            .unwrap_err();

        patch.assert_hits_async(0).await;
        assert!(err.message.starts_with("Error deleting snapshots from volume r006-vol"));
    }

    #[tokio::test]
    async fn test_delete_already_gone() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(404);
            })
            .await;
        let delete_volume = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/volumes/r006-vol");
                then.status(202);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "data");
        provider
            .delete_resource(&id, "r006-vol", &Attributes::new())
            .await
            .unwrap();
        delete_volume.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn test_delete_detaches_before_deleting() {
        let server = MockServer::start_async().await;
        let mut attached = volume_json("available");
        attached["volume_attachments"] = json!([{"id": "att-1", "instance": {"id": "ins-1"}}]);

        server
            .mock_async(|when, then| {
                when.method(GET).path("/volumes/r006-vol");
                then.status(200).json_body(attached);
            })
            .await;
        let detach = server
            .mock_async(|when, then| {
                when.method(DELETE)
                    .path("/instances/ins-1/volume_attachments/att-1");
                then.status(202);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/instances/ins-1/volume_attachments/att-1");
                then.status(404);
            })
            .await;
        let delete_volume = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/volumes/r006-vol");
                then.status(202);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "data");
        let attributes: Attributes = [(
            "timeouts".to_string(),
            Value::Map([("delete".to_string(), Value::from("50ms"))].into()),
        )]
        .into();

        // The mock keeps returning the volume, so the deletion wait times out
        let err = provider
            .delete_resource(&id, "r006-vol", &attributes)
            .await
            .unwrap_err();

        detach.assert_hits_async(1).await;
        delete_volume.assert_hits_async(1).await;
        assert!(err.message.contains("to be deleted"));
        assert!(err.message.contains("last state: 'deleting'"));
    }
}
