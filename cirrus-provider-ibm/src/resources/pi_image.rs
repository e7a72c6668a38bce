//! ibm_pi_image - boot image of a Power Systems workspace
//!
//! An image is either copied from the stock catalog (`pi_image_id`) or
//! imported from a Cloud Object Storage bucket (`pi_image_bucket_name`).
//! Copies are polled until `active`; imports run as a job which is polled
//! until `completed`, after which the image is looked up by name.

use std::time::Duration;

use cirrus_core::identifier::{join_id, split_pair};
use cirrus_core::provider::{ProviderError, ProviderResult};
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::client::{ApiError, CosImageImport, ImageCopy, PowerImage};
use crate::provider::IbmProvider;
use crate::utils::{
    Attributes, Timeouts, api_error, get_str, invalid_identifier, require_str, wait_error,
};

pub const RESOURCE_TYPE: &str = "ibm_pi_image";

const DEFAULT_TIMEOUTS: Timeouts = Timeouts::minutes(60, 60, 60);
const WAIT_DELAY: Duration = Duration::from_secs(20);

const IMAGE_SOURCE: &str = "root-project";
const STATUS_ACTIVE: &str = "active";
const STATUS_QUEUED: &str = "queued";

const JOB_COMPLETED: &str = "completed";
const JOB_PENDING: &[&str] = &["queued", "readyForProcessing", "inProgress", "running"];

pub fn schema() -> ResourceSchema {
    ResourceSchema::new(RESOURCE_TYPE)
        .with_description("Image copied or imported into a Power Systems Virtual Server workspace")
        .attribute(
            AttributeSchema::new("pi_cloud_instance_id", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("pi_image_name", AttributeType::String)
                .required()
                .force_new(),
        )
        .attribute(
            AttributeSchema::new("pi_image_id", AttributeType::String)
                .force_new()
                .with_description("Stock image to copy"),
        )
        .attribute(
            AttributeSchema::new("pi_image_bucket_name", AttributeType::String)
                .force_new()
                .required_with(&["pi_image_bucket_region", "pi_image_bucket_file_name"])
                .with_description("Cloud Object Storage bucket name; bucket-name[/optional/folder]"),
        )
        .attribute(
            AttributeSchema::new("pi_image_bucket_access", types::one_of(&["public", "private"]))
                .force_new()
                .with_default("public"),
        )
        .attribute(
            AttributeSchema::new("pi_image_bucket_region", AttributeType::String)
                .force_new()
                .conflicts_with(&["pi_image_id"])
                .required_with(&["pi_image_bucket_name"]),
        )
        .attribute(
            AttributeSchema::new("pi_image_bucket_file_name", AttributeType::String)
                .force_new()
                .conflicts_with(&["pi_image_id"])
                .required_with(&["pi_image_bucket_name"]),
        )
        .attribute(
            AttributeSchema::new("pi_image_storage_type", AttributeType::String)
                .force_new()
                .required_with(&["pi_image_bucket_name"]),
        )
        .attribute(
            AttributeSchema::new("pi_image_access_key", AttributeType::String)
                .force_new()
                .sensitive()
                .required_with(&["pi_image_secret_key"]),
        )
        .attribute(
            AttributeSchema::new("pi_image_secret_key", AttributeType::String)
                .force_new()
                .sensitive()
                .required_with(&["pi_image_access_key"]),
        )
        .attribute(AttributeSchema::new("image_id", AttributeType::String).computed())
        .exactly_one_of(&["pi_image_id", "pi_image_bucket_name"])
}

fn image_attributes(cloud_instance_id: &str, image: &PowerImage) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert("pi_cloud_instance_id".to_string(), Value::from(cloud_instance_id));
    attributes.insert("image_id".to_string(), Value::from(image.image_id.as_str()));
    attributes
}

pub async fn read(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let (cloud_instance_id, image_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;

    let image = match provider.power.get_image(&cloud_instance_id, &image_id).await {
        Ok(image) => image,
        Err(e) if e.is_not_found() => {
            log::warn!("Image {} not found, removing it from state", image_id);
            return Ok(State::not_found(id.clone()));
        }
        Err(e) => return Err(api_error(id, format!("Error getting image ({})", image_id), e)),
    };

    Ok(State::existing(id.clone(), image_attributes(&cloud_instance_id, &image)).with_identifier(identifier))
}

pub async fn create(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let attrs = &resource.attributes;
    let timeouts = Timeouts::from_attributes(DEFAULT_TIMEOUTS, attrs, id)?;
    let cloud_instance_id = require_str(attrs, "pi_cloud_instance_id", id)?;
    let image_name = require_str(attrs, "pi_image_name", id)?;

    let image = if let Some(source_id) = get_str(attrs, "pi_image_id") {
        copy_image(provider, id, cloud_instance_id, image_name, source_id, timeouts).await?
    } else if get_str(attrs, "pi_image_bucket_name").is_some() {
        import_image(provider, resource, cloud_instance_id, image_name, timeouts).await?
    } else {
        return Err(ProviderError::new(
            "Exactly one of pi_image_id, pi_image_bucket_name must be set",
        )
        .for_resource(id.clone()));
    };

    let identifier = join_id(&[cloud_instance_id, &image.image_id]);
    Ok(State::existing(id.clone(), image_attributes(cloud_instance_id, &image)).with_identifier(identifier))
}

async fn copy_image(
    provider: &IbmProvider,
    id: &ResourceId,
    cloud_instance_id: &str,
    image_name: &str,
    source_id: &str,
    timeouts: Timeouts,
) -> ProviderResult<PowerImage> {
    let body = ImageCopy {
        image_id: source_id.to_string(),
        image_name: image_name.to_string(),
        source: IMAGE_SOURCE.to_string(),
    };
    let created = provider
        .power
        .create_image(cloud_instance_id, &body)
        .await
        .map_err(|e| api_error(id, "Error copying image", e))?;

    log::info!("Waiting for image ({}) to be available", created.image_id);
    let power = &provider.power;
    let image_id = created.image_id.as_str();
    provider
        .state_change(&[STATUS_QUEUED], &[STATUS_ACTIVE], timeouts.create, WAIT_DELAY)
        .wait_for_state(|| async move {
            let image = power.get_image(cloud_instance_id, image_id).await?;
            let status = if image.state == STATUS_ACTIVE {
                STATUS_ACTIVE
            } else {
                STATUS_QUEUED
            };
            Ok::<_, ApiError>((image, status.to_string()))
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for image ({}) to be available", image_id), e))
}

async fn import_image(
    provider: &IbmProvider,
    resource: &Resource,
    cloud_instance_id: &str,
    image_name: &str,
    timeouts: Timeouts,
) -> ProviderResult<PowerImage> {
    let id = &resource.id;
    let attrs = &resource.attributes;

    let body = CosImageImport {
        image_name: image_name.to_string(),
        bucket_name: require_str(attrs, "pi_image_bucket_name", id)?.to_string(),
        bucket_access: get_str(attrs, "pi_image_bucket_access")
            .unwrap_or("public")
            .to_string(),
        image_filename: require_str(attrs, "pi_image_bucket_file_name", id)?.to_string(),
        region: require_str(attrs, "pi_image_bucket_region", id)?.to_string(),
        storage_type: get_str(attrs, "pi_image_storage_type").map(str::to_string),
        access_key: get_str(attrs, "pi_image_access_key").map(str::to_string),
        secret_key: get_str(attrs, "pi_image_secret_key").map(str::to_string),
    };
    let job = provider
        .power
        .import_cos_image(cloud_instance_id, &body)
        .await
        .map_err(|e| api_error(id, "Error importing image from Cloud Object Storage", e))?;

    log::info!("Waiting for image import job ({}) to complete", job.id);
    let power = &provider.power;
    let job_id = job.id.as_str();
    provider
        .state_change(JOB_PENDING, &[JOB_COMPLETED], timeouts.create, WAIT_DELAY)
        .wait_for_state(|| async move {
            let job = power.get_job(cloud_instance_id, job_id).await?;
            if !job.status.message.is_empty() {
                log::debug!("Job {}: {}", job_id, job.status.message);
            }
            let state = job.status.state.clone();
            Ok::<_, ApiError>((job, state))
        })
        .await
        .map_err(|e| wait_error(id, format!("Error waiting for image import job ({})", job_id), e))?;

    // The job does not report the image ID
    provider
        .power
        .get_image(cloud_instance_id, image_name)
        .await
        .map_err(|e| api_error(id, format!("Error getting imported image ({})", image_name), e))
}

pub async fn delete(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    let (cloud_instance_id, image_id) = split_pair(identifier).map_err(|e| invalid_identifier(id, e))?;

    match provider.power.delete_image(&cloud_instance_id, &image_id).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(api_error(id, format!("Error deleting image ({})", image_id), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::provider_for;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_schema_requires_exactly_one_source() {
        let schema = schema();
        let neither: Attributes = [
            ("pi_cloud_instance_id".to_string(), Value::from("cid-1")),
            ("pi_image_name".to_string(), Value::from("aix")),
        ]
        .into();
        assert!(schema.validate(&neither).is_err());

        let mut bucket_only = neither.clone();
        bucket_only.insert("pi_image_bucket_name".to_string(), Value::from("images"));
        let errors = schema.validate(&bucket_only).unwrap_err();
        assert!(errors.iter().any(|e| e.to_string().contains("pi_image_bucket_region")));

        let mut copy = neither.clone();
        copy.insert("pi_image_id".to_string(), Value::from("stock-1"));
        assert!(schema.validate(&copy).is_ok());
    }

    #[tokio::test]
    async fn test_create_copy_waits_for_active() {
        let server = MockServer::start_async().await;
        let copy = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/cloud-instances/cid-1/images")
                    .json_body(json!({"imageID": "stock-1", "imageName": "aix", "source": "root-project"}));
                then.status(201).json_body(json!({"imageID": "img-1", "state": "queued"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/images/img-1");
                then.status(200)
                    .json_body(json!({"imageID": "img-1", "name": "aix", "state": "active"}));
            })
            .await;

        let provider = provider_for(&server);
        let resource = Resource::new(RESOURCE_TYPE, "aix")
            .with_attribute("pi_cloud_instance_id", "cid-1")
            .with_attribute("pi_image_name", "aix")
            .with_attribute("pi_image_id", "stock-1");
        let state = provider.create_resource(resource).await.unwrap();

        copy.assert_async().await;
        assert_eq!(state.identifier.as_deref(), Some("cid-1/img-1"));
        assert_eq!(state.attributes.get("image_id"), Some(&Value::from("img-1")));
    }

    #[tokio::test]
    async fn test_create_import_looks_up_by_name() {
        let server = MockServer::start_async().await;
        let import = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/cloud-instances/cid-1/cos-images")
                    .json_body(json!({
                        "imageName": "rhel",
                        "bucketName": "images",
                        "bucketAccess": "public",
                        "imageFilename": "rhel.ova.gz",
                        "region": "us-south"
                    }));
                then.status(202).json_body(json!({"id": "job-1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/jobs/job-1");
                then.status(200)
                    .json_body(json!({"id": "job-1", "status": {"state": "completed"}}));
            })
            .await;
        let lookup = server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/images/rhel");
                then.status(200)
                    .json_body(json!({"imageID": "img-9", "name": "rhel", "state": "active"}));
            })
            .await;

        let provider = provider_for(&server);
        let resource = Resource::new(RESOURCE_TYPE, "rhel")
            .with_attribute("pi_cloud_instance_id", "cid-1")
            .with_attribute("pi_image_name", "rhel")
            .with_attribute("pi_image_bucket_name", "images")
            .with_attribute("pi_image_bucket_region", "us-south")
            .with_attribute("pi_image_bucket_file_name", "rhel.ova.gz");
        let state = provider.create_resource(resource).await.unwrap();

        import.assert_async().await;
        lookup.assert_async().await;
        assert_eq!(state.identifier.as_deref(), Some("cid-1/img-9"));
    }

    #[tokio::test]
    async fn test_create_import_job_failed() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/cloud-instances/cid-1/cos-images");
                then.status(202).json_body(json!({"id": "job-1"}));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1/cloud-instances/cid-1/jobs/job-1");
                then.status(200).json_body(
                    json!({"id": "job-1", "status": {"state": "failed", "message": "bad file"}}),
                );
            })
            .await;

        let provider = provider_for(&server);
        let resource = Resource::new(RESOURCE_TYPE, "rhel")
            .with_attribute("pi_cloud_instance_id", "cid-1")
            .with_attribute("pi_image_name", "rhel")
            .with_attribute("pi_image_bucket_name", "images")
            .with_attribute("pi_image_bucket_region", "us-south")
            .with_attribute("pi_image_bucket_file_name", "rhel.ova.gz");
        let err = provider.create_resource(resource).await.unwrap_err();
        assert!(err.message.contains("unexpected state 'failed'"));
    }

    #[tokio::test]
    async fn test_delete_ignores_missing_image() {
        let server = MockServer::start_async().await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/v1/cloud-instances/cid-1/images/img-1");
                then.status(404);
            })
            .await;

        let provider = provider_for(&server);
        let id = ResourceId::new(RESOURCE_TYPE, "aix");
        provider
            .delete_resource(&id, "cid-1/img-1", &Attributes::new())
            .await
            .unwrap();
        delete.assert_async().await;
    }
}
