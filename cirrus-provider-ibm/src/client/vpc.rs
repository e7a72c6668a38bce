//! VPC Infrastructure API: block storage volumes and the instances they attach to

use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient, Reference, endpoint};

pub const VPC_API_VERSION: &str = "2021-06-08";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReason {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceReference {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeAttachmentReference {
    pub id: String,
    pub instance: InstanceReference,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Volume {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub crn: Option<String>,
    pub status: String,
    #[serde(default)]
    pub status_reasons: Vec<StatusReason>,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub iops: Option<i64>,
    #[serde(default)]
    pub bandwidth: Option<i64>,
    /// `provider_managed` or `user_managed`
    #[serde(default)]
    pub encryption: Option<String>,
    #[serde(default)]
    pub encryption_key: Option<Reference>,
    #[serde(default)]
    pub profile: Option<Reference>,
    #[serde(default)]
    pub zone: Option<Reference>,
    #[serde(default)]
    pub resource_group: Option<Reference>,
    #[serde(default)]
    pub source_snapshot: Option<Reference>,
    #[serde(default)]
    pub volume_attachments: Vec<VolumeAttachmentReference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumePrototype {
    pub name: String,
    pub capacity: i64,
    pub zone: Reference,
    pub profile: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
}

/// Merge patch: only the fields that are set are changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolumePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iops: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Reference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeAttachment {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Clone)]
pub struct VpcClient {
    http: HttpClient,
    base: String,
}

impl VpcClient {
    pub fn new(http: HttpClient, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, &endpoint(&self.base, path))
            .query(&[("version", VPC_API_VERSION), ("generation", "2")])
    }

    pub async fn create_volume(&self, prototype: &VolumePrototype) -> Result<Volume, ApiError> {
        self.http
            .send_json(self.request(Method::POST, "/volumes").json(prototype))
            .await
    }

    pub async fn get_volume(&self, id: &str) -> Result<Volume, ApiError> {
        self.http
            .send_json(self.request(Method::GET, &format!("/volumes/{}", id)))
            .await
    }

    pub async fn update_volume(&self, id: &str, patch: &VolumePatch) -> Result<Volume, ApiError> {
        // json() keeps a content type that is already set
        let request = self
            .request(Method::PATCH, &format!("/volumes/{}", id))
            .header(reqwest::header::CONTENT_TYPE, "application/merge-patch+json")
            .json(patch);
        self.http.send_json(request).await
    }

    pub async fn delete_volume(&self, id: &str) -> Result<(), ApiError> {
        self.http
            .send_empty(self.request(Method::DELETE, &format!("/volumes/{}", id)))
            .await
    }

    /// Delete every snapshot taken from a volume
    pub async fn delete_snapshots_for_volume(&self, volume_id: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::DELETE, "/snapshots")
            .query(&[("source_volume.id", volume_id)]);
        self.http.send_empty(request).await
    }

    pub async fn get_instance(&self, id: &str) -> Result<Instance, ApiError> {
        self.http
            .send_json(self.request(Method::GET, &format!("/instances/{}", id)))
            .await
    }

    /// Request an instance action (`start`, `stop`, `reboot`)
    pub async fn create_instance_action(&self, instance_id: &str, action: &str) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &format!("/instances/{}/actions", instance_id))
            .json(&serde_json::json!({ "type": action }));
        self.http.send_empty(request).await
    }

    pub async fn get_instance_volume_attachment(
        &self,
        instance_id: &str,
        attachment_id: &str,
    ) -> Result<VolumeAttachment, ApiError> {
        let path = format!("/instances/{}/volume_attachments/{}", instance_id, attachment_id);
        self.http.send_json(self.request(Method::GET, &path)).await
    }

    pub async fn delete_instance_volume_attachment(
        &self,
        instance_id: &str,
        attachment_id: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/instances/{}/volume_attachments/{}", instance_id, attachment_id);
        self.http.send_empty(self.request(Method::DELETE, &path)).await
    }
}
