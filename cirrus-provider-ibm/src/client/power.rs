//! Power Systems Virtual Server API: DHCP servers, images, jobs and volumes
//!
//! Every call is scoped to a cloud instance (workspace) and carries the
//! workspace CRN in a `CRN` header.

use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient, endpoint};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DhcpServerCreate {
    #[serde(rename = "cloudConnectionID", skip_serializing_if = "Option::is_none")]
    pub cloud_connection_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DhcpServerReference {
    pub id: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DhcpNetwork {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DhcpLease {
    #[serde(rename = "instanceIP")]
    pub instance_ip: String,
    #[serde(rename = "instanceMacAddress")]
    pub instance_mac: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DhcpServer {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub network: Option<DhcpNetwork>,
    #[serde(default)]
    pub leases: Vec<DhcpLease>,
}

/// Copy of a stock image into the workspace
#[derive(Debug, Clone, Serialize)]
pub struct ImageCopy {
    #[serde(rename = "imageID")]
    pub image_id: String,
    #[serde(rename = "imageName")]
    pub image_name: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowerImage {
    #[serde(rename = "imageID")]
    pub image_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(rename = "storageType", default)]
    pub storage_type: Option<String>,
}

/// Import of an image file from a Cloud Object Storage bucket
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CosImageImport {
    pub image_name: String,
    pub bucket_name: String,
    pub bucket_access: String,
    pub image_filename: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobReference {
    pub id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobStatus {
    /// `queued`, `readyForProcessing`, `inProgress`, `running`, `completed`, `failed`
    pub state: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerVolume {
    #[serde(rename = "volumeID")]
    pub volume_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    /// Size in GB
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub shareable: Option<bool>,
    #[serde(default)]
    pub bootable: Option<bool>,
    #[serde(default)]
    pub disk_type: Option<String>,
    #[serde(default)]
    pub volume_pool: Option<String>,
    #[serde(default)]
    pub wwn: Option<String>,
}

#[derive(Clone)]
pub struct PowerClient {
    http: HttpClient,
    base: String,
    zone: String,
    account_id: Option<String>,
}

impl PowerClient {
    pub fn new(
        http: HttpClient,
        base: impl Into<String>,
        zone: impl Into<String>,
        account_id: Option<String>,
    ) -> Self {
        Self {
            http,
            base: base.into(),
            zone: zone.into(),
            account_id,
        }
    }

    pub fn crn(&self, cloud_instance_id: &str) -> String {
        format!(
            "crn:v1:bluemix:public:power-iaas:{}:a/{}:{}::",
            self.zone,
            self.account_id.as_deref().unwrap_or(""),
            cloud_instance_id
        )
    }

    fn request(&self, method: Method, cloud_instance_id: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, &endpoint(&self.base, path))
            .header("CRN", self.crn(cloud_instance_id))
    }

    pub async fn create_dhcp(
        &self,
        cloud_instance_id: &str,
        body: &DhcpServerCreate,
    ) -> Result<DhcpServerReference, ApiError> {
        let path = format!("/v1/cloud-instances/{}/services/dhcp", cloud_instance_id);
        let request = self.request(Method::POST, cloud_instance_id, &path).json(body);
        self.http.send_json(request).await
    }

    pub async fn get_dhcp(&self, cloud_instance_id: &str, dhcp_id: &str) -> Result<DhcpServer, ApiError> {
        let path = format!(
            "/v1/cloud-instances/{}/services/dhcp/{}",
            cloud_instance_id, dhcp_id
        );
        self.http
            .send_json(self.request(Method::GET, cloud_instance_id, &path))
            .await
    }

    pub async fn delete_dhcp(&self, cloud_instance_id: &str, dhcp_id: &str) -> Result<(), ApiError> {
        let path = format!(
            "/v1/cloud-instances/{}/services/dhcp/{}",
            cloud_instance_id, dhcp_id
        );
        self.http
            .send_empty(self.request(Method::DELETE, cloud_instance_id, &path))
            .await
    }

    pub async fn create_image(&self, cloud_instance_id: &str, body: &ImageCopy) -> Result<PowerImage, ApiError> {
        let path = format!("/v1/cloud-instances/{}/images", cloud_instance_id);
        let request = self.request(Method::POST, cloud_instance_id, &path).json(body);
        self.http.send_json(request).await
    }

    /// Look up an image by ID or name
    pub async fn get_image(&self, cloud_instance_id: &str, image: &str) -> Result<PowerImage, ApiError> {
        let path = format!("/v1/cloud-instances/{}/images/{}", cloud_instance_id, image);
        self.http
            .send_json(self.request(Method::GET, cloud_instance_id, &path))
            .await
    }

    pub async fn delete_image(&self, cloud_instance_id: &str, image_id: &str) -> Result<(), ApiError> {
        let path = format!("/v1/cloud-instances/{}/images/{}", cloud_instance_id, image_id);
        self.http
            .send_empty(self.request(Method::DELETE, cloud_instance_id, &path))
            .await
    }

    /// Start an asynchronous import; progress is tracked through the returned job
    pub async fn import_cos_image(
        &self,
        cloud_instance_id: &str,
        body: &CosImageImport,
    ) -> Result<JobReference, ApiError> {
        let path = format!("/v2/cloud-instances/{}/cos-images", cloud_instance_id);
        let request = self.request(Method::POST, cloud_instance_id, &path).json(body);
        self.http.send_json(request).await
    }

    pub async fn get_job(&self, cloud_instance_id: &str, job_id: &str) -> Result<Job, ApiError> {
        let path = format!("/v1/cloud-instances/{}/jobs/{}", cloud_instance_id, job_id);
        self.http
            .send_json(self.request(Method::GET, cloud_instance_id, &path))
            .await
    }

    /// Look up a volume by ID or name
    pub async fn get_volume(&self, cloud_instance_id: &str, volume: &str) -> Result<PowerVolume, ApiError> {
        let path = format!("/v2/cloud-instances/{}/volumes/{}", cloud_instance_id, volume);
        self.http
            .send_json(self.request(Method::GET, cloud_instance_id, &path))
            .await
    }
}
