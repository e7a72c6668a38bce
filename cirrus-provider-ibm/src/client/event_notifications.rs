//! Event Notifications API: destinations and topics of an instance

use std::collections::BTreeMap;

use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient, endpoint};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookParams {
    pub url: String,
    pub verb: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sensitive_headers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub params: WebhookParams,
}

/// Body of destination create and update requests
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DestinationRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub destination_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<DestinationConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub destination_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: Option<DestinationConfig>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub subscription_count: Option<i64>,
    #[serde(default)]
    pub subscription_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicRule {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub event_type_filter: Option<String>,
    #[serde(default)]
    pub notification_filter: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rules: Vec<TopicRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicSubscription {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub destination_type: Option<String>,
    #[serde(default)]
    pub destination_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_count: Option<i64>,
    #[serde(default)]
    pub sources: Vec<TopicSource>,
    #[serde(default)]
    pub subscription_count: Option<i64>,
    #[serde(default)]
    pub subscriptions: Vec<TopicSubscription>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone)]
pub struct EventNotificationsClient {
    http: HttpClient,
    base: String,
}

impl EventNotificationsClient {
    pub fn new(http: HttpClient, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, &endpoint(&self.base, path))
    }

    pub async fn create_destination(
        &self,
        instance_id: &str,
        body: &DestinationRequest,
    ) -> Result<Destination, ApiError> {
        let path = format!("/instances/{}/destinations", instance_id);
        self.http
            .send_json(self.request(Method::POST, &path).json(body))
            .await
    }

    pub async fn get_destination(&self, instance_id: &str, id: &str) -> Result<Destination, ApiError> {
        let path = format!("/instances/{}/destinations/{}", instance_id, id);
        self.http.send_json(self.request(Method::GET, &path)).await
    }

    pub async fn update_destination(
        &self,
        instance_id: &str,
        id: &str,
        body: &DestinationRequest,
    ) -> Result<Destination, ApiError> {
        let path = format!("/instances/{}/destinations/{}", instance_id, id);
        self.http
            .send_json(self.request(Method::PATCH, &path).json(body))
            .await
    }

    pub async fn delete_destination(&self, instance_id: &str, id: &str) -> Result<(), ApiError> {
        let path = format!("/instances/{}/destinations/{}", instance_id, id);
        self.http.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn get_topic(&self, instance_id: &str, id: &str) -> Result<Topic, ApiError> {
        let path = format!("/instances/{}/topics/{}", instance_id, id);
        self.http.send_json(self.request(Method::GET, &path)).await
    }
}
