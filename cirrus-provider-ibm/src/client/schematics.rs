//! Schematics API: inventories and resource queries

use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};

use super::{ApiError, HttpClient, endpoint};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventories_ini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_queries: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inventory {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub resource_group: Option<String>,
    #[serde(default)]
    pub inventories_ini: Option<String>,
    #[serde(default)]
    pub resource_queries: Option<Vec<String>>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_condition: Vec<QueryCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_select: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceQueryRequest {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub query_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<ResourceQuery>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourceQueryRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub queries: Vec<ResourceQuery>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

#[derive(Clone)]
pub struct SchematicsClient {
    http: HttpClient,
    base: String,
}

impl SchematicsClient {
    pub fn new(http: HttpClient, base: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, &endpoint(&self.base, path))
    }

    pub async fn create_inventory(&self, body: &InventoryRequest) -> Result<Inventory, ApiError> {
        self.http
            .send_json(self.request(Method::POST, "/v2/inventories").json(body))
            .await
    }

    pub async fn get_inventory(&self, id: &str) -> Result<Inventory, ApiError> {
        let path = format!("/v2/inventories/{}", id);
        self.http.send_json(self.request(Method::GET, &path)).await
    }

    pub async fn replace_inventory(&self, id: &str, body: &InventoryRequest) -> Result<Inventory, ApiError> {
        let path = format!("/v2/inventories/{}", id);
        self.http
            .send_json(self.request(Method::PUT, &path).json(body))
            .await
    }

    pub async fn delete_inventory(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/inventories/{}", id);
        self.http.send_empty(self.request(Method::DELETE, &path)).await
    }

    pub async fn create_resource_query(
        &self,
        body: &ResourceQueryRequest,
    ) -> Result<ResourceQueryRecord, ApiError> {
        self.http
            .send_json(self.request(Method::POST, "/v2/resources_query").json(body))
            .await
    }

    pub async fn get_resource_query(&self, id: &str) -> Result<ResourceQueryRecord, ApiError> {
        let path = format!("/v2/resources_query/{}", id);
        self.http.send_json(self.request(Method::GET, &path)).await
    }

    pub async fn replace_resource_query(
        &self,
        id: &str,
        body: &ResourceQueryRequest,
    ) -> Result<ResourceQueryRecord, ApiError> {
        let path = format!("/v2/resources_query/{}", id);
        self.http
            .send_json(self.request(Method::PUT, &path).json(body))
            .await
    }

    pub async fn delete_resource_query(&self, id: &str) -> Result<(), ApiError> {
        let path = format!("/v2/resources_query/{}", id);
        self.http.send_empty(self.request(Method::DELETE, &path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_query_request_serialization() {
        let body = ResourceQueryRequest {
            query_type: Some("vsi".to_string()),
            name: Some("web-servers".to_string()),
            queries: Some(vec![ResourceQuery {
                query_type: Some("workspaces".to_string()),
                query_condition: vec![QueryCondition {
                    name: Some("workspace-id".to_string()),
                    value: Some("ws-1".to_string()),
                    description: None,
                }],
                query_select: vec![],
            }]),
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "type": "vsi",
                "name": "web-servers",
                "queries": [{
                    "query_type": "workspaces",
                    "query_condition": [{"name": "workspace-id", "value": "ws-1"}]
                }]
            })
        );
    }

    #[test]
    fn test_inventory_request_skips_unset() {
        let body = InventoryRequest {
            name: Some("inv".to_string()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"name": "inv"}));
    }
}
