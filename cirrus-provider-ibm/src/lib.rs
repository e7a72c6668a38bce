//! Cirrus IBM Cloud Provider
//!
//! Manages IBM Cloud resources through the service REST APIs.
//!
//! ## Module Structure
//!
//! - `config` - Provider configuration from the environment
//! - `auth` - IAM token exchange
//! - `client` - REST clients, one per service
//! - `resources` - Managed resource types and their CRUD adapters
//! - `data_sources` - Read-only lookups
//! - `provider` - IbmProvider implementation
//! - `utils` - Attribute helpers, timeouts and error wrapping

pub mod auth;
pub mod client;
pub mod config;
pub mod data_sources;
pub mod provider;
pub mod resources;
pub mod utils;

// Re-export main types
pub use config::{Endpoints, ProviderConfig};
pub use provider::IbmProvider;

use std::collections::HashMap;

use cirrus_core::provider::{BoxFuture, Provider, ProviderResult, ResourceType};
use cirrus_core::resource::{Resource, ResourceId, State, Value};

// =============================================================================
// Provider Trait Implementation
// =============================================================================

impl Provider for IbmProvider {
    fn name(&self) -> &'static str {
        "ibm"
    }

    fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
        resources::resource_types()
    }

    fn data_source_types(&self) -> Vec<Box<dyn ResourceType>> {
        data_sources::data_source_types()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(|s| s.to_string());
        Box::pin(async move { self.read_resource(&id, identifier.as_deref()).await })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { IbmProvider::read_data_source(self, &resource).await })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move { self.create_resource(resource).await })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move { self.update_resource(id, &identifier, from, to).await })
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: &str,
        attributes: &HashMap<String, Value>,
    ) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let attributes = attributes.clone();
        Box::pin(async move { self.delete_resource(&id, &identifier, &attributes).await })
    }
}
