//! Manifest loading and validation
//!
//! A manifest is a JSON document listing managed resources and data sources:
//!
//! ```json
//! {
//!   "resources": [
//!     { "type": "ibm_is_volume", "name": "data", "attributes": { "zone": "us-south-1" } }
//!   ],
//!   "data": [
//!     { "type": "ibm_pi_dhcp", "name": "dhcp", "attributes": { "pi_cloud_instance_id": "...", "dhcp_id": "..." } }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use cirrus_core::resource::{Resource, attributes_from_json};
use cirrus_core::schema::ResourceSchema;
use cirrus_provider_ibm::{data_sources, resources};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestFile {
    #[serde(default)]
    resources: Vec<Block>,
    #[serde(default)]
    data: Vec<Block>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Block {
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    fn into_resource(self, read_only: bool) -> Resource {
        let mut resource = Resource::new(self.resource_type, self.name).with_read_only(read_only);
        resource.attributes = attributes_from_json(&self.attributes);
        resource
    }
}

/// Parsed manifest
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Managed resources, in declaration order
    pub resources: Vec<Resource>,
    /// Data sources, in declaration order
    pub data: Vec<Resource>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::parse(&content).map_err(|e| format!("{}: {}", path.display(), e))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let file: ManifestFile =
            serde_json::from_str(content).map_err(|e| format!("Parse error: {}", e))?;

        let manifest = Self {
            resources: file
                .resources
                .into_iter()
                .map(|b| b.into_resource(false))
                .collect(),
            data: file
                .data
                .into_iter()
                .map(|b| b.into_resource(true))
                .collect(),
        };

        check_unique(&manifest.resources)?;
        check_unique(&manifest.data)?;
        Ok(manifest)
    }

    /// Data sources first, then managed resources
    pub fn all(&self) -> Vec<Resource> {
        self.data
            .iter()
            .chain(self.resources.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.data.len()
    }

    /// Validate every block against its schema, collecting all errors
    pub fn validate(&self, schemas: &Schemas) -> Result<(), String> {
        let mut all_errors = Vec::new();

        for resource in self.data.iter().chain(self.resources.iter()) {
            let Some(schema) = schemas.get(resource) else {
                let kind = if resource.is_data_source() {
                    "data source"
                } else {
                    "resource"
                };
                all_errors.push(format!(
                    "{}: Unknown {} type: {}",
                    resource.id, kind, resource.id.resource_type
                ));
                continue;
            };

            if let Err(errors) = schema.validate(&resource.attributes) {
                for error in errors {
                    all_errors.push(format!("{}: {}", resource.id, error));
                }
            }
        }

        if all_errors.is_empty() {
            Ok(())
        } else {
            Err(all_errors.join("\n"))
        }
    }
}

fn check_unique(blocks: &[Resource]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for resource in blocks {
        if !seen.insert(&resource.id) {
            return Err(format!("Duplicate block {}", resource.id));
        }
    }
    Ok(())
}

/// Schemas of every resource and data source type, keyed by type name
pub struct Schemas {
    pub resources: HashMap<String, ResourceSchema>,
    pub data_sources: HashMap<String, ResourceSchema>,
}

impl Schemas {
    pub fn ibm() -> Self {
        let collect = |types: Vec<Box<dyn cirrus_core::provider::ResourceType>>| {
            types
                .into_iter()
                .map(|t| (t.name().to_string(), t.schema()))
                .collect()
        };
        Self {
            resources: collect(resources::resource_types()),
            data_sources: collect(data_sources::data_source_types()),
        }
    }

    pub fn get(&self, resource: &Resource) -> Option<&ResourceSchema> {
        if resource.is_data_source() {
            self.data_sources.get(&resource.id.resource_type)
        } else {
            self.resources.get(&resource.id.resource_type)
        }
    }
}
