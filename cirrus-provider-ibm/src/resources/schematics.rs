//! Schematics inventories and resource queries
//!
//! Both are plain records: create returns the ID, update replaces the whole
//! record and delete removes it. There is nothing to wait for.

use cirrus_core::differ::find_changed_attributes;
use cirrus_core::provider::ProviderResult;
use cirrus_core::resource::{Resource, ResourceId, State, Value};
use cirrus_core::schema::{AttributeSchema, AttributeType, BlockSchema, ResourceSchema, types};

use crate::client::{
    Inventory, InventoryRequest, QueryCondition, ResourceQuery, ResourceQueryRecord,
    ResourceQueryRequest,
};
use crate::provider::IbmProvider;
use crate::utils::{
    Attributes, api_error, block, get_blocks, get_str, get_str_list, set_opt, string_list,
};

pub const INVENTORY_TYPE: &str = "ibm_schematics_inventory";
pub const RESOURCE_QUERY_TYPE: &str = "ibm_schematics_resource_query";

const LOCATIONS: &[&str] = &["eu-de", "eu-gb", "us-east", "us-south"];
const QUERY_TYPES: &[&str] = &["vsi"];

fn audit_attributes(schema: ResourceSchema) -> ResourceSchema {
    ["created_at", "created_by", "updated_at", "updated_by"]
        .into_iter()
        .fold(schema, |schema, name| {
            schema.attribute(AttributeSchema::new(name, AttributeType::String).computed())
        })
}

fn set_audit(
    attributes: &mut Attributes,
    created_at: &Option<String>,
    created_by: &Option<String>,
    updated_at: &Option<String>,
    updated_by: &Option<String>,
) {
    set_opt(attributes, "created_at", created_at.clone());
    set_opt(attributes, "created_by", created_by.clone());
    set_opt(attributes, "updated_at", updated_at.clone());
    set_opt(attributes, "updated_by", updated_by.clone());
}

// =============================================================================
// Inventory
// =============================================================================

pub fn inventory_schema() -> ResourceSchema {
    let schema = ResourceSchema::new(INVENTORY_TYPE)
        .with_description("Schematics inventory of hosts for actions")
        .attribute(
            AttributeSchema::new("name", types::string_len_between(3, 64))
                .with_description("Unique name of the inventory"),
        )
        .attribute(AttributeSchema::new("description", AttributeType::String))
        .attribute(
            AttributeSchema::new("location", types::one_of(LOCATIONS))
                .with_description("Region where the inventory is stored"),
        )
        .attribute(AttributeSchema::new("resource_group", AttributeType::String))
        .attribute(
            AttributeSchema::new("inventories_ini", AttributeType::String)
                .with_description("Hosts in INI format"),
        )
        .attribute(
            AttributeSchema::new("resource_queries", types::string_list())
                .with_description("Resource query IDs whose results make up the inventory"),
        );
    audit_attributes(schema)
}

fn inventory_request(attributes: &Attributes) -> InventoryRequest {
    let resource_queries = attributes
        .contains_key("resource_queries")
        .then(|| get_str_list(attributes, "resource_queries"));

    InventoryRequest {
        name: get_str(attributes, "name").map(str::to_string),
        description: get_str(attributes, "description").map(str::to_string),
        location: get_str(attributes, "location").map(str::to_string),
        resource_group: get_str(attributes, "resource_group").map(str::to_string),
        inventories_ini: get_str(attributes, "inventories_ini").map(str::to_string),
        resource_queries,
    }
}

fn inventory_attributes(inventory: &Inventory) -> Attributes {
    let mut attributes = Attributes::new();
    set_opt(&mut attributes, "name", inventory.name.clone());
    set_opt(&mut attributes, "description", inventory.description.clone());
    set_opt(&mut attributes, "location", inventory.location.clone());
    set_opt(&mut attributes, "resource_group", inventory.resource_group.clone());
    set_opt(&mut attributes, "inventories_ini", inventory.inventories_ini.clone());
    set_opt(
        &mut attributes,
        "resource_queries",
        inventory.resource_queries.as_deref().map(string_list),
    );
    set_audit(
        &mut attributes,
        &inventory.created_at,
        &inventory.created_by,
        &inventory.updated_at,
        &inventory.updated_by,
    );
    attributes
}

pub async fn read_inventory(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
    let inventory = match provider.schematics.get_inventory(identifier).await {
        Ok(inventory) => inventory,
        Err(e) if e.is_not_found() => {
            log::warn!("Inventory {} not found, removing it from state", identifier);
            return Ok(State::not_found(id.clone()));
        }
        Err(e) => return Err(api_error(id, "GetInventory failed", e)),
    };

    Ok(State::existing(id.clone(), inventory_attributes(&inventory)).with_identifier(identifier))
}

pub async fn create_inventory(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let created = provider
        .schematics
        .create_inventory(&inventory_request(&resource.attributes))
        .await
        .map_err(|e| api_error(id, "CreateInventory failed", e))?;

    read_inventory(provider, id, &created.id).await
}

pub async fn update_inventory(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    if !find_changed_attributes(&to.attributes, &from.attributes).is_empty() {
        provider
            .schematics
            .replace_inventory(identifier, &inventory_request(&to.attributes))
            .await
            .map_err(|e| api_error(id, "ReplaceInventory failed", e))?;
    }
    read_inventory(provider, id, identifier).await
}

pub async fn delete_inventory(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    match provider.schematics.delete_inventory(identifier).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(api_error(id, "DeleteInventory failed", e)),
    }
}

// =============================================================================
// Resource Query
// =============================================================================

fn condition_block() -> BlockSchema {
    BlockSchema::new()
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new("value", AttributeType::String))
        .attribute(AttributeSchema::new("description", AttributeType::String))
}

pub fn resource_query_schema() -> ResourceSchema {
    let schema = ResourceSchema::new(RESOURCE_QUERY_TYPE)
        .with_description("Schematics query selecting cloud resources for an inventory")
        .attribute(AttributeSchema::new("type", types::one_of(QUERY_TYPES)))
        .attribute(AttributeSchema::new("name", AttributeType::String))
        .attribute(AttributeSchema::new(
            "queries",
            AttributeType::Block(Box::new(
                BlockSchema::new()
                    .attribute(AttributeSchema::new("query_type", AttributeType::String))
                    .attribute(AttributeSchema::new(
                        "query_condition",
                        AttributeType::Block(Box::new(condition_block())),
                    ))
                    .attribute(AttributeSchema::new("query_select", types::string_list())),
            )),
        ));
    audit_attributes(schema)
}

fn queries_from_attributes(attributes: &Attributes) -> Option<Vec<ResourceQuery>> {
    if !attributes.contains_key("queries") {
        return None;
    }
    let queries = get_blocks(attributes, "queries")
        .into_iter()
        .map(|query| ResourceQuery {
            query_type: get_str(query, "query_type").map(str::to_string),
            query_condition: get_blocks(query, "query_condition")
                .into_iter()
                .map(|c| QueryCondition {
                    name: get_str(c, "name").map(str::to_string),
                    value: get_str(c, "value").map(str::to_string),
                    description: get_str(c, "description").map(str::to_string),
                })
                .collect(),
            query_select: get_str_list(query, "query_select"),
        })
        .collect();
    Some(queries)
}

fn resource_query_request(attributes: &Attributes) -> ResourceQueryRequest {
    ResourceQueryRequest {
        query_type: get_str(attributes, "type").map(str::to_string),
        name: get_str(attributes, "name").map(str::to_string),
        queries: queries_from_attributes(attributes),
    }
}

fn query_value(query: &ResourceQuery) -> Value {
    let conditions = query
        .query_condition
        .iter()
        .map(|c| {
            block([
                ("name", c.name.as_deref().map(Value::from)),
                ("value", c.value.as_deref().map(Value::from)),
                ("description", c.description.as_deref().map(Value::from)),
            ])
        })
        .collect::<Vec<_>>();

    block([
        ("query_type", query.query_type.as_deref().map(Value::from)),
        (
            "query_condition",
            (!conditions.is_empty()).then_some(Value::List(conditions)),
        ),
        (
            "query_select",
            (!query.query_select.is_empty()).then(|| string_list(&query.query_select)),
        ),
    ])
}

fn resource_query_attributes(record: &ResourceQueryRecord) -> Attributes {
    let mut attributes = Attributes::new();
    set_opt(&mut attributes, "type", record.query_type.clone());
    set_opt(&mut attributes, "name", record.name.clone());
    if !record.queries.is_empty() {
        attributes.insert(
            "queries".to_string(),
            Value::List(record.queries.iter().map(query_value).collect()),
        );
    }
    set_audit(
        &mut attributes,
        &record.created_at,
        &record.created_by,
        &record.updated_at,
        &record.updated_by,
    );
    attributes
}

pub async fn read_resource_query(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
) -> ProviderResult<State> {
    let record = match provider.schematics.get_resource_query(identifier).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            log::warn!("Resource query {} not found, removing it from state", identifier);
            return Ok(State::not_found(id.clone()));
        }
        Err(e) => return Err(api_error(id, "GetResourcesQuery failed", e)),
    };

    Ok(State::existing(id.clone(), resource_query_attributes(&record)).with_identifier(identifier))
}

pub async fn create_resource_query(provider: &IbmProvider, resource: &Resource) -> ProviderResult<State> {
    let id = &resource.id;
    let created = provider
        .schematics
        .create_resource_query(&resource_query_request(&resource.attributes))
        .await
        .map_err(|e| api_error(id, "CreateResourceQuery failed", e))?;

    read_resource_query(provider, id, &created.id).await
}

pub async fn update_resource_query(
    provider: &IbmProvider,
    id: &ResourceId,
    identifier: &str,
    from: &State,
    to: &Resource,
) -> ProviderResult<State> {
    if !find_changed_attributes(&to.attributes, &from.attributes).is_empty() {
        provider
            .schematics
            .replace_resource_query(identifier, &resource_query_request(&to.attributes))
            .await
            .map_err(|e| api_error(id, "ReplaceResourcesQuery failed", e))?;
    }
    read_resource_query(provider, id, identifier).await
}

pub async fn delete_resource_query(provider: &IbmProvider, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
    match provider.schematics.delete_resource_query(identifier).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(api_error(id, "DeleteResourcesQuery failed", e)),
    }
}
