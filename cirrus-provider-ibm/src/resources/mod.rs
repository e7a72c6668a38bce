//! Resource type definitions
//!
//! One module per managed resource (or family of resources), each exposing
//! its schema and the read/create/update/delete adapters the provider
//! dispatches to.

pub mod appid;
pub mod en_destination;
pub mod pi_dhcp;
pub mod pi_image;
pub mod schematics;
pub mod volume;

use cirrus_core::provider::ResourceType;
use cirrus_core::schema::ResourceSchema;

// =============================================================================
// Resource Type Definitions
// =============================================================================

macro_rules! define_resource_type {
    ($name:ident, $type_name:expr, $schema:path) => {
        pub struct $name;
        impl ResourceType for $name {
            fn name(&self) -> &'static str {
                $type_name
            }
            fn schema(&self) -> ResourceSchema {
                $schema()
            }
        }
    };
}

pub(crate) use define_resource_type;

define_resource_type!(VolumeType, volume::RESOURCE_TYPE, volume::schema);
define_resource_type!(PiDhcpType, pi_dhcp::RESOURCE_TYPE, pi_dhcp::schema);
define_resource_type!(PiImageType, pi_image::RESOURCE_TYPE, pi_image::schema);
define_resource_type!(
    EnDestinationType,
    en_destination::RESOURCE_TYPE,
    en_destination::schema
);
define_resource_type!(
    SchematicsInventoryType,
    schematics::INVENTORY_TYPE,
    schematics::inventory_schema
);
define_resource_type!(
    SchematicsResourceQueryType,
    schematics::RESOURCE_QUERY_TYPE,
    schematics::resource_query_schema
);
define_resource_type!(
    AppIdTokenConfigType,
    appid::TOKEN_CONFIG_TYPE,
    appid::token_config_schema
);
define_resource_type!(
    AppIdMfaChannelType,
    appid::MFA_CHANNEL_TYPE,
    appid::mfa_channel_schema
);
define_resource_type!(
    AppIdCloudDirectoryType,
    appid::CLOUD_DIRECTORY_TYPE,
    appid::cloud_directory_schema
);
define_resource_type!(
    AppIdCustomIdpType,
    appid::CUSTOM_IDP_TYPE,
    appid::custom_idp_schema
);

/// Returns all resource types supported by this provider
pub fn resource_types() -> Vec<Box<dyn ResourceType>> {
    vec![
        Box::new(VolumeType),
        Box::new(PiDhcpType),
        Box::new(PiImageType),
        Box::new(EnDestinationType),
        Box::new(SchematicsInventoryType),
        Box::new(SchematicsResourceQueryType),
        Box::new(AppIdTokenConfigType),
        Box::new(AppIdMfaChannelType),
        Box::new(AppIdCloudDirectoryType),
        Box::new(AppIdCustomIdpType),
    ]
}

/// Schema of a managed resource type
pub fn schema_for(resource_type: &str) -> Option<ResourceSchema> {
    resource_types()
        .into_iter()
        .find(|t| t.name() == resource_type)
        .map(|t| t.schema())
}
