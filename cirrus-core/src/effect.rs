//! Effect - Side effects described as values
//!
//! An Effect only describes what should happen. Nothing is executed until
//! an Interpreter applies it through a Provider.

use std::collections::HashMap;

use crate::resource::{Resource, ResourceId, State, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Evaluate a data source
    Read { resource: Resource },
    Create(Resource),
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete then create, for changes the remote API cannot apply in place
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    Delete {
        id: ResourceId,
        identifier: String,
        attributes: HashMap<String, Value>,
    },
}

impl Effect {
    /// Returns whether this Effect changes remote infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read { .. })
    }

    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read { resource } => &resource.id,
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } | Effect::Delete { id, .. } => id,
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Read { resource } => write!(f, "Read {}", resource.id),
            Effect::Create(resource) => write!(f, "Create {}", resource.id),
            Effect::Update { id, .. } => write!(f, "Update {}", id),
            Effect::Replace { id, .. } => write!(f, "Replace {}", id),
            Effect::Delete { id, .. } => write!(f, "Delete {}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_not_mutating() {
        let read = Effect::Read {
            resource: Resource::new("ibm_en_topic", "alerts").with_read_only(true),
        };
        assert!(!read.is_mutating());
        assert!(Effect::Create(Resource::new("ibm_pi_dhcp", "main")).is_mutating());
    }

    #[test]
    fn display_names_resource() {
        let effect = Effect::Delete {
            id: ResourceId::new("ibm_pi_dhcp", "main"),
            identifier: "cid/dhcp".to_string(),
            attributes: HashMap::new(),
        };
        assert_eq!(effect.to_string(), "Delete ibm_pi_dhcp.main");
        assert_eq!(effect.resource_id().name, "main");
    }
}
