//! REST clients for the IBM Cloud services the provider manages
//!
//! Each client owns a base URL and exposes one method per API call, with
//! request and response bodies as serde types.

mod appid;
mod event_notifications;
mod http;
mod power;
mod schematics;
mod vpc;

pub use appid::*;
pub use event_notifications::*;
pub use http::{ApiError, HttpClient};
pub use power::*;
pub use schematics::*;
pub use vpc::*;

use serde::{Deserialize, Serialize};

/// Reference to another object by ID, name or CRN
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crn: Option<String>,
}

impl Reference {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn by_crn(crn: impl Into<String>) -> Self {
        Self {
            crn: Some(crn.into()),
            ..Default::default()
        }
    }
}

/// Join a base URL and a path
fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
