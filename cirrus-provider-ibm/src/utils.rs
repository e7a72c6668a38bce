//! Helpers shared by the resource adapters: attribute access, operation
//! timeouts and error wrapping

use std::collections::HashMap;
use std::time::Duration;

use cirrus_core::differ::TIMEOUTS_ATTRIBUTE;
use cirrus_core::provider::ProviderError;
use cirrus_core::resource::{ResourceId, Value};
use cirrus_core::wait::WaitError;

use crate::client::ApiError;

pub type Attributes = HashMap<String, Value>;

pub fn get_str<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a str> {
    attributes.get(key).and_then(Value::as_str)
}

pub fn get_int(attributes: &Attributes, key: &str) -> Option<i64> {
    attributes.get(key).and_then(Value::as_int)
}

pub fn get_bool(attributes: &Attributes, key: &str) -> Option<bool> {
    attributes.get(key).and_then(Value::as_bool)
}

/// String items of a list attribute; missing and non-string items are skipped
pub fn get_str_list(attributes: &Attributes, key: &str) -> Vec<String> {
    attributes
        .get(key)
        .and_then(Value::as_list)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Items of a nested block, whether written as a single map or a list of maps
pub fn get_blocks<'a>(attributes: &'a Attributes, key: &str) -> Vec<&'a Attributes> {
    match attributes.get(key) {
        Some(Value::Map(map)) => vec![map],
        Some(Value::List(items)) => items.iter().filter_map(Value::as_map).collect(),
        _ => Vec::new(),
    }
}

pub fn first_block<'a>(attributes: &'a Attributes, key: &str) -> Option<&'a Attributes> {
    get_blocks(attributes, key).into_iter().next()
}

pub fn require_str<'a>(attributes: &'a Attributes, key: &str, id: &ResourceId) -> Result<&'a str, ProviderError> {
    get_str(attributes, key).ok_or_else(|| {
        ProviderError::new(format!("Missing required attribute '{}'", key)).for_resource(id.clone())
    })
}

/// Insert when present
pub fn set_opt<V: Into<Value>>(attributes: &mut Attributes, key: &str, value: Option<V>) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), value.into());
    }
}

pub fn string_list(items: &[String]) -> Value {
    Value::List(items.iter().map(|s| Value::String(s.clone())).collect())
}

/// Build a map value from key/value pairs, skipping absent values
pub fn block<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Option<Value>)>,
{
    Value::Map(
        pairs
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
            .collect(),
    )
}

/// Carry over attributes the remote side never returns (secrets, write-only flags)
pub fn keep_inputs(attributes: &mut Attributes, from: &Attributes, keys: &[&str]) {
    for key in keys {
        if let Some(value) = from.get(*key)
            && !attributes.contains_key(*key)
        {
            attributes.insert(key.to_string(), value.clone());
        }
    }
}

// =============================================================================
// Timeouts
// =============================================================================

/// Per-operation timeouts, overridable through the `timeouts` block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeouts {
    pub create: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Timeouts {
    pub const fn minutes(create: u64, update: u64, delete: u64) -> Self {
        Self {
            create: Duration::from_secs(create * 60),
            update: Duration::from_secs(update * 60),
            delete: Duration::from_secs(delete * 60),
        }
    }

    /// Apply the `timeouts` attribute, e.g. `{"create": "45m", "delete": "90s"}`
    pub fn from_attributes(defaults: Self, attributes: &Attributes, id: &ResourceId) -> Result<Self, ProviderError> {
        let mut timeouts = defaults;
        let Some(block) = first_block(attributes, TIMEOUTS_ATTRIBUTE) else {
            return Ok(timeouts);
        };

        for (key, value) in block {
            let slot = match key.as_str() {
                "create" => &mut timeouts.create,
                "update" => &mut timeouts.update,
                "delete" => &mut timeouts.delete,
                other => {
                    return Err(ProviderError::new(format!("Unknown timeout '{}'", other))
                        .for_resource(id.clone()));
                }
            };
            let raw = value.as_str().ok_or_else(|| {
                ProviderError::new(format!("Timeout '{}' must be a duration string", key))
                    .for_resource(id.clone())
            })?;
            *slot = humantime::parse_duration(raw).map_err(|e| {
                ProviderError::new(format!("Invalid timeout '{}' = '{}': {}", key, raw, e))
                    .for_resource(id.clone())
            })?;
        }

        Ok(timeouts)
    }
}

// =============================================================================
// Error Wrapping
// =============================================================================

pub fn api_error(id: &ResourceId, context: impl std::fmt::Display, err: ApiError) -> ProviderError {
    ProviderError::new(format!("{}: {}", context, err))
        .for_resource(id.clone())
        .with_cause(err)
}

pub fn wait_error(id: &ResourceId, context: impl std::fmt::Display, err: WaitError) -> ProviderError {
    ProviderError::new(format!("{}: {}", context, err))
        .for_resource(id.clone())
        .with_cause(err)
}

pub fn invalid_identifier(id: &ResourceId, err: cirrus_core::identifier::IdentifierError) -> ProviderError {
    ProviderError::new(err.to_string())
        .for_resource(id.clone())
        .with_cause(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ResourceId {
        ResourceId::new("ibm_is_volume", "data")
    }

    #[test]
    fn test_get_blocks_accepts_map_and_list() {
        let inner: Attributes = [("url".to_string(), Value::from("https://x"))].into();
        let as_map: Attributes = [("config".to_string(), Value::Map(inner.clone()))].into();
        let as_list: Attributes = [(
            "config".to_string(),
            Value::List(vec![Value::Map(inner.clone())]),
        )]
        .into();

        assert_eq!(first_block(&as_map, "config"), Some(&inner));
        assert_eq!(first_block(&as_list, "config"), Some(&inner));
        assert!(first_block(&as_list, "missing").is_none());
    }

    #[test]
    fn test_timeouts_override() {
        let attributes: Attributes = [(
            "timeouts".to_string(),
            Value::Map(
                [
                    ("create".to_string(), Value::from("45m")),
                    ("delete".to_string(), Value::from("90s")),
                ]
                .into(),
            ),
        )]
        .into();

        let timeouts = Timeouts::from_attributes(Timeouts::minutes(10, 10, 10), &attributes, &id()).unwrap();
        assert_eq!(timeouts.create, Duration::from_secs(45 * 60));
        assert_eq!(timeouts.update, Duration::from_secs(600));
        assert_eq!(timeouts.delete, Duration::from_secs(90));
    }

    #[test]
    fn test_timeouts_invalid() {
        let attributes: Attributes = [(
            "timeouts".to_string(),
            Value::Map([("create".to_string(), Value::from("soon"))].into()),
        )]
        .into();
        let err = Timeouts::from_attributes(Timeouts::minutes(1, 1, 1), &attributes, &id()).unwrap_err();
        assert!(err.message.contains("Invalid timeout 'create'"));

        let attributes: Attributes = [(
            "timeouts".to_string(),
            Value::Map([("read".to_string(), Value::from("1m"))].into()),
        )]
        .into();
        assert!(Timeouts::from_attributes(Timeouts::minutes(1, 1, 1), &attributes, &id()).is_err());
    }

    #[test]
    fn test_keep_inputs() {
        let mut read: Attributes = [("name".to_string(), Value::from("a"))].into();
        let previous: Attributes = [
            ("name".to_string(), Value::from("old")),
            ("secret".to_string(), Value::from("s3cr3t")),
        ]
        .into();

        keep_inputs(&mut read, &previous, &["name", "secret"]);
        assert_eq!(read.get("name"), Some(&Value::from("a")));
        assert_eq!(read.get("secret"), Some(&Value::from("s3cr3t")));
    }

    #[test]
    fn test_block_skips_absent() {
        let value = block([("code", Some(Value::from("x"))), ("message", None)]);
        let map = value.as_map().unwrap();
        assert_eq!(map.len(), 1);
    }
}
