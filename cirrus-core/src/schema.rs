//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource and data source type,
//! enabling validation before any remote call is made.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::resource::Value;

/// Validation function used by custom attribute types
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Attribute type
#[derive(Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: Validator,
    },
    /// List
    List(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested block. Accepts a single map or a list of maps.
    Block(Box<BlockSchema>),
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Schema of a nested block (e.g., `config.params` of a destination)
#[derive(Debug, Clone, Default)]
pub struct BlockSchema {
    pub attributes: HashMap<String, AttributeSchema>,
    pub max_items: Option<usize>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    fn validate_item(&self, map: &HashMap<String, Value>) -> Result<(), TypeError> {
        for (name, schema) in &self.attributes {
            if schema.required && !map.contains_key(name) {
                return Err(TypeError::MissingRequired { name: name.clone() });
            }
        }
        for (key, value) in map {
            if let Some(schema) = self.attributes.get(key) {
                schema
                    .attr_type
                    .validate(value)
                    .map_err(|e| TypeError::MapValueError {
                        key: key.clone(),
                        inner: Box::new(e),
                    })?;
            }
        }
        Ok(())
    }
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(block), Value::Map(map)) => block.validate_item(map),

            (AttributeType::Block(block), Value::List(items)) => {
                if let Some(max) = block.max_items
                    && items.len() > max
                {
                    return Err(TypeError::TooManyItems {
                        max,
                        got: items.len(),
                    });
                }
                for (i, item) in items.iter().enumerate() {
                    let result = match item {
                        Value::Map(map) => block.validate_item(map),
                        other => Err(TypeError::TypeMismatch {
                            expected: "Block".to_string(),
                            got: other.type_name(),
                        }),
                    };
                    result.map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(_) => "Block".to_string(),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}' conflicts with '{other}'")]
    Conflict { name: String, other: String },

    #[error("Attribute '{name}' requires '{other}' to be set")]
    RequiredWith { name: String, other: String },

    #[error("Exactly one of {} must be set", names.join(", "))]
    ExactlyOneOf { names: Vec<String> },

    #[error("Too many items: at most {max} allowed, got {got}")]
    TooManyItems { max: usize, got: usize },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// Value is reported by the remote service
    pub computed: bool,
    /// Whether the user may set this attribute (false for computed-only)
    pub settable: bool,
    /// Changing this attribute requires replacing the resource
    pub force_new: bool,
    /// Value is hidden in plan output
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
    pub conflicts_with: Vec<String>,
    pub required_with: Vec<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            computed: false,
            settable: true,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
            conflicts_with: Vec::new(),
            required_with: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Computed-only attribute, reported by the remote service
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self.settable = false;
        self
    }

    /// Optional attribute whose value is reported back when unset
    pub fn optional_computed(mut self) -> Self {
        self.computed = true;
        self.settable = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn conflicts_with(mut self, names: &[&str]) -> Self {
        self.conflicts_with = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn required_with(mut self, names: &[&str]) -> Self {
        self.required_with = names.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    /// Groups of attributes of which exactly one must be set
    pub exactly_one_of: Vec<Vec<String>>,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            exactly_one_of: Vec::new(),
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn exactly_one_of(mut self, names: &[&str]) -> Self {
        self.exactly_one_of
            .push(names.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Names of attributes whose change forces replacement
    pub fn force_new_attributes(&self) -> Vec<&str> {
        self.attributes
            .values()
            .filter(|a| a.force_new)
            .map(|a| a.name.as_str())
            .collect()
    }

    /// Whether the attribute should be masked in output
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.sensitive)
    }

    /// Fill in default values for attributes the user left unset
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && schema.settable
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            // Unknown attributes are allowed (for flexibility)
            let Some(schema) = self.attributes.get(name) else {
                continue;
            };

            if !schema.settable {
                errors.push(TypeError::ComputedAttribute { name: name.clone() });
                continue;
            }

            if let Err(e) = schema.attr_type.validate(value) {
                errors.push(TypeError::MapValueError {
                    key: name.clone(),
                    inner: Box::new(e),
                });
            }

            for other in &schema.conflicts_with {
                if attributes.contains_key(other) {
                    errors.push(TypeError::Conflict {
                        name: name.clone(),
                        other: other.clone(),
                    });
                }
            }

            for other in &schema.required_with {
                if !attributes.contains_key(other) {
                    errors.push(TypeError::RequiredWith {
                        name: name.clone(),
                        other: other.clone(),
                    });
                }
            }
        }

        for group in &self.exactly_one_of {
            let set = group.iter().filter(|n| attributes.contains_key(*n)).count();
            if set != 1 {
                errors.push(TypeError::ExactlyOneOf {
                    names: group.clone(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Integer within an inclusive range
    pub fn int_between(min: i64, max: i64) -> AttributeType {
        AttributeType::Custom {
            name: format!("Int({}..={})", min, max),
            base: Box::new(AttributeType::Int),
            validate: Arc::new(move |value| match value {
                Value::Int(n) if (min..=max).contains(n) => Ok(()),
                Value::Int(n) => Err(format!(
                    "expected to be in the range ({} - {}), got {}",
                    min, max, n
                )),
                _ => Err("Expected integer".to_string()),
            }),
        }
    }

    /// String whose length lies within an inclusive range
    pub fn string_len_between(min: usize, max: usize) -> AttributeType {
        AttributeType::Custom {
            name: format!("String({}..={})", min, max),
            base: Box::new(AttributeType::String),
            validate: Arc::new(move |value| match value {
                Value::String(s) => check_len(s, min, max),
                _ => Err("Expected string".to_string()),
            }),
        }
    }

    /// String matching a pattern, with length bounds
    pub fn regex_len(pattern: &'static str, min: usize, max: usize) -> AttributeType {
        AttributeType::Custom {
            name: format!("Pattern({})", pattern),
            base: Box::new(AttributeType::String),
            validate: Arc::new(move |value| match value {
                Value::String(s) => {
                    check_len(s, min, max)?;
                    let re = regex::Regex::new(pattern).map_err(|e| e.to_string())?;
                    if re.is_match(s) {
                        Ok(())
                    } else {
                        Err(format!("value '{}' must match {}", s, pattern))
                    }
                }
                _ => Err("Expected string".to_string()),
            }),
        }
    }

    /// Enum built from string slices
    pub fn one_of(values: &[&str]) -> AttributeType {
        AttributeType::Enum(values.iter().map(|s| s.to_string()).collect())
    }

    /// List of strings
    pub fn string_list() -> AttributeType {
        AttributeType::List(Box::new(AttributeType::String))
    }

    fn check_len(s: &str, min: usize, max: usize) -> Result<(), String> {
        let len = s.chars().count();
        if len < min || len > max {
            Err(format!(
                "length must be between {} and {}, got {}",
                min, max, len
            ))
        } else {
            Ok(())
        }
    }
}
