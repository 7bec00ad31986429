//! Schema registry: the ordered set of properties rules may reference

use sieve_core::{
    compute_content_hash, is_reserved, ContentHash, PropertyDescriptor, SchemaError,
    SchemaResult, TargetType,
};
use std::collections::HashMap;

/// Ordered, case-insensitively indexed property descriptors.
///
/// Immutable once built; changing the target type builds a new registry.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    properties: Vec<PropertyDescriptor>,
    index: HashMap<String, usize>,
    fingerprint: ContentHash,
}

impl SchemaRegistry {
    /// Build a registry from descriptors, preserving their order.
    pub fn new(properties: Vec<PropertyDescriptor>) -> SchemaResult<Self> {
        let mut index = HashMap::with_capacity(properties.len());

        for (i, property) in properties.iter().enumerate() {
            validate_descriptor(property)?;
            if index.insert(property.name.to_ascii_lowercase(), i).is_some() {
                return Err(SchemaError::DuplicateProperty {
                    name: property.name.clone(),
                });
            }
        }

        let fingerprint = fingerprint(&properties);
        Ok(Self {
            properties,
            index,
            fingerprint,
        })
    }

    /// Build a registry from a host type's own description.
    pub fn for_target<T: TargetType>() -> SchemaResult<Self> {
        Self::new(T::properties())
    }

    /// Case-insensitive lookup.
    pub fn describe(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.properties[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Property names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Stable hash over every descriptor; distinguishes schemas sharing a cache.
    pub fn fingerprint(&self) -> &ContentHash {
        &self.fingerprint
    }
}

fn validate_descriptor(property: &PropertyDescriptor) -> SchemaResult<()> {
    let name = &property.name;
    if name.is_empty()
        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        || name.starts_with(|c: char| c.is_ascii_digit())
        || is_reserved(name)
    {
        return Err(SchemaError::InvalidPropertyName { name: name.clone() });
    }
    if matches!(&property.allowed_values, Some(values) if values.is_empty()) {
        return Err(SchemaError::EmptyAllowedValues { name: name.clone() });
    }
    Ok(())
}

fn fingerprint(properties: &[PropertyDescriptor]) -> ContentHash {
    let mut buf = String::new();
    for property in properties {
        buf.push_str(&property.name);
        buf.push('\u{1f}');
        buf.push_str(property.property_type.name());
        if let Some(values) = &property.allowed_values {
            for value in values {
                buf.push('\u{1f}');
                buf.push_str(value);
            }
        }
        buf.push('\u{1e}');
    }
    compute_content_hash(buf.as_bytes())
}
