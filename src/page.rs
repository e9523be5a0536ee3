//! Parsed database row
//!
//! A [`Page`] keeps its properties as `(name hash, value)` pairs in insertion
//! order. Lookups are a linear scan, which beats a hash map for the handful
//! of columns a database row carries.

use crate::property::TypedProperty;
use xxhash_rust::xxh3::xxh3_64;

/// Name key used inside a [`Page`]
pub fn hash_key(name: &str) -> u32 {
    xxh3_64(name.as_bytes()) as u32
}

/// One typed record returned by a single query result row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    properties: Vec<(u32, TypedProperty)>,
}

impl Page {
    /// Create an empty page
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a property by name
    pub fn get(&self, name: &str) -> Option<&TypedProperty> {
        let key = hash_key(name);
        self.properties
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, prop)| prop)
    }

    /// Insert a property, replacing an existing value in place
    pub fn set(&mut self, name: &str, property: TypedProperty) {
        let key = hash_key(name);
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = property,
            None => self.properties.push((key, property)),
        }
    }

    /// Check whether a property is present
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Properties in insertion order, keyed by name hash
    pub fn iter(&self) -> impl Iterator<Item = (u32, &TypedProperty)> {
        self.properties.iter().map(|(k, prop)| (*k, prop))
    }

    /// Render the named properties as a JSON object
    ///
    /// Pages only store name hashes, so the caller supplies the names, usually
    /// the set of available properties.
    pub fn to_json<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for name in names {
            if let Some(prop) = self.get(name) {
                obj.insert(name.to_string(), prop.to_json());
            }
        }
        serde_json::Value::Object(obj)
    }
}
