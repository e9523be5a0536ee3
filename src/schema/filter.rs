//! Property name and kind filter

use crate::property::{PropertyKind, DEFAULT_SUPPORTED_KINDS};
use std::collections::BTreeSet;

/// Names under which per-row metadata is exposed as properties
pub const META_PROPERTY_NAMES: [&str; 5] = [
    "ID",
    "Created Time",
    "Last Edited Time",
    "Archived",
    "In Trash",
];

/// Caller-specified restriction on which properties are extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFilter {
    /// Property names to extract (empty = all)
    property_names: BTreeSet<String>,
    /// Kinds eligible for extraction
    supported_kinds: BTreeSet<PropertyKind>,
}

impl Default for SchemaFilter {
    fn default() -> Self {
        Self {
            property_names: BTreeSet::new(),
            supported_kinds: DEFAULT_SUPPORTED_KINDS.into_iter().collect(),
        }
    }
}

impl SchemaFilter {
    /// Create a filter accepting every name and the default kinds
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: restrict to the given names
    #[must_use]
    pub fn with_property_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: replace the kind allowlist
    #[must_use]
    pub fn with_supported_kinds(mut self, kinds: impl IntoIterator<Item = PropertyKind>) -> Self {
        self.supported_kinds = kinds.into_iter().collect();
        self
    }

    /// Name filter in sorted order
    pub fn property_names(&self) -> &BTreeSet<String> {
        &self.property_names
    }

    /// Kind allowlist in sorted order
    pub fn supported_kinds(&self) -> &BTreeSet<PropertyKind> {
        &self.supported_kinds
    }

    /// Check whether a property name passes the name filter
    pub fn accepts_name(&self, name: &str) -> bool {
        self.property_names.is_empty() || self.property_names.contains(name)
    }

    /// Check whether a kind is on the allowlist
    pub fn supports(&self, kind: PropertyKind) -> bool {
        self.supported_kinds.contains(&kind)
    }

    /// Replace the name filter, returning true if it changed
    pub fn set_property_names(&mut self, names: BTreeSet<String>) -> bool {
        if names == self.property_names {
            return false;
        }
        self.property_names = names;
        true
    }

    /// Add one name to the filter, returning true if it was new
    pub fn add_property_name(&mut self, name: impl Into<String>) -> bool {
        self.property_names.insert(name.into())
    }

    /// Replace the kind allowlist, returning true if it changed
    pub fn set_supported_kinds(&mut self, kinds: BTreeSet<PropertyKind>) -> bool {
        if kinds == self.supported_kinds {
            return false;
        }
        self.supported_kinds = kinds;
        true
    }
}
