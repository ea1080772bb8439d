//! Resource instances as attribute value trees.

use super::{Attribute, ComplexValue, SimpleValue, lookup, lookup_key};
use crate::schema::ResourceTypeSchema;

use std::collections::BTreeMap;

/// A resource instance: top-level attribute name -> attribute, plus the
/// schema URIs present on the instance.
///
/// Attributes of the primary schema live in [`attributes`](Self::attributes);
/// attributes of each asserted extension live under that extension's URI in
/// [`extensions`](Self::extensions).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScimResource {
    /// Short resource type name, e.g. `User`
    pub resource_type: String,
    /// Schema URIs present on the instance, primary first
    pub schemas: Vec<String>,
    /// Primary schema attributes
    pub attributes: ComplexValue,
    /// Extension URI -> extension attributes
    pub extensions: BTreeMap<String, ComplexValue>,
}

impl ScimResource {
    /// Create an empty tree for `resource_type`, tagged with its primary schema.
    pub fn new(resource_type: &ResourceTypeSchema) -> Self {
        Self {
            resource_type: resource_type.name.clone(),
            schemas: vec![resource_type.schema.clone()],
            attributes: BTreeMap::new(),
            extensions: BTreeMap::new(),
        }
    }

    /// Resource identifier, once a manager has assigned one.
    pub fn id(&self) -> Option<&str> {
        self.get("id").and_then(Attribute::as_str)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set("id", Attribute::string(id));
    }

    /// Top-level primary attribute, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        lookup(&self.attributes, name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        let key = lookup_key(&self.attributes, name)?;
        self.attributes.get_mut(&key)
    }

    /// Set a top-level primary attribute, replacing any existing value.
    pub fn set(&mut self, name: impl Into<String>, value: Attribute) {
        let name = name.into();
        if let Some(existing) = lookup_key(&self.attributes, &name) {
            self.attributes.remove(&existing);
        }
        self.attributes.insert(name, value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        let key = lookup_key(&self.attributes, name)?;
        self.attributes.remove(&key)
    }

    /// Attributes of an asserted extension, matched case-insensitively.
    pub fn extension(&self, uri: &str) -> Option<&ComplexValue> {
        self.extensions
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(uri))
            .map(|(_, attrs)| attrs)
    }

    /// Attributes of an extension, asserting the extension if it is absent.
    pub fn extension_mut(&mut self, uri: &str) -> &mut ComplexValue {
        let key = self
            .extensions
            .keys()
            .find(|key| key.eq_ignore_ascii_case(uri))
            .cloned()
            .unwrap_or_else(|| uri.to_string());
        self.add_schema(&key);
        self.extensions.entry(key).or_default()
    }

    /// Drop an extension and its schema URI from the instance.
    pub fn remove_extension(&mut self, uri: &str) {
        self.extensions.retain(|key, _| !key.eq_ignore_ascii_case(uri));
        self.schemas.retain(|schema| !schema.eq_ignore_ascii_case(uri));
    }

    /// Record a schema URI as present, ignoring duplicates.
    pub fn add_schema(&mut self, uri: &str) {
        if !self.has_schema(uri) {
            self.schemas.push(uri.to_string());
        }
    }

    pub fn has_schema(&self, uri: &str) -> bool {
        self.schemas.iter().any(|s| s.eq_ignore_ascii_case(uri))
    }

    /// A `meta` sub-attribute value.
    pub fn meta(&self, name: &str) -> Option<&SimpleValue> {
        self.get("meta")
            .and_then(|meta| meta.sub(name))
            .and_then(Attribute::as_simple)
    }

    /// Set a `meta` sub-attribute, creating `meta` as needed.
    pub fn set_meta(&mut self, name: &str, value: SimpleValue) {
        if !matches!(self.get("meta"), Some(Attribute::Complex(_))) {
            self.set("meta", Attribute::Complex(BTreeMap::new()));
        }
        if let Some(meta) = self.get_mut("meta").and_then(Attribute::as_complex_mut) {
            if let Some(existing) = lookup_key(meta, name) {
                meta.remove(&existing);
            }
            meta.insert(name.to_string(), Attribute::Simple(value));
        }
    }

    /// Canonical location recorded in `meta.location`.
    pub fn location(&self) -> Option<&str> {
        self.meta("location").and_then(SimpleValue::as_str)
    }

    /// Version recorded in `meta.version`.
    pub fn version(&self) -> Option<&str> {
        self.meta("version").and_then(SimpleValue::as_str)
    }
}
