//! Schema registry for loading, managing, and resolving SCIM schemas.
//!
//! The registry is built once at startup (embedded core schemas plus any
//! extensions the host registers) and then shared read-only, typically behind
//! an `Arc`, by every codec, validator, filter parser and bulk processor.

use super::embedded;
use super::types::{AttributeSchema, ResourceTypeSchema, Schema, SchemaExtension};
use crate::error::{ScimError, ScimResult};

use log::debug;
use std::collections::HashMap;

/// Deepest attribute nesting the protocol allows: attribute, sub-attribute,
/// sub-sub-attribute.
const MAX_ATTRIBUTE_DEPTH: usize = 3;

/// Registry of schemas and resource types.
///
/// All lookups are pure; the `&mut self` methods exist only for initialization.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    // lowercase schema URI -> schema
    schemas: HashMap<String, Schema>,
    resource_types: Vec<ResourceTypeSchema>,
}

/// An attribute resolved against a resource type, with its ancestry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAttribute<'a> {
    /// URI of the schema declaring the top-level attribute
    pub schema_uri: &'a str,
    /// Whether that schema is an extension of the resource type
    pub extension: bool,
    /// Top-level attribute
    pub top: &'a AttributeSchema,
    /// Sub-attribute, when the path names one
    pub sub: Option<&'a AttributeSchema>,
    /// Sub-sub-attribute, when the path names one
    pub sub_sub: Option<&'a AttributeSchema>,
}

impl<'a> ResolvedAttribute<'a> {
    /// The innermost attribute named by the path.
    pub fn attribute(&self) -> &'a AttributeSchema {
        self.sub_sub.or(self.sub).unwrap_or(self.top)
    }

    /// The attribute enclosing [`attribute`](Self::attribute), if any.
    pub fn parent(&self) -> Option<&'a AttributeSchema> {
        match (self.sub, self.sub_sub) {
            (Some(sub), Some(_)) => Some(sub),
            (Some(_), None) => Some(self.top),
            _ => None,
        }
    }
}

impl SchemaRegistry {
    /// Create a registry with the embedded core schemas.
    ///
    /// Registers the `User` (with the optional Enterprise User extension),
    /// `Group` and `ResourceType` resource types.
    pub fn new() -> ScimResult<Self> {
        let mut registry = Self::empty();

        let user = Self::load_schema_from_str(embedded::core_user_schema())?;
        let group = Self::load_schema_from_str(embedded::core_group_schema())?;
        let resource_type = Self::load_schema_from_str(embedded::resource_type_schema())?;
        let enterprise = Self::load_schema_from_str(embedded::enterprise_user_schema())?;

        registry.add_schema(user)?;
        registry.add_schema(group)?;
        registry.add_schema(resource_type)?;

        registry.register_resource_type("User", "/Users", embedded::USER_SCHEMA)?;
        registry.register_resource_type("Group", "/Groups", embedded::GROUP_SCHEMA)?;
        registry.register_resource_type(
            "ResourceType",
            "/ResourceTypes",
            embedded::RESOURCE_TYPE_SCHEMA,
        )?;
        registry.register_extension("User", enterprise, false)?;

        Ok(registry)
    }

    /// Create a registry with no schemas at all.
    pub fn empty() -> Self {
        Self {
            schemas: HashMap::new(),
            resource_types: Vec::new(),
        }
    }

    /// Load a schema from a JSON string, deriving attribute URIs.
    pub fn load_schema_from_str(content: &str) -> ScimResult<Schema> {
        let mut schema: Schema = serde_json::from_str(content)
            .map_err(|e| ScimError::internal(format!("Failed to load schema: {}", e)))?;
        schema.assign_uris();
        Ok(schema)
    }

    /// Add a schema to the registry. Re-adding a URI replaces the schema.
    pub fn add_schema(&mut self, mut schema: Schema) -> ScimResult<()> {
        for attr in &schema.attributes {
            check_depth(attr, 1)?;
        }
        schema.assign_uris();
        debug!("Registering schema {}", schema.id);
        self.schemas.insert(schema.id.to_lowercase(), schema);
        Ok(())
    }

    /// Register a resource type backed by an already added primary schema.
    pub fn register_resource_type(
        &mut self,
        name: &str,
        endpoint: &str,
        schema_uri: &str,
    ) -> ScimResult<()> {
        let schema = self
            .schema(schema_uri)
            .ok_or_else(|| ScimError::internal(format!("Unknown schema: {}", schema_uri)))?;
        let resource_type = ResourceTypeSchema::new(name, endpoint, schema);

        self.resource_types
            .retain(|rt| !rt.name.eq_ignore_ascii_case(name));
        self.resource_types.push(resource_type);
        Ok(())
    }

    /// Attach an extension schema to a resource type.
    ///
    /// Idempotent by URI: attaching the same extension twice keeps the first
    /// registration.
    pub fn register_extension(
        &mut self,
        resource_type: &str,
        schema: Schema,
        required: bool,
    ) -> ScimResult<()> {
        let uri = schema.id.clone();
        let index = self
            .resource_types
            .iter()
            .position(|rt| rt.name.eq_ignore_ascii_case(resource_type))
            .ok_or_else(|| {
                ScimError::internal(format!("Unknown resource type: {}", resource_type))
            })?;

        if self.resource_types[index].extension(&uri).is_some() {
            return Ok(());
        }

        if self.schema(&uri).is_none() {
            self.add_schema(schema)?;
        }
        self.resource_types[index].extensions.push(SchemaExtension {
            schema: uri,
            required,
        });
        Ok(())
    }

    /// Get all registered schemas.
    pub fn schemas(&self) -> Vec<&Schema> {
        self.schemas.values().collect()
    }

    /// Get a schema by URI, case-insensitively.
    pub fn schema(&self, uri: &str) -> Option<&Schema> {
        self.schemas.get(&uri.to_lowercase())
    }

    /// Get all registered resource types, in registration order.
    pub fn resource_types(&self) -> &[ResourceTypeSchema] {
        &self.resource_types
    }

    /// Look up a resource type by short name or primary schema URI.
    pub fn resource_type(&self, name_or_uri: &str) -> Option<&ResourceTypeSchema> {
        self.resource_types.iter().find(|rt| {
            rt.name.eq_ignore_ascii_case(name_or_uri) || rt.schema.eq_ignore_ascii_case(name_or_uri)
        })
    }

    /// Look up a resource type by endpoint path segment (`/Users` or `Users`).
    pub fn resource_type_for_endpoint(&self, endpoint: &str) -> Option<&ResourceTypeSchema> {
        let wanted = endpoint.trim_start_matches('/');
        self.resource_types
            .iter()
            .find(|rt| rt.endpoint.trim_start_matches('/').eq_ignore_ascii_case(wanted))
    }

    /// Get the core User resource type.
    pub fn user_schema(&self) -> Option<&ResourceTypeSchema> {
        self.resource_type(embedded::USER_SCHEMA)
    }

    /// Get the core Group resource type.
    pub fn group_schema(&self) -> Option<&ResourceTypeSchema> {
        self.resource_type(embedded::GROUP_SCHEMA)
    }

    /// Get an extension schema attached to `resource_type`.
    pub fn extension_schema(
        &self,
        resource_type: &ResourceTypeSchema,
        uri: &str,
    ) -> Option<&Schema> {
        resource_type
            .extension(uri)
            .and_then(|ext| self.schema(&ext.schema))
    }

    /// Resolve a name, dotted path or full URI to its attribute schema.
    ///
    /// Matching is case-insensitive. Unqualified names are looked up in the
    /// primary schema first and then in each extension, in registration order.
    pub fn resolve_attribute(
        &self,
        name_or_uri: &str,
        resource_type: &ResourceTypeSchema,
    ) -> ScimResult<&AttributeSchema> {
        self.resolve_path(name_or_uri, resource_type)
            .map(|resolved| resolved.attribute())
    }

    /// Resolve a name, dotted path or full URI, keeping the attribute ancestry.
    pub fn resolve_path<'a>(
        &'a self,
        name_or_uri: &str,
        resource_type: &ResourceTypeSchema,
    ) -> ScimResult<ResolvedAttribute<'a>> {
        let path = name_or_uri.trim();

        if let Some((schema, rest, extension)) = self.split_schema_prefix(path, resource_type) {
            return resolve_in(schema, rest, extension).ok_or_else(|| ScimError::unresolved(path));
        }

        let primary = self
            .schema(&resource_type.schema)
            .ok_or_else(|| ScimError::internal(format!("Unknown schema: {}", resource_type.schema)))?;
        if let Some(resolved) = resolve_in(primary, path, false) {
            return Ok(resolved);
        }

        resource_type
            .extensions
            .iter()
            .filter_map(|ext| self.schema(&ext.schema))
            .find_map(|schema| resolve_in(schema, path, true))
            .ok_or_else(|| ScimError::unresolved(path))
    }

    /// Resolve `name` as a sub-attribute of `parent`.
    pub fn resolve_sub_attribute<'a>(
        &self,
        parent: &'a AttributeSchema,
        name: &str,
    ) -> ScimResult<&'a AttributeSchema> {
        parent
            .sub_attribute(name)
            .ok_or_else(|| ScimError::unresolved(format!("{}.{}", parent.name, name)))
    }

    /// Split a `urn:...:Schema:attr.sub` path into schema and attribute path.
    fn split_schema_prefix<'a, 'p>(
        &'a self,
        path: &'p str,
        resource_type: &ResourceTypeSchema,
    ) -> Option<(&'a Schema, &'p str, bool)> {
        let lower = path.to_lowercase();
        let candidates = std::iter::once((resource_type.schema.as_str(), false)).chain(
            resource_type
                .extensions
                .iter()
                .map(|ext| (ext.schema.as_str(), true)),
        );

        candidates
            .filter(|(uri, _)| {
                let uri = uri.to_lowercase();
                lower.len() > uri.len() + 1
                    && lower.starts_with(&uri)
                    && lower.as_bytes()[uri.len()] == b':'
            })
            .max_by_key(|(uri, _)| uri.len())
            .and_then(|(uri, extension)| {
                self.schema(uri)
                    .map(|schema| (schema, &path[uri.len() + 1..], extension))
            })
    }
}

fn resolve_in<'a>(schema: &'a Schema, path: &str, extension: bool) -> Option<ResolvedAttribute<'a>> {
    let mut segments = path.split('.');
    let top = schema.attribute(segments.next()?)?;
    let sub = match segments.next() {
        Some(name) => Some(top.sub_attribute(name)?),
        None => None,
    };
    let sub_sub = match (sub, segments.next()) {
        (Some(sub), Some(name)) => Some(sub.sub_attribute(name)?),
        _ => None,
    };
    if segments.next().is_some() {
        return None;
    }

    Some(ResolvedAttribute {
        schema_uri: &schema.id,
        extension,
        top,
        sub,
        sub_sub,
    })
}

fn check_depth(attr: &AttributeSchema, depth: usize) -> ScimResult<()> {
    if depth > MAX_ATTRIBUTE_DEPTH {
        return Err(ScimError::internal(format!(
            "Attribute '{}' is nested deeper than {} levels",
            attr.name, MAX_ATTRIBUTE_DEPTH
        )));
    }
    for sub in &attr.sub_attributes {
        check_depth(sub, depth + 1)?;
    }
    Ok(())
}
