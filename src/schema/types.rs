//! Core schema type definitions for SCIM resources.
//!
//! This module contains the fundamental data structures that define SCIM schemas,
//! attribute definitions, and their characteristics as specified in RFC 7643.
//! All of them are built once at startup and shared read-only afterwards.

use serde::{Deserialize, Serialize};

/// A SCIM schema definition.
///
/// Represents a complete schema with its metadata and attribute definitions,
/// either a core schema (User, Group) or an extension schema layered onto one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URI)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    /// Schema description
    #[serde(default)]
    pub description: String,
    /// List of attribute definitions, in declaration order
    pub attributes: Vec<AttributeSchema>,
}

impl Schema {
    /// Find a top-level attribute by name, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Derive the canonical URI of every attribute node from the schema id.
    ///
    /// Top-level attributes become `schemaUri:name`, sub-attributes
    /// `schemaUri:name.sub`, and so on down the tree.
    pub(crate) fn assign_uris(&mut self) {
        for attr in &mut self.attributes {
            attr.assign_uri(format!("{}:{}", self.id, attr.name));
        }
    }
}

/// Definition of a SCIM attribute.
///
/// Defines all policy axes of an attribute: type, multiplicity, mutability,
/// uniqueness, return visibility and case sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    /// Attribute name
    pub name: String,
    /// Canonical attribute URI, derived from the owning schema
    #[serde(skip)]
    pub uri: String,
    /// Data type of the attribute
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Whether this attribute can have multiple values
    #[serde(default)]
    pub multi_valued: bool,
    /// Attribute description
    #[serde(default)]
    pub description: String,
    /// Whether this attribute is required
    #[serde(default)]
    pub required: bool,
    /// Whether string comparison is case-sensitive
    #[serde(default)]
    pub case_exact: bool,
    /// Mutability characteristics
    #[serde(default)]
    pub mutability: Mutability,
    /// How the attribute is returned in responses
    #[serde(default)]
    pub returned: Returned,
    /// Uniqueness constraints
    #[serde(default)]
    pub uniqueness: Uniqueness,
    /// Allowed values for string attributes
    #[serde(default)]
    pub canonical_values: Vec<String>,
    /// Resource types a reference attribute may point to
    #[serde(default)]
    pub reference_types: Vec<String>,
    /// Sub-attributes for complex types
    #[serde(default)]
    pub sub_attributes: Vec<AttributeSchema>,
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self {
            name: String::new(),
            uri: String::new(),
            data_type: DataType::String,
            multi_valued: false,
            description: String::new(),
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            returned: Returned::Default,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            reference_types: Vec::new(),
            sub_attributes: Vec::new(),
        }
    }
}

impl AttributeSchema {
    /// Find a sub-attribute by name, case-insensitively.
    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.sub_attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Whether the attribute holds sub-attributes rather than a scalar.
    pub fn is_complex(&self) -> bool {
        self.data_type == DataType::Complex
    }

    /// Whether clients may never change the stored value once it exists.
    pub fn is_protected(&self) -> bool {
        matches!(self.mutability, Mutability::ReadOnly | Mutability::Immutable)
    }

    fn assign_uri(&mut self, uri: String) {
        for sub in &mut self.sub_attributes {
            sub.assign_uri(format!("{}.{}", uri, sub.name));
        }
        self.uri = uri;
    }
}

/// SCIM attribute data types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    /// String value
    #[default]
    String,
    /// Boolean value
    Boolean,
    /// Decimal number
    Decimal,
    /// Integer number
    Integer,
    /// DateTime in the engine's fixed ISO-8601 profile
    DateTime,
    /// Binary data (base64 encoded on the wire)
    Binary,
    /// URI reference
    Reference,
    /// Complex attribute with sub-attributes
    Complex,
}

impl DataType {
    /// Protocol name of the type, as used in schema documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Decimal => "decimal",
            Self::Integer => "integer",
            Self::DateTime => "dateTime",
            Self::Binary => "binary",
            Self::Reference => "reference",
            Self::Complex => "complex",
        }
    }
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Read-only attribute (managed by server)
    ReadOnly,
    /// Read-write attribute (can be modified by clients)
    #[default]
    ReadWrite,
    /// Immutable attribute (set once, never modified)
    Immutable,
    /// Write-only attribute (passwords, etc.)
    WriteOnly,
}

/// When an attribute appears in responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Returned {
    /// Always returned, regardless of requested attributes
    Always,
    /// Never returned
    Never,
    /// Returned unless the caller narrows the attribute set
    #[default]
    Default,
    /// Returned only when explicitly requested
    Request,
}

/// Attribute uniqueness constraints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    /// No uniqueness constraint
    #[default]
    None,
    /// Unique within the server
    Server,
    /// Globally unique
    Global,
}

/// An extension schema attached to a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaExtension {
    /// Extension schema URI
    pub schema: String,
    /// Whether resources of this type must carry the extension
    pub required: bool,
}

/// Description of one resource type (User, Group, ...).
///
/// Holds the primary schema's top-level attributes in declaration order plus
/// the extension schemas layered onto the type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceTypeSchema {
    /// Short name, e.g. `User`
    pub name: String,
    /// Endpoint path, e.g. `/Users`
    pub endpoint: String,
    /// Human-readable description
    pub description: String,
    /// Primary schema URI
    pub schema: String,
    /// Top-level attributes of the primary schema
    pub attributes: Vec<AttributeSchema>,
    /// Extension schemas, in registration order
    pub extensions: Vec<SchemaExtension>,
}

impl ResourceTypeSchema {
    /// Build a resource type whose attributes come from `schema`.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, schema: &Schema) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            description: schema.description.clone(),
            schema: schema.id.clone(),
            attributes: schema.attributes.clone(),
            extensions: Vec::new(),
        }
    }

    /// Find a top-level attribute of the primary schema, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSchema> {
        self.attributes
            .iter()
            .find(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Find an attached extension by URI, case-insensitively.
    pub fn extension(&self, uri: &str) -> Option<&SchemaExtension> {
        self.extensions
            .iter()
            .find(|ext| ext.schema.eq_ignore_ascii_case(uri))
    }
}
