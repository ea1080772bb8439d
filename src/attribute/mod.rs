//! Attribute Value Tree: the runtime form of a SCIM resource instance.
//!
//! An [`Attribute`] is a tagged union over the three shapes the protocol
//! allows (simple, complex, multi-valued); a [`ScimResource`] maps top-level
//! attribute names to attributes and carries the schema URIs present on the
//! instance. Trees are plain owned values: cloning is structural and a tree
//! belongs to exactly one request/response cycle.

pub mod resource;
pub mod selection;
pub mod value;

pub use resource::ScimResource;
pub use selection::{AttributeSelection, ResolvedSelection, Visibility};
pub use value::{DATE_TIME_FORMAT, SimpleValue, format_date_time, parse_date_time};

use std::collections::BTreeMap;

/// Sub-attribute name -> value mapping of a complex attribute.
pub type ComplexValue = BTreeMap<String, Attribute>;

/// An attribute instance bound to one attribute schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// One scalar of the schema's declared type
    Simple(SimpleValue),
    /// Sub-attribute values keyed by sub-attribute name
    Complex(ComplexValue),
    /// Ordered simple or complex elements
    MultiValued(Vec<Attribute>),
}

impl Attribute {
    /// Shorthand for a simple string attribute.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Simple(SimpleValue::String(value.into()))
    }

    /// Shorthand for a complex attribute built from `(name, value)` pairs.
    pub fn complex<I, K>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        Self::Complex(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_simple(&self) -> Option<&SimpleValue> {
        match self {
            Self::Simple(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexValue> {
        match self {
            Self::Complex(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_complex_mut(&mut self) -> Option<&mut ComplexValue> {
        match self {
            Self::Complex(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_multi(&self) -> Option<&[Attribute]> {
        match self {
            Self::MultiValued(values) => Some(values),
            _ => None,
        }
    }

    /// Text of a simple string or reference value.
    pub fn as_str(&self) -> Option<&str> {
        self.as_simple().and_then(SimpleValue::as_str)
    }

    /// Sub-attribute of a complex value, matched case-insensitively.
    pub fn sub(&self, name: &str) -> Option<&Attribute> {
        self.as_complex().and_then(|members| lookup(members, name))
    }

    /// Whether this complex element carries `primary = true`.
    pub fn is_primary(&self) -> bool {
        self.sub("primary")
            .and_then(Attribute::as_simple)
            .and_then(SimpleValue::as_bool)
            .unwrap_or(false)
    }

    /// Whether the attribute counts as absent for `required` checks.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Simple(value) => value.is_empty(),
            Self::Complex(members) => members.values().all(Attribute::is_empty),
            Self::MultiValued(values) => values.is_empty(),
        }
    }
}

/// Case-insensitive lookup in a name -> attribute map.
pub(crate) fn lookup<'a>(map: &'a ComplexValue, name: &str) -> Option<&'a Attribute> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Case-insensitive key resolution in a name -> attribute map.
pub(crate) fn lookup_key(map: &ComplexValue, name: &str) -> Option<String> {
    map.keys().find(|key| key.eq_ignore_ascii_case(name)).cloned()
}
