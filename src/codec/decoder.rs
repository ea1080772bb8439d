//! Wire JSON -> attribute value tree.

use crate::attribute::{Attribute, ComplexValue, ScimResource, SimpleValue, parse_date_time};
use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeSchema, DataType, ResourceTypeSchema, Schema, SchemaRegistry};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::debug;
use serde_json::{Map, Value};

/// Schema-guided JSON decoder.
#[derive(Debug, Clone, Copy)]
pub struct JsonDecoder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> JsonDecoder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Decode a JSON document into a fresh tree for `resource_type`.
    pub fn decode(&self, json: &str, resource_type: &ResourceTypeSchema) -> ScimResult<ScimResource> {
        let value: Value = serde_json::from_str(json)?;
        self.decode_value(&value, resource_type)
    }

    /// Decode an already parsed JSON value into a fresh tree.
    pub fn decode_value(
        &self,
        value: &Value,
        resource_type: &ResourceTypeSchema,
    ) -> ScimResult<ScimResource> {
        let mut tree = ScimResource::new(resource_type);
        self.decode_into(value, resource_type, &mut tree)?;
        Ok(tree)
    }

    /// Decode `value` into `target`, replacing attributes it names.
    ///
    /// The document must carry a `schemas` array naming the resource type's
    /// primary schema. Members naming a registered extension URI are decoded
    /// as that extension's attributes; other `urn:` members that resolve to no
    /// attribute are rejected; remaining unknown members are ignored.
    pub fn decode_into(
        &self,
        value: &Value,
        resource_type: &ResourceTypeSchema,
        target: &mut ScimResource,
    ) -> ScimResult<()> {
        let object = value
            .as_object()
            .ok_or_else(|| ScimError::invalid_syntax("Resource must be a JSON object"))?;

        let schemas = schema_uris(object)?;
        if !schemas.iter().any(|s| s.eq_ignore_ascii_case(&resource_type.schema)) {
            return Err(ScimError::invalid_syntax(format!(
                "'schemas' must contain '{}'",
                resource_type.schema
            )));
        }

        let primary = self
            .registry
            .schema(&resource_type.schema)
            .ok_or_else(|| ScimError::internal(format!("Unknown schema: {}", resource_type.schema)))?;

        for (key, member) in object {
            if key == "schemas" || member.is_null() {
                continue;
            }

            if let Some(extension) = self.registry.extension_schema(resource_type, key) {
                let members = member.as_object().ok_or_else(|| {
                    ScimError::invalid_syntax(format!("Extension '{}' must be a JSON object", key))
                })?;
                let attrs = target.extension_mut(&extension.id);
                decode_members(extension, members, attrs)?;
                continue;
            }

            if key.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("urn:")) {
                self.decode_qualified(key, member, resource_type, target)?;
                continue;
            }

            match primary.attribute(key) {
                Some(attr) => insert(&mut target.attributes, attr, member)?,
                None => debug!("Ignoring unknown attribute '{}'", key),
            }
        }

        for uri in schemas {
            if self.registry.extension_schema(resource_type, &uri).is_some() {
                target.extension_mut(&uri);
            }
        }
        Ok(())
    }

    // `urn:...:Schema:attr` member naming a single top-level attribute
    fn decode_qualified(
        &self,
        key: &str,
        member: &Value,
        resource_type: &ResourceTypeSchema,
        target: &mut ScimResource,
    ) -> ScimResult<()> {
        let resolved = self
            .registry
            .resolve_path(key, resource_type)
            .ok()
            .filter(|r| r.sub.is_none())
            .ok_or_else(|| {
                ScimError::invalid_syntax(format!("'{}' is not a registered schema extension", key))
            })?;

        let attrs = if resolved.extension {
            target.extension_mut(resolved.schema_uri)
        } else {
            &mut target.attributes
        };
        insert(attrs, resolved.top, member)
    }
}

fn schema_uris(object: &Map<String, Value>) -> ScimResult<Vec<String>> {
    let schemas = object
        .get("schemas")
        .and_then(Value::as_array)
        .ok_or_else(|| ScimError::invalid_syntax("Missing 'schemas' array"))?;

    schemas
        .iter()
        .map(|s| {
            s.as_str()
                .map(String::from)
                .ok_or_else(|| ScimError::invalid_syntax("'schemas' entries must be strings"))
        })
        .collect()
}

fn decode_members(schema: &Schema, members: &Map<String, Value>, attrs: &mut ComplexValue) -> ScimResult<()> {
    for (key, member) in members {
        if member.is_null() {
            continue;
        }
        match schema.attribute(key) {
            Some(attr) => insert(attrs, attr, member)?,
            None => debug!("Ignoring unknown attribute '{}' in {}", key, schema.id),
        }
    }
    Ok(())
}

// decode and store under the schema's canonical name; empty values are dropped
fn insert(attrs: &mut ComplexValue, attr: &AttributeSchema, value: &Value) -> ScimResult<()> {
    if let Some(existing) = attrs.keys().find(|k| k.eq_ignore_ascii_case(&attr.name)).cloned() {
        attrs.remove(&existing);
    }
    if let Some(decoded) = decode_attribute(attr, value)? {
        attrs.insert(attr.name.clone(), decoded);
    }
    Ok(())
}

/// Decode one attribute value, honoring multiplicity and type.
pub(crate) fn decode_attribute(attr: &AttributeSchema, value: &Value) -> ScimResult<Option<Attribute>> {
    if value.is_null() {
        return Ok(None);
    }
    if !attr.multi_valued {
        return decode_single(attr, value);
    }

    let items = match value {
        Value::Array(items) => items.as_slice(),
        single => std::slice::from_ref(single),
    };
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        if item.is_array() {
            return Err(ScimError::invalid_syntax(format!(
                "Nested arrays are not allowed in '{}'",
                attr.name
            )));
        }
        if let Some(decoded) = decode_single(attr, item)? {
            values.push(decoded);
        }
    }

    if values.iter().filter(|v| v.is_primary()).count() > 1 {
        return Err(ScimError::invalid_value(format!(
            "At most one value of '{}' may be primary",
            attr.name
        )));
    }
    Ok((!values.is_empty()).then_some(Attribute::MultiValued(values)))
}

fn decode_single(attr: &AttributeSchema, value: &Value) -> ScimResult<Option<Attribute>> {
    if value.is_null() {
        return Ok(None);
    }
    if attr.is_complex() {
        let members = value.as_object().ok_or_else(|| {
            ScimError::invalid_syntax(format!("'{}' must be a JSON object", attr.name))
        })?;
        let mut complex = ComplexValue::new();
        for (key, member) in members {
            match attr.sub_attribute(key) {
                Some(sub) => insert(&mut complex, sub, member)?,
                None => debug!("Ignoring unknown sub-attribute '{}.{}'", attr.name, key),
            }
        }
        return Ok((!complex.is_empty()).then_some(Attribute::Complex(complex)));
    }
    if value.is_array() || value.is_object() {
        return Err(ScimError::invalid_syntax(format!(
            "'{}' must be a single {} value",
            attr.name,
            attr.data_type.as_str()
        )));
    }
    decode_simple(attr, value).map(|v| Some(Attribute::Simple(v)))
}

fn decode_simple(attr: &AttributeSchema, value: &Value) -> ScimResult<SimpleValue> {
    let mismatch = || {
        ScimError::invalid_value(format!(
            "'{}' must be of type {}",
            attr.name,
            attr.data_type.as_str()
        ))
    };

    match attr.data_type {
        DataType::String => value
            .as_str()
            .map(|s| SimpleValue::String(s.trim().to_string()))
            .ok_or_else(mismatch),
        DataType::Boolean => value.as_bool().map(SimpleValue::Boolean).ok_or_else(mismatch),
        DataType::Integer => match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(SimpleValue::Integer)
        .ok_or_else(mismatch),
        DataType::Decimal => match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .map(SimpleValue::Decimal)
        .ok_or_else(mismatch),
        DataType::DateTime => {
            let text = value.as_str().ok_or_else(mismatch)?;
            parse_date_time(text.trim()).map(SimpleValue::DateTime)
        }
        DataType::Binary => {
            let text = value.as_str().ok_or_else(mismatch)?;
            STANDARD
                .decode(text.trim())
                .map(SimpleValue::Binary)
                .map_err(|e| ScimError::invalid_value(format!("'{}' is not valid base64: {}", attr.name, e)))
        }
        DataType::Reference => value
            .as_str()
            .map(|s| SimpleValue::Reference(s.to_string()))
            .ok_or_else(mismatch),
        DataType::Complex => Err(ScimError::internal(format!(
            "Complex attribute '{}' reached scalar decoding",
            attr.name
        ))),
    }
}
