//! Attribute value tree -> wire JSON.

use crate::attribute::{
    Attribute, AttributeSelection, ComplexValue, ResolvedSelection, ScimResource, SimpleValue,
    Visibility, format_date_time, lookup,
};
use crate::error::{ScimError, ScimResult};
use crate::schema::{AttributeSchema, SchemaRegistry};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Map, Number, Value};

/// Schema-guided JSON encoder.
#[derive(Debug, Clone, Copy)]
pub struct JsonEncoder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> JsonEncoder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Encode a tree to JSON text.
    pub fn encode(&self, tree: &ScimResource, selection: &AttributeSelection) -> ScimResult<String> {
        let value = self.encode_value(tree, selection)?;
        serde_json::to_string(&value)
            .map_err(|e| ScimError::internal(format!("Failed to serialize resource: {}", e)))
    }

    /// Encode a tree to a JSON value.
    ///
    /// `schemas` comes first, then primary attributes in schema declaration
    /// order, then one nested object per non-empty extension keyed by its URI.
    /// `returned: never` attributes are never emitted; `returned: request`
    /// attributes only when `selection` names them.
    pub fn encode_value(&self, tree: &ScimResource, selection: &AttributeSelection) -> ScimResult<Value> {
        let resource_type = self.registry.tree_resource_type(tree)?;
        let primary = self.registry.primary_schema(resource_type)?;
        let selection = selection.resolve(self.registry, resource_type);

        let mut object = Map::new();
        object.insert(
            "schemas".to_string(),
            Value::Array(tree.schemas.iter().cloned().map(Value::String).collect()),
        );
        encode_members(&primary.attributes, &tree.attributes, &selection, &mut object)?;

        for ext in &resource_type.extensions {
            let (Some(schema), Some(attrs)) = (self.registry.schema(&ext.schema), tree.extension(&ext.schema))
            else {
                continue;
            };
            let mut members = Map::new();
            encode_members(&schema.attributes, attrs, &selection, &mut members)?;
            if !members.is_empty() {
                object.insert(schema.id.clone(), Value::Object(members));
            }
        }
        Ok(Value::Object(object))
    }
}

fn encode_members(
    schemas: &[AttributeSchema],
    attrs: &ComplexValue,
    selection: &ResolvedSelection,
    out: &mut Map<String, Value>,
) -> ScimResult<()> {
    for attr in schemas {
        let Some(value) = lookup(attrs, &attr.name) else {
            continue;
        };
        let visibility = selection.visibility(attr);
        if visibility == Visibility::Hidden {
            continue;
        }
        if let Some(encoded) = encode_attribute(attr, value, selection, visibility)? {
            out.insert(attr.name.clone(), encoded);
        }
    }
    Ok(())
}

fn encode_attribute(
    attr: &AttributeSchema,
    value: &Attribute,
    selection: &ResolvedSelection,
    visibility: Visibility,
) -> ScimResult<Option<Value>> {
    match value {
        Attribute::Simple(simple) => encode_simple(simple).map(Some),
        Attribute::Complex(members) => {
            let mut object = Map::new();
            for sub in &attr.sub_attributes {
                let Some(member) = lookup(members, &sub.name) else {
                    continue;
                };
                let sub_visibility = match (visibility, selection.visibility(sub)) {
                    (_, Visibility::Hidden) => continue,
                    (Visibility::Full, _) => Visibility::Full,
                    (_, v) => v,
                };
                if let Some(encoded) = encode_attribute(sub, member, selection, sub_visibility)? {
                    object.insert(sub.name.clone(), encoded);
                }
            }
            Ok((!object.is_empty()).then_some(Value::Object(object)))
        }
        Attribute::MultiValued(items) => {
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                if let Some(encoded) = encode_attribute(attr, item, selection, visibility)? {
                    array.push(encoded);
                }
            }
            Ok((!array.is_empty()).then_some(Value::Array(array)))
        }
    }
}

fn encode_simple(value: &SimpleValue) -> ScimResult<Value> {
    Ok(match value {
        SimpleValue::String(s) | SimpleValue::Reference(s) => Value::String(s.clone()),
        SimpleValue::Boolean(b) => Value::Bool(*b),
        SimpleValue::Integer(i) => Value::Number((*i).into()),
        SimpleValue::Decimal(d) => Number::from_f64(*d)
            .map(Value::Number)
            .ok_or_else(|| ScimError::internal(format!("Decimal value {} is not finite", d)))?,
        SimpleValue::DateTime(dt) => Value::String(format_date_time(dt)),
        SimpleValue::Binary(bytes) => Value::String(STANDARD.encode(bytes)),
    })
}
