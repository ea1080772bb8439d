//! Schema validation logic for SCIM resources.
//!
//! Validators operate on attribute value trees, never on wire JSON, and
//! enforce the mutability, required and returned contracts at the three
//! resource boundaries: create, update and retrieve.

use super::registry::SchemaRegistry;
use super::types::{AttributeSchema, DataType, Mutability, ResourceTypeSchema, Returned, Schema};
use crate::attribute::{Attribute, ComplexValue, ScimResource, SimpleValue, lookup};
use crate::error::{ScimError, ScimResult};

use log::debug;

/// The boundary a tree is crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationContext {
    /// Client payload about to be handed to a manager's `create`
    Create,
    /// Client payload replacing a stored resource
    Update,
    /// Manager result about to be encoded
    Retrieve,
}

impl SchemaRegistry {
    /// Run the validator for `context` over `tree`.
    ///
    /// `stored` is the current resource and is required for
    /// [`OperationContext::Update`]. Create drops client-supplied `readOnly`
    /// values first; update carries absent protected values over from `stored`
    /// first; retrieve strips `returned: never` values last.
    pub fn validate(
        &self,
        context: OperationContext,
        tree: &mut ScimResource,
        stored: Option<&ScimResource>,
    ) -> ScimResult<()> {
        match context {
            OperationContext::Create => {
                self.strip_read_only(tree)?;
                self.validate_create(tree)
            }
            OperationContext::Update => {
                let stored = stored.ok_or_else(|| {
                    ScimError::internal("Update validation requires the stored resource")
                })?;
                self.carry_protected(tree, stored)?;
                self.validate_update(tree, stored)
            }
            OperationContext::Retrieve => self.validate_retrieve(tree),
        }
    }

    /// Check that every required attribute is present and non-empty.
    ///
    /// Covers the primary schema, every required extension and every
    /// extension the tree asserts. Required sub-attributes are checked inside
    /// each present complex value.
    pub fn validate_create(&self, tree: &ScimResource) -> ScimResult<()> {
        let resource_type = self.tree_resource_type(tree)?;
        let primary = self.primary_schema(resource_type)?;
        check_required(&primary.attributes, &tree.attributes, "")?;

        for ext in &resource_type.extensions {
            let attrs = tree.extension(&ext.schema);
            if ext.required && (attrs.is_none() || !tree.has_schema(&ext.schema)) {
                return Err(ScimError::invalid_value(format!(
                    "Required extension '{}' is missing",
                    ext.schema
                )));
            }
            if let (Some(attrs), Some(schema)) = (attrs, self.schema(&ext.schema)) {
                check_required(&schema.attributes, attrs, &format!("{}:", schema.id))?;
            }
        }
        Ok(())
    }

    /// Check that no `readOnly` or `immutable` value differs from `stored`.
    ///
    /// Values absent from `tree` are not compared. `writeOnly` attributes are
    /// accepted as given and never compared. String comparison honors the
    /// attribute's `caseExact` flag. The required-attribute check of
    /// [`validate_create`](Self::validate_create) runs afterwards.
    pub fn validate_update(&self, tree: &ScimResource, stored: &ScimResource) -> ScimResult<()> {
        let resource_type = self.tree_resource_type(tree)?;
        let primary = self.primary_schema(resource_type)?;
        check_protected(&primary.attributes, &tree.attributes, Some(&stored.attributes))?;

        for (schema, attrs) in self.asserted_extensions(resource_type, tree) {
            let previous = stored.extension(&schema.id);
            check_protected(&schema.attributes, attrs, previous)?;
        }

        self.validate_create(tree)
    }

    /// Re-check required attributes, then strip `returned: never` values.
    pub fn validate_retrieve(&self, tree: &mut ScimResource) -> ScimResult<()> {
        self.validate_create(tree)?;

        let resource_type = self.tree_resource_type(tree)?;
        let primary = self.primary_schema(resource_type)?;
        strip(&mut tree.attributes, &primary.attributes, &|attr| {
            attr.returned == Returned::Never
        });
        for (uri, attrs) in tree.extensions.iter_mut() {
            if let Some(schema) = self.schema(uri) {
                strip(attrs, &schema.attributes, &|attr| attr.returned == Returned::Never);
            }
        }
        Ok(())
    }

    /// Drop client-supplied `readOnly` values before a create.
    pub fn strip_read_only(&self, tree: &mut ScimResource) -> ScimResult<()> {
        let resource_type = self.tree_resource_type(tree)?;
        let primary = self.primary_schema(resource_type)?;
        let read_only = |attr: &AttributeSchema| attr.mutability == Mutability::ReadOnly;

        strip(&mut tree.attributes, &primary.attributes, &read_only);
        for (uri, attrs) in tree.extensions.iter_mut() {
            if let Some(schema) = self.schema(uri) {
                strip(attrs, &schema.attributes, &read_only);
            }
        }
        Ok(())
    }

    /// Copy `readOnly`/`immutable` top-level values absent from `tree` over
    /// from `stored`, for the primary schema and every extension `stored`
    /// asserts.
    pub fn carry_protected(&self, tree: &mut ScimResource, stored: &ScimResource) -> ScimResult<()> {
        let resource_type = self.tree_resource_type(tree)?;
        let primary = self.primary_schema(resource_type)?;
        carry(&primary.attributes, &mut tree.attributes, &stored.attributes, "");

        for ext in &resource_type.extensions {
            let (Some(schema), Some(previous)) = (self.schema(&ext.schema), stored.extension(&ext.schema)) else {
                continue;
            };
            let missing = schema
                .attributes
                .iter()
                .filter(|attr| attr.is_protected() && lookup(previous, &attr.name).is_some())
                .any(|attr| tree.extension(&schema.id).is_none_or(|attrs| lookup(attrs, &attr.name).is_none()));
            if missing {
                let prefix = format!("{}:", schema.id);
                carry(&schema.attributes, tree.extension_mut(&schema.id), previous, &prefix);
            }
        }
        Ok(())
    }

    /// Resource type a tree is tagged with.
    pub(crate) fn tree_resource_type(&self, tree: &ScimResource) -> ScimResult<&ResourceTypeSchema> {
        self.resource_type(&tree.resource_type).ok_or_else(|| {
            ScimError::internal(format!("Unknown resource type: {}", tree.resource_type))
        })
    }

    pub(crate) fn primary_schema(&self, resource_type: &ResourceTypeSchema) -> ScimResult<&Schema> {
        self.schema(&resource_type.schema)
            .ok_or_else(|| ScimError::internal(format!("Unknown schema: {}", resource_type.schema)))
    }

    fn asserted_extensions<'a>(
        &'a self,
        resource_type: &ResourceTypeSchema,
        tree: &'a ScimResource,
    ) -> Vec<(&'a Schema, &'a ComplexValue)> {
        resource_type
            .extensions
            .iter()
            .filter_map(|ext| Some((self.schema(&ext.schema)?, tree.extension(&ext.schema)?)))
            .collect()
    }
}

fn carry(schemas: &[AttributeSchema], attrs: &mut ComplexValue, stored: &ComplexValue, prefix: &str) {
    for attr in schemas.iter().filter(|a| a.is_protected()) {
        if lookup(attrs, &attr.name).is_some() {
            continue;
        }
        if let Some(value) = lookup(stored, &attr.name) {
            debug!("Carrying stored value of '{}{}' into update", prefix, attr.name);
            attrs.insert(attr.name.clone(), value.clone());
        }
    }
}

fn check_required(schemas: &[AttributeSchema], attrs: &ComplexValue, prefix: &str) -> ScimResult<()> {
    for attr in schemas {
        let value = lookup(attrs, &attr.name);
        if attr.required && value.is_none_or(Attribute::is_empty) {
            return Err(ScimError::invalid_value(format!(
                "Required attribute '{}{}' is missing",
                prefix, attr.name
            )));
        }
        if let Some(value) = value {
            if attr.is_complex() {
                let prefix = format!("{}{}.", prefix, attr.name);
                for element in elements(value) {
                    if let Some(members) = element.as_complex() {
                        check_required(&attr.sub_attributes, members, &prefix)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn check_protected(
    schemas: &[AttributeSchema],
    attrs: &ComplexValue,
    stored: Option<&ComplexValue>,
) -> ScimResult<()> {
    for attr in schemas {
        let Some(value) = lookup(attrs, &attr.name) else {
            continue;
        };
        let previous = stored.and_then(|s| lookup(s, &attr.name));

        match attr.mutability {
            Mutability::WriteOnly | Mutability::ReadWrite if attr.is_complex() && !attr.multi_valued => {
                // protected sub-attributes of a mutable single complex value
                check_protected(
                    &attr.sub_attributes,
                    value.as_complex().unwrap_or(&ComplexValue::new()),
                    previous.and_then(Attribute::as_complex),
                )?;
            }
            Mutability::ReadOnly => {
                if !previous.is_some_and(|p| values_equal(attr, value, p)) {
                    return Err(read_only(attr));
                }
            }
            Mutability::Immutable => {
                if previous.is_some_and(|p| !values_equal(attr, value, p)) {
                    return Err(read_only(attr));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn read_only(attr: &AttributeSchema) -> ScimError {
    ScimError::internal(format!("Attribute '{}' is read only", attr.name))
}

/// Structural equality under the attribute's case sensitivity.
fn values_equal(attr: &AttributeSchema, left: &Attribute, right: &Attribute) -> bool {
    match (left, right) {
        (Attribute::Simple(l), Attribute::Simple(r)) => simple_equal(attr, l, r),
        (Attribute::Complex(l), Attribute::Complex(r)) => {
            l.keys().chain(r.keys()).all(|name| {
                match (lookup(l, name), lookup(r, name), attr.sub_attribute(name)) {
                    (Some(a), Some(b), Some(sub)) => values_equal(sub, a, b),
                    (Some(a), Some(b), None) => a == b,
                    (None, None, _) => true,
                    _ => false,
                }
            })
        }
        (Attribute::MultiValued(l), Attribute::MultiValued(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(attr, a, b))
        }
        _ => false,
    }
}

fn simple_equal(attr: &AttributeSchema, left: &SimpleValue, right: &SimpleValue) -> bool {
    match (left, right) {
        (SimpleValue::String(l), SimpleValue::String(r))
        | (SimpleValue::Reference(l), SimpleValue::Reference(r))
            if !attr.case_exact && attr.data_type != DataType::Binary =>
        {
            l.to_lowercase() == r.to_lowercase()
        }
        _ => left == right,
    }
}

fn elements(value: &Attribute) -> Vec<&Attribute> {
    match value {
        Attribute::MultiValued(items) => items.iter().collect(),
        other => vec![other],
    }
}

/// Remove every attribute (at any depth) whose schema matches `drop`.
fn strip(attrs: &mut ComplexValue, schemas: &[AttributeSchema], drop: &dyn Fn(&AttributeSchema) -> bool) {
    attrs.retain(|name, value| {
        let Some(attr) = schemas.iter().find(|a| a.name.eq_ignore_ascii_case(name)) else {
            return true;
        };
        if drop(attr) {
            return false;
        }
        if attr.is_complex() {
            match value {
                Attribute::Complex(members) => strip(members, &attr.sub_attributes, drop),
                Attribute::MultiValued(items) => {
                    for item in items.iter_mut() {
                        if let Attribute::Complex(members) = item {
                            strip(members, &attr.sub_attributes, drop);
                        }
                    }
                }
                Attribute::Simple(_) => {}
            }
        }
        true
    });
}
