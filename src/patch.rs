//! PATCH requests applied to attribute value trees.
//!
//! Supports the `add`, `replace` and `remove` operations over plain attribute
//! paths (`title`, `name.givenName`, `urn:...:enterprise:2.0:User:manager.value`)
//! and path-less `add`/`replace` with an object value. Value-selection filters
//! inside paths (`emails[type eq "work"]`) are not supported and fail as an
//! unresolved path.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{Attribute, ComplexValue, ScimResource, lookup_key};
use crate::codec::decoder::decode_attribute;
use crate::error::{ScimError, ScimErrorType, ScimResult};
use crate::schema::{AttributeSchema, Mutability, ResourceTypeSchema, SchemaRegistry};

/// Schema URI of a PATCH request body.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// A PATCH request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<PatchOperation>,
}

/// One PATCH operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// PATCH operation kinds. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

impl TryFrom<String> for PatchOp {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "add" => Ok(Self::Add),
            "replace" => Ok(Self::Replace),
            "remove" => Ok(Self::Remove),
            _ => Err(format!("Unsupported PATCH operation: {}", value)),
        }
    }
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: vec![PATCH_OP_SCHEMA.to_string()],
            operations,
        }
    }

    /// Parse and check a PATCH body.
    pub fn from_value(value: &Value) -> ScimResult<Self> {
        let request: PatchRequest = serde_json::from_value(value.clone())?;
        if !request
            .schemas
            .iter()
            .any(|s| s.eq_ignore_ascii_case(PATCH_OP_SCHEMA))
        {
            return Err(ScimError::invalid_syntax(format!(
                "PATCH request must declare schema '{}'",
                PATCH_OP_SCHEMA
            )));
        }
        if request.operations.is_empty() {
            return Err(ScimError::invalid_syntax("Operations array cannot be empty"));
        }
        Ok(request)
    }

    pub fn from_json(body: &str) -> ScimResult<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(&value)
    }

    /// Apply every operation to `tree`, in order.
    ///
    /// Operations never touch `readOnly` attributes. The caller validates the
    /// patched tree against the stored one afterwards, which catches changes
    /// to `immutable` attributes.
    pub fn apply(&self, registry: &SchemaRegistry, tree: &mut ScimResource) -> ScimResult<()> {
        let resource_type = registry.tree_resource_type(tree)?;
        for operation in &self.operations {
            apply_operation(registry, resource_type, tree, operation)?;
        }
        Ok(())
    }
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: Some(path.into()),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: Some(path.into()),
            value: None,
        }
    }
}

fn apply_operation(
    registry: &SchemaRegistry,
    resource_type: &ResourceTypeSchema,
    tree: &mut ScimResource,
    operation: &PatchOperation,
) -> ScimResult<()> {
    let Some(path) = operation.path.as_deref() else {
        return apply_without_path(registry, resource_type, tree, operation);
    };
    debug!("PATCH {:?} '{}'", operation.op, path);

    let resolved = registry.resolve_path(path, resource_type)?;
    let attr = resolved.attribute();
    if attr.mutability == Mutability::ReadOnly || resolved.top.mutability == Mutability::ReadOnly {
        return Err(ScimError::bad_request_typed(
            ScimErrorType::Mutability,
            format!("Attribute '{}' is read only", path),
        ));
    }
    if resolved.sub_sub.is_some() || (resolved.sub.is_some() && resolved.top.multi_valued) {
        return Err(ScimError::bad_request_typed(
            ScimErrorType::InvalidPath,
            format!("Path '{}' is not supported", path),
        ));
    }

    let decoded = match operation.op {
        PatchOp::Remove => None,
        PatchOp::Add | PatchOp::Replace => {
            let value = operation.value.as_ref().ok_or_else(|| {
                ScimError::invalid_value(format!("{:?} operation requires a value", operation.op))
            })?;
            decode_attribute(attr, value)?
        }
    };

    let container: &mut ComplexValue = if resolved.extension {
        if operation.op == PatchOp::Remove && tree.extension(resolved.schema_uri).is_none() {
            return Ok(());
        }
        tree.extension_mut(resolved.schema_uri)
    } else {
        &mut tree.attributes
    };

    let (members, name) = match resolved.sub {
        Some(sub) => {
            let create = operation.op != PatchOp::Remove;
            match complex_entry(container, &resolved.top.name, create)? {
                Some(parent) => (parent, sub.name.as_str()),
                None => return Ok(()),
            }
        }
        None => (container, resolved.top.name.as_str()),
    };

    match (operation.op, decoded) {
        (PatchOp::Remove, _) | (PatchOp::Replace, None) => {
            if let Some(key) = lookup_key(members, name) {
                members.remove(&key);
            }
        }
        (PatchOp::Add, None) => {}
        (op, Some(value)) => set_value(members, attr, name, value, op),
    }

    if resolved.sub.is_some() {
        prune_empty(parent_container(tree, &resolved), &resolved.top.name);
    }
    if resolved.extension
        && tree
            .extension(resolved.schema_uri)
            .is_some_and(|members| members.is_empty())
    {
        tree.remove_extension(resolved.schema_uri);
    }
    Ok(())
}

/// `add`/`replace` without a path: the value is an object of attributes,
/// each applied as if named by its own path.
fn apply_without_path(
    registry: &SchemaRegistry,
    resource_type: &ResourceTypeSchema,
    tree: &mut ScimResource,
    operation: &PatchOperation,
) -> ScimResult<()> {
    if operation.op == PatchOp::Remove {
        return Err(ScimError::bad_request_typed(
            ScimErrorType::NoTarget,
            "Remove operation requires a path",
        ));
    }
    let object = operation
        .value
        .as_ref()
        .and_then(Value::as_object)
        .ok_or_else(|| ScimError::invalid_value("Operation without a path requires an object value"))?;

    for (key, value) in object {
        if key == "schemas" {
            continue;
        }
        if let Some(extension) = registry.extension_schema(resource_type, key) {
            let members = value.as_object().ok_or_else(|| {
                ScimError::invalid_syntax(format!("Extension '{}' must be a JSON object", key))
            })?;
            for (name, member) in members {
                let nested = PatchOperation {
                    op: operation.op,
                    path: Some(format!("{}:{}", extension.id, name)),
                    value: Some(member.clone()),
                };
                apply_operation(registry, resource_type, tree, &nested)?;
            }
            continue;
        }
        let nested = PatchOperation {
            op: operation.op,
            path: Some(key.clone()),
            value: Some(value.clone()),
        };
        apply_operation(registry, resource_type, tree, &nested)?;
    }
    Ok(())
}

fn set_value(members: &mut ComplexValue, attr: &AttributeSchema, name: &str, value: Attribute, op: PatchOp) {
    let key = lookup_key(members, name).unwrap_or_else(|| attr.name.clone());
    let existing = members.remove(&key);

    let merged = match (op, existing, value) {
        (PatchOp::Add, Some(Attribute::MultiValued(mut current)), Attribute::MultiValued(added)) => {
            if added.iter().any(Attribute::is_primary) {
                for item in current.iter_mut() {
                    clear_primary(item);
                }
            }
            current.extend(added);
            Attribute::MultiValued(current)
        }
        (_, Some(Attribute::Complex(mut current)), Attribute::Complex(update)) if !attr.multi_valued => {
            for (sub, sub_value) in update {
                if let Some(existing) = lookup_key(&current, &sub) {
                    current.remove(&existing);
                }
                current.insert(sub, sub_value);
            }
            Attribute::Complex(current)
        }
        (_, _, value) => value,
    };
    members.insert(key, merged);
}

fn clear_primary(item: &mut Attribute) {
    if let Some(members) = item.as_complex_mut() {
        if let Some(key) = lookup_key(members, "primary") {
            members.remove(&key);
        }
    }
}

/// The complex attribute `name` in `members`, created when `create` is set.
fn complex_entry<'t>(
    members: &'t mut ComplexValue,
    name: &str,
    create: bool,
) -> ScimResult<Option<&'t mut ComplexValue>> {
    let key = match lookup_key(members, name) {
        Some(key) => key,
        None if create => {
            members.insert(name.to_string(), Attribute::Complex(BTreeMap::new()));
            name.to_string()
        }
        None => return Ok(None),
    };
    members
        .get_mut(&key)
        .and_then(Attribute::as_complex_mut)
        .map(Some)
        .ok_or_else(|| ScimError::internal(format!("Attribute '{}' is not complex", name)))
}

fn parent_container<'t>(
    tree: &'t mut ScimResource,
    resolved: &crate::schema::ResolvedAttribute<'_>,
) -> Option<&'t mut ComplexValue> {
    if resolved.extension {
        tree.extensions
            .iter_mut()
            .find(|(uri, _)| uri.eq_ignore_ascii_case(resolved.schema_uri))
            .map(|(_, members)| members)
    } else {
        Some(&mut tree.attributes)
    }
}

/// Drop a complex attribute left without sub-attributes.
fn prune_empty(container: Option<&mut ComplexValue>, name: &str) {
    let Some(container) = container else {
        return;
    };
    let empty = crate::attribute::lookup(container, name).is_some_and(Attribute::is_empty);
    if empty {
        if let Some(key) = lookup_key(container, name) {
            container.remove(&key);
        }
    }
}
