//! Requested and excluded attribute lists (`attributes` / `excludedAttributes`).

use crate::schema::{AttributeSchema, ResourceTypeSchema, Returned, SchemaRegistry};

use log::debug;
use serde::{Deserialize, Serialize};

/// Caller-supplied attribute selection for a response.
///
/// Entries are names, dotted paths or full URIs. Selection is a per-request
/// parameter and never stored on the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSelection {
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub excluded_attributes: Vec<String>,
}

impl AttributeSelection {
    /// No selection: default-visibility attributes are returned.
    pub fn all() -> Self {
        Self::default()
    }

    /// Select only the given attributes (plus `always` ones).
    pub fn only<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
            excluded_attributes: Vec::new(),
        }
    }

    /// Build from comma-separated query parameter values.
    pub fn from_params(attributes: Option<&str>, excluded_attributes: Option<&str>) -> Self {
        Self {
            attributes: split_list(attributes),
            excluded_attributes: split_list(excluded_attributes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.excluded_attributes.is_empty()
    }

    /// Resolve every entry to a canonical attribute URI.
    ///
    /// Entries that match no attribute are dropped.
    pub fn resolve(
        &self,
        registry: &SchemaRegistry,
        resource_type: &ResourceTypeSchema,
    ) -> ResolvedSelection {
        let resolve_all = |names: &[String]| -> Vec<String> {
            names
                .iter()
                .filter_map(|name| match registry.resolve_attribute(name, resource_type) {
                    Ok(attr) => Some(attr.uri.to_lowercase()),
                    Err(_) => {
                        debug!("Ignoring unknown attribute '{}' in selection", name);
                        None
                    }
                })
                .collect()
        };

        ResolvedSelection {
            attributes: resolve_all(&self.attributes),
            excluded: resolve_all(&self.excluded_attributes),
        }
    }
}

fn split_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// How much of an attribute a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Emit the attribute with all of its visible sub-attributes
    Full,
    /// Emit the attribute, filtering its sub-attributes individually
    Partial,
    /// Leave the attribute out
    Hidden,
}

/// An [`AttributeSelection`] with every entry resolved to a lowercase URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSelection {
    attributes: Vec<String>,
    excluded: Vec<String>,
}

impl ResolvedSelection {
    /// Decide how `attr` appears in a response under this selection.
    pub fn visibility(&self, attr: &AttributeSchema) -> Visibility {
        let uri = attr.uri.to_lowercase();
        match attr.returned {
            Returned::Never => Visibility::Hidden,
            Returned::Always => Visibility::Full,
            Returned::Request => self.requested(&uri),
            Returned::Default if self.attributes.is_empty() => {
                if self.excluded.iter().any(|e| is_same_or_child(&uri, e)) {
                    Visibility::Hidden
                } else if self.excluded.iter().any(|e| is_same_or_child(e, &uri)) {
                    Visibility::Partial
                } else {
                    Visibility::Full
                }
            }
            Returned::Default => self.requested(&uri),
        }
    }

    fn requested(&self, uri: &str) -> Visibility {
        if self.attributes.iter().any(|a| is_same_or_child(uri, a)) {
            Visibility::Full
        } else if self.attributes.iter().any(|a| is_same_or_child(a, uri)) {
            Visibility::Partial
        } else {
            Visibility::Hidden
        }
    }
}

// whether `uri` equals `ancestor` or names one of its sub-attributes
fn is_same_or_child(uri: &str, ancestor: &str) -> bool {
    uri == ancestor
        || (uri.len() > ancestor.len()
            && uri.starts_with(ancestor)
            && uri.as_bytes()[ancestor.len()] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> (SchemaRegistry, ResourceTypeSchema) {
        let registry = SchemaRegistry::new().unwrap();
        let user = registry.user_schema().unwrap().clone();
        (registry, user)
    }

    #[test]
    fn test_from_params() {
        let selection = AttributeSelection::from_params(Some("userName, name.givenName,"), None);
        assert_eq!(selection.attributes, vec!["userName", "name.givenName"]);
        assert!(selection.excluded_attributes.is_empty());
    }

    #[test]
    fn test_default_visibility() {
        let (registry, user) = user();
        let resolved = AttributeSelection::all().resolve(&registry, &user);

        let user_name = registry.resolve_attribute("userName", &user).unwrap();
        let password = registry.resolve_attribute("password", &user).unwrap();
        let id = registry.resolve_attribute("id", &user).unwrap();

        assert_eq!(resolved.visibility(user_name), Visibility::Full);
        assert_eq!(resolved.visibility(password), Visibility::Hidden);
        assert_eq!(resolved.visibility(id), Visibility::Full);
    }

    #[test]
    fn test_requested_sub_attribute_narrows_parent() {
        let (registry, user) = user();
        let resolved = AttributeSelection::only(["name.givenName"]).resolve(&registry, &user);

        let name = registry.resolve_attribute("name", &user).unwrap();
        let given = registry.resolve_attribute("name.givenName", &user).unwrap();
        let family = registry.resolve_attribute("name.familyName", &user).unwrap();
        let user_name = registry.resolve_attribute("userName", &user).unwrap();

        assert_eq!(resolved.visibility(name), Visibility::Partial);
        assert_eq!(resolved.visibility(given), Visibility::Full);
        assert_eq!(resolved.visibility(family), Visibility::Hidden);
        assert_eq!(resolved.visibility(user_name), Visibility::Hidden);
    }

    #[test]
    fn test_excluded_attributes() {
        let (registry, user) = user();
        let selection = AttributeSelection::from_params(None, Some("emails,id"));
        let resolved = selection.resolve(&registry, &user);

        let emails = registry.resolve_attribute("emails", &user).unwrap();
        let id = registry.resolve_attribute("id", &user).unwrap();
        assert_eq!(resolved.visibility(emails), Visibility::Hidden);
        // always-returned attributes ignore exclusion
        assert_eq!(resolved.visibility(id), Visibility::Full);
    }
}
