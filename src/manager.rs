//! Resource manager collaborator contract.
//!
//! The engine never stores anything itself. Each resource type is backed by a
//! [`ResourceManager`] that receives already-decoded, already-validated trees
//! and hands back trees carrying the identifier, `meta.resourceType`,
//! timestamps and canonical location it assigned. Managers are shared across
//! requests, so they must be `Send + Sync`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attribute::{AttributeSelection, ScimResource};
use crate::config::FilterConfig;
use crate::error::{ScimError, ScimResult};
use crate::filter::{AttributePath, Filter, FilterParser};
use crate::schema::{ResourceTypeSchema, SchemaRegistry};

/// Schema URI of a `.search` request body.
pub const SEARCH_REQUEST_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:SearchRequest";

/// Schema URI of a list response envelope.
pub const LIST_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:ListResponse";

/// Storage collaborator for one resource type.
///
/// `attributes` is the caller's attribute selection. Managers may use it to
/// skip loading data the response will not carry, but the engine applies the
/// selection again when encoding, so ignoring it is always correct.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Persist a new resource, assigning its identifier and `meta`.
    ///
    /// Fails with `Conflict` when a server-unique attribute is already taken.
    async fn create(
        &self,
        resource: ScimResource,
        attributes: &AttributeSelection,
    ) -> ScimResult<ScimResource>;

    /// Fetch a resource by identifier; `NotFound` if absent.
    async fn get(&self, id: &str, attributes: &AttributeSelection) -> ScimResult<ScimResource>;

    /// Replace a stored resource. The identifier is carried by the tree.
    async fn update(
        &self,
        resource: ScimResource,
        attributes: &AttributeSelection,
    ) -> ScimResult<ScimResource>;

    /// Remove a resource; `NotFound` if absent.
    async fn delete(&self, id: &str) -> ScimResult<()>;

    /// One page of the resources matching `query`, sorted as requested.
    async fn list(&self, query: &ListQuery) -> ScimResult<Vec<ScimResource>>;

    /// Number of resources matching `filter`, ignoring paging.
    async fn count(&self, filter: Option<&Filter>) -> ScimResult<usize> {
        let query = ListQuery {
            filter: filter.cloned(),
            ..ListQuery::default()
        };
        Ok(self.list(&query).await?.len())
    }
}

/// Sort direction for list results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A resolved list query handed to [`ResourceManager::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    /// Schema-resolved filter
    pub filter: Option<Filter>,
    /// 1-based index of the first result
    pub start_index: Option<usize>,
    /// Maximum number of results to return
    pub count: Option<usize>,
    /// Attribute to sort by
    pub sort_by: Option<AttributePath>,
    pub sort_order: SortOrder,
    /// Attributes requested for the returned resources
    pub attributes: AttributeSelection,
}

impl ListQuery {
    /// Create a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the maximum count.
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Set the starting index.
    pub fn with_start_index(mut self, start_index: usize) -> Self {
        self.start_index = Some(start_index);
        self
    }

    pub fn with_sort(mut self, sort_by: AttributePath, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by);
        self.sort_order = sort_order;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeSelection) -> Self {
        self.attributes = attributes;
        self
    }

    /// Effective 1-based start index; values below 1 count as 1.
    pub fn first_index(&self) -> usize {
        self.start_index.unwrap_or(1).max(1)
    }

    /// Apply `startIndex` and `count` to an already filtered and sorted set.
    pub fn page<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = self.first_index() - 1;
        let take = self.count.unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}

/// Query parameters of a list request, or the body of a `.search` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchRequest {
    pub schemas: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded_attributes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self {
            schemas: vec![SEARCH_REQUEST_SCHEMA.to_string()],
            ..Self::default()
        }
    }

    /// Parse a `.search` request body.
    pub fn from_json(body: &str) -> ScimResult<Self> {
        let request: SearchRequest = serde_json::from_str(body)?;
        if !request
            .schemas
            .iter()
            .any(|s| s.eq_ignore_ascii_case(SEARCH_REQUEST_SCHEMA))
        {
            return Err(ScimError::invalid_syntax(format!(
                "Search request must declare schema '{}'",
                SEARCH_REQUEST_SCHEMA
            )));
        }
        Ok(request)
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set `attributes` and `excludedAttributes` from their comma-separated
    /// query parameter form.
    pub fn with_selection(mut self, selection: AttributeSelection) -> Self {
        self.attributes = selection.attributes;
        self.excluded_attributes = selection.excluded_attributes;
        self
    }

    pub fn with_sort(mut self, sort_by: impl Into<String>, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(sort_order);
        self
    }

    pub fn with_paging(mut self, start_index: usize, count: usize) -> Self {
        self.start_index = Some(start_index);
        self.count = Some(count);
        self
    }

    pub fn selection(&self) -> AttributeSelection {
        AttributeSelection {
            attributes: self.attributes.clone(),
            excluded_attributes: self.excluded_attributes.clone(),
        }
    }

    /// Resolve the filter and sort attribute against `resource_type`.
    pub fn to_query(
        &self,
        registry: &SchemaRegistry,
        resource_type: &ResourceTypeSchema,
        limits: FilterConfig,
    ) -> ScimResult<ListQuery> {
        let filter = match self.filter.as_deref() {
            Some(text) => Some(
                FilterParser::new(registry, resource_type)
                    .with_limits(limits)
                    .parse(text)?,
            ),
            None => None,
        };

        let sort_by = match self.sort_by.as_deref() {
            Some(path) => {
                let attr = registry.resolve_attribute(path, resource_type)?;
                Some(AttributePath {
                    path: path.to_string(),
                    uri: attr.uri.clone(),
                })
            }
            None => None,
        };

        Ok(ListQuery {
            filter,
            start_index: self.start_index,
            count: self.count,
            sort_by,
            sort_order: self.sort_order.unwrap_or_default(),
            attributes: self.selection(),
        })
    }
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub schemas: Vec<String>,
    pub total_results: usize,
    pub items_per_page: usize,
    pub start_index: usize,
    #[serde(rename = "Resources")]
    pub resources: Vec<Value>,
}

impl ListResponse {
    pub fn new(resources: Vec<Value>, total_results: usize, start_index: usize) -> Self {
        Self {
            schemas: vec![LIST_RESPONSE_SCHEMA.to_string()],
            total_results,
            items_per_page: resources.len(),
            start_index,
            resources,
        }
    }
}
