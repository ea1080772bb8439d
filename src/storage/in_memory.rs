//! In-memory resource manager.
//!
//! A thread-safe [`ResourceManager`] for one resource type, backed by a map
//! behind tokio's `RwLock`. It is meant for tests, demos and hosts that do not
//! need persistence.
//!
//! # Features
//!
//! * UUID identifiers and full `meta` (resourceType, created, lastModified,
//!   location, version)
//! * Server-wide uniqueness for `uniqueness: server` string attributes
//! * Filter evaluation, sorting and paging for `list`
//! * Insertion-ordered results when no sort is requested
//!
//! # Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use scim_engine::attribute::{Attribute, AttributeSelection, ScimResource};
//! use scim_engine::config::EngineConfig;
//! use scim_engine::manager::ResourceManager;
//! use scim_engine::schema::SchemaRegistry;
//! use scim_engine::storage::InMemoryResourceManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(SchemaRegistry::new()?);
//! let users = InMemoryResourceManager::new(registry.clone(), "User", EngineConfig::default())?;
//!
//! let mut user = ScimResource::new(registry.resource_type("User").expect("registered"));
//! user.set("userName", Attribute::string("bjensen"));
//!
//! let stored = users.create(user, &AttributeSelection::all()).await?;
//! assert!(stored.id().is_some());
//! assert!(stored.version().is_some());
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use tokio::sync::RwLock;

use crate::attribute::{Attribute, AttributeSelection, ComplexValue, ScimResource, SimpleValue, lookup};
use crate::codec::JsonEncoder;
use crate::config::EngineConfig;
use crate::error::{ScimError, ScimErrorType, ScimResult};
use crate::filter::Filter;
use crate::manager::{ListQuery, ResourceManager};
use crate::schema::{AttributeSchema, DataType, ResourceTypeSchema, SchemaRegistry, Uniqueness};
use crate::storage::FilterEvaluator;
use crate::version::version_from_content;

/// Thread-safe in-memory manager for one resource type.
#[derive(Clone)]
pub struct InMemoryResourceManager {
    registry: Arc<SchemaRegistry>,
    resource_type: ResourceTypeSchema,
    config: EngineConfig,
    store: Arc<RwLock<Store>>,
}

/// Resources keyed by insertion sequence, plus an id index.
#[derive(Default)]
struct Store {
    next: u64,
    resources: BTreeMap<u64, ScimResource>,
    index: HashMap<String, u64>,
}

impl InMemoryResourceManager {
    /// Create a manager for the resource type registered as `resource_type`.
    pub fn new(
        registry: Arc<SchemaRegistry>,
        resource_type: &str,
        config: EngineConfig,
    ) -> ScimResult<Self> {
        let resource_type = registry
            .resource_type(resource_type)
            .cloned()
            .ok_or_else(|| ScimError::internal(format!("Unknown resource type '{}'", resource_type)))?;
        Ok(Self {
            registry,
            resource_type,
            config,
            store: Arc::new(RwLock::new(Store::default())),
        })
    }

    pub fn resource_type(&self) -> &ResourceTypeSchema {
        &self.resource_type
    }

    /// Number of stored resources.
    pub async fn len(&self) -> usize {
        self.store.read().await.resources.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Clear all data (useful for testing).
    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        *store = Store::default();
    }

    /// Stamp `meta` and compute the content version.
    fn stamp(&self, resource: &mut ScimResource, created: Option<SimpleValue>) -> ScimResult<()> {
        let id = resource
            .id()
            .map(String::from)
            .ok_or_else(|| ScimError::internal("Resource has no id"))?;
        let now = SimpleValue::DateTime(Utc::now());

        resource.remove("meta");
        resource.set_meta("resourceType", SimpleValue::String(self.resource_type.name.clone()));
        resource.set_meta("created", created.unwrap_or_else(|| now.clone()));
        resource.set_meta("lastModified", now);
        resource.set_meta(
            "location",
            SimpleValue::Reference(self.config.generate_ref_url(&self.resource_type.endpoint, &id)),
        );

        let content = JsonEncoder::new(&self.registry).encode(resource, &AttributeSelection::all())?;
        resource.set_meta("version", SimpleValue::String(version_from_content(content.as_bytes())));
        Ok(())
    }

    /// Reject values already held by another resource for any
    /// `uniqueness: server` string attribute.
    fn check_uniqueness(&self, store: &Store, resource: &ScimResource) -> ScimResult<()> {
        let own_id = resource.id();
        let mut scopes: Vec<(&[AttributeSchema], Option<&str>)> =
            vec![(self.resource_type.attributes.as_slice(), None)];
        for ext in &self.resource_type.extensions {
            if let Some(schema) = self.registry.schema(&ext.schema) {
                scopes.push((schema.attributes.as_slice(), Some(ext.schema.as_str())));
            }
        }

        for (attributes, extension) in scopes {
            let candidates = attributes.iter().filter(|attr| {
                attr.uniqueness == Uniqueness::Server
                    && attr.data_type == DataType::String
                    && !attr.multi_valued
                    && !attr.name.eq_ignore_ascii_case("id")
            });
            for attr in candidates {
                let Some(value) = unique_value(resource, extension, attr) else {
                    continue;
                };
                let taken = store.resources.values().any(|other| {
                    other.id() != own_id
                        && unique_value(other, extension, attr).is_some_and(|existing| {
                            if attr.case_exact {
                                existing == value
                            } else {
                                existing.eq_ignore_ascii_case(value)
                            }
                        })
                });
                if taken {
                    return Err(ScimError::conflict(format!(
                        "{} '{}' is already in use",
                        attr.name, value
                    )));
                }
            }
        }
        Ok(())
    }
}

fn unique_value<'r>(
    resource: &'r ScimResource,
    extension: Option<&str>,
    attr: &AttributeSchema,
) -> Option<&'r str> {
    let members: &ComplexValue = match extension {
        Some(uri) => resource.extension(uri)?,
        None => &resource.attributes,
    };
    lookup(members, &attr.name).and_then(Attribute::as_str)
}

#[async_trait]
impl ResourceManager for InMemoryResourceManager {
    async fn create(
        &self,
        mut resource: ScimResource,
        _attributes: &AttributeSelection,
    ) -> ScimResult<ScimResource> {
        let mut store = self.store.write().await;

        let id = uuid::Uuid::new_v4().to_string();
        resource.set_id(id.clone());
        self.check_uniqueness(&store, &resource)?;
        self.stamp(&mut resource, None)?;

        let seq = store.next;
        store.next += 1;
        store.index.insert(id.clone(), seq);
        store.resources.insert(seq, resource.clone());

        info!("Created {} '{}'", self.resource_type.name, id);
        Ok(resource)
    }

    async fn get(&self, id: &str, _attributes: &AttributeSelection) -> ScimResult<ScimResource> {
        let store = self.store.read().await;
        store
            .index
            .get(id)
            .and_then(|seq| store.resources.get(seq))
            .cloned()
            .ok_or_else(|| ScimError::resource_not_found(&self.resource_type.name, id))
    }

    async fn update(
        &self,
        mut resource: ScimResource,
        _attributes: &AttributeSelection,
    ) -> ScimResult<ScimResource> {
        let id = resource.id().map(String::from).ok_or_else(|| {
            ScimError::bad_request_typed(ScimErrorType::NoTarget, "Update requires a resource id")
        })?;

        let mut store = self.store.write().await;
        let seq = *store
            .index
            .get(&id)
            .ok_or_else(|| ScimError::resource_not_found(&self.resource_type.name, &id))?;
        let created = store
            .resources
            .get(&seq)
            .and_then(|stored| stored.meta("created"))
            .cloned();

        self.check_uniqueness(&store, &resource)?;
        self.stamp(&mut resource, created)?;
        store.resources.insert(seq, resource.clone());

        info!("Updated {} '{}'", self.resource_type.name, id);
        Ok(resource)
    }

    async fn delete(&self, id: &str) -> ScimResult<()> {
        let mut store = self.store.write().await;
        let seq = store
            .index
            .remove(id)
            .ok_or_else(|| ScimError::resource_not_found(&self.resource_type.name, id))?;
        store.resources.remove(&seq);

        info!("Deleted {} '{}'", self.resource_type.name, id);
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> ScimResult<Vec<ScimResource>> {
        let mut matched = self.matching(query.filter.as_ref()).await?;
        if let Some(sort_by) = &query.sort_by {
            FilterEvaluator::new(&self.registry, &self.resource_type).sort(
                &mut matched,
                sort_by,
                query.sort_order,
            )?;
        }
        debug!(
            "{} {} resources match, returning from index {}",
            matched.len(),
            self.resource_type.name,
            query.first_index()
        );
        Ok(query.page(matched))
    }

    async fn count(&self, filter: Option<&Filter>) -> ScimResult<usize> {
        Ok(self.matching(filter).await?.len())
    }
}

impl InMemoryResourceManager {
    async fn matching(&self, filter: Option<&Filter>) -> ScimResult<Vec<ScimResource>> {
        let store = self.store.read().await;
        let evaluator = FilterEvaluator::new(&self.registry, &self.resource_type);
        let mut matched = Vec::new();
        for resource in store.resources.values() {
            let keep = match filter {
                Some(filter) => evaluator.matches(filter, resource)?,
                None => true,
            };
            if keep {
                matched.push(resource.clone());
            }
        }
        Ok(matched)
    }
}
