//! Single-resource operation pipeline.
//!
//! A [`ResourceEndpoint`] binds one resource type to its
//! [`ResourceManager`] and runs every request through the same stages:
//! decode, validate, hand to the manager, retrieve-validate the result,
//! encode. Each operation comes in two forms: a `*_resource` method returning
//! the tree (used by the bulk processor) and a response method returning a
//! [`ScimResponse`] envelope with errors already rendered as error objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;

use crate::attribute::{AttributeSelection, ScimResource};
use crate::codec::{JsonDecoder, JsonEncoder};
use crate::config::EngineConfig;
use crate::error::{ScimError, ScimResult};
use crate::manager::{ListResponse, ResourceManager, SearchRequest};
use crate::patch::PatchRequest;
use crate::schema::{OperationContext, ResourceTypeSchema, SchemaRegistry};
use crate::storage::InMemoryResourceManager;
use crate::version::{version_from_content, weak_etag};

/// HTTP-style response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimResponse {
    pub status: u16,
    /// Resource, list or error object; `None` for `204 No Content`
    pub body: Option<Value>,
    /// Header name -> value, e.g. `ETag`, `Location`
    pub headers: BTreeMap<String, String>,
}

impl ScimResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Error object response for `error`.
    pub fn from_error(error: &ScimError) -> Self {
        let body = serde_json::to_value(error.to_response()).unwrap_or(Value::Null);
        Self::new(error.status()).with_body(body)
    }

    /// Header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("ETag")
    }

    pub fn location(&self) -> Option<&str> {
        self.header("Location")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body serialized as JSON text.
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(Value::to_string)
    }
}

/// Operation pipeline for one resource type.
#[derive(Clone)]
pub struct ResourceEndpoint {
    registry: Arc<SchemaRegistry>,
    resource_type: ResourceTypeSchema,
    manager: Arc<dyn ResourceManager>,
    config: EngineConfig,
}

impl std::fmt::Debug for ResourceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceEndpoint")
            .field("resource_type", &self.resource_type.name)
            .field("endpoint", &self.resource_type.endpoint)
            .finish()
    }
}

impl ResourceEndpoint {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        resource_type: &str,
        manager: Arc<dyn ResourceManager>,
        config: EngineConfig,
    ) -> ScimResult<Self> {
        let resource_type = registry
            .resource_type(resource_type)
            .cloned()
            .ok_or_else(|| ScimError::internal(format!("Unknown resource type '{}'", resource_type)))?;
        Ok(Self {
            registry,
            resource_type,
            manager,
            config,
        })
    }

    pub fn resource_type(&self) -> &ResourceTypeSchema {
        &self.resource_type
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Canonical location of resource `id` at this endpoint.
    pub fn location_of(&self, id: &str) -> String {
        self.config.generate_ref_url(&self.resource_type.endpoint, id)
    }

    /// Decode, create-validate, create, retrieve-validate.
    pub async fn create_resource(
        &self,
        data: &Value,
        selection: &AttributeSelection,
    ) -> ScimResult<ScimResource> {
        let mut tree = JsonDecoder::new(&self.registry).decode_value(data, &self.resource_type)?;
        self.registry
            .validate(OperationContext::Create, &mut tree, None)?;
        let mut created = self.manager.create(tree, selection).await?;
        self.registry
            .validate(OperationContext::Retrieve, &mut created, None)?;
        Ok(created)
    }

    pub async fn get_resource(&self, id: &str, selection: &AttributeSelection) -> ScimResult<ScimResource> {
        let mut tree = self.manager.get(id, selection).await?;
        self.registry
            .validate(OperationContext::Retrieve, &mut tree, None)?;
        Ok(tree)
    }

    /// Full replacement (`PUT`) of the resource `id`.
    pub async fn replace_resource(
        &self,
        id: &str,
        data: &Value,
        selection: &AttributeSelection,
    ) -> ScimResult<ScimResource> {
        let stored = self.manager.get(id, &AttributeSelection::all()).await?;
        let mut tree = JsonDecoder::new(&self.registry).decode_value(data, &self.resource_type)?;
        if tree.id().is_none() {
            tree.set_id(id);
        }
        self.registry
            .validate(OperationContext::Update, &mut tree, Some(&stored))?;
        self.store_update(tree, selection).await
    }

    /// Apply a PatchOp message to the resource `id`.
    pub async fn patch_resource(
        &self,
        id: &str,
        data: &Value,
        selection: &AttributeSelection,
    ) -> ScimResult<ScimResource> {
        let request = PatchRequest::from_value(data)?;
        let stored = self.manager.get(id, &AttributeSelection::all()).await?;
        let mut tree = stored.clone();
        request.apply(&self.registry, &mut tree)?;
        self.registry
            .validate(OperationContext::Update, &mut tree, Some(&stored))?;
        self.store_update(tree, selection).await
    }

    pub async fn delete_resource(&self, id: &str) -> ScimResult<()> {
        self.manager.delete(id).await
    }

    /// Filter, sort, page and encode matching resources.
    pub async fn list_resources(&self, request: &SearchRequest) -> ScimResult<ListResponse> {
        let query = request.to_query(&self.registry, &self.resource_type, self.config.filter)?;
        let total = self.manager.count(query.filter.as_ref()).await?;
        let page = self.manager.list(&query).await?;

        let encoder = JsonEncoder::new(&self.registry);
        let mut resources = Vec::with_capacity(page.len());
        for mut tree in page {
            self.registry
                .validate(OperationContext::Retrieve, &mut tree, None)?;
            resources.push(encoder.encode_value(&tree, &query.attributes)?);
        }
        Ok(ListResponse::new(resources, total, query.first_index()))
    }

    async fn store_update(
        &self,
        tree: ScimResource,
        selection: &AttributeSelection,
    ) -> ScimResult<ScimResource> {
        let mut updated = self.manager.update(tree, selection).await?;
        self.registry
            .validate(OperationContext::Retrieve, &mut updated, None)?;
        Ok(updated)
    }

    /// `POST /{Endpoint}`
    pub async fn create(&self, body: &str, selection: &AttributeSelection) -> ScimResponse {
        let result = async {
            let data = parse_body(body)?;
            let created = self.create_resource(&data, selection).await?;
            self.resource_response(201, &created, selection)
        };
        self.finish("create", result.await)
    }

    /// `GET /{Endpoint}/{id}`
    pub async fn get(&self, id: &str, selection: &AttributeSelection) -> ScimResponse {
        let result = async {
            let tree = self.get_resource(id, selection).await?;
            self.resource_response(200, &tree, selection)
        };
        self.finish("get", result.await)
    }

    /// `PUT /{Endpoint}/{id}`
    pub async fn replace(&self, id: &str, body: &str, selection: &AttributeSelection) -> ScimResponse {
        let result = async {
            let data = parse_body(body)?;
            let tree = self.replace_resource(id, &data, selection).await?;
            self.resource_response(200, &tree, selection)
        };
        self.finish("replace", result.await)
    }

    /// `PATCH /{Endpoint}/{id}`
    pub async fn patch(&self, id: &str, body: &str, selection: &AttributeSelection) -> ScimResponse {
        let result = async {
            let data = parse_body(body)?;
            let tree = self.patch_resource(id, &data, selection).await?;
            self.resource_response(200, &tree, selection)
        };
        self.finish("patch", result.await)
    }

    /// `DELETE /{Endpoint}/{id}`
    pub async fn delete(&self, id: &str) -> ScimResponse {
        let result = self.delete_resource(id).await.map(|_| ScimResponse::new(204));
        self.finish("delete", result)
    }

    /// `GET /{Endpoint}?filter=...`
    pub async fn list(&self, request: &SearchRequest) -> ScimResponse {
        let result = async {
            let list = self.list_resources(request).await?;
            let body = serde_json::to_value(&list)
                .map_err(|e| ScimError::internal(format!("Failed to serialize list response: {}", e)))?;
            Ok::<_, ScimError>(ScimResponse::new(200).with_body(body))
        };
        self.finish("list", result.await)
    }

    /// `POST /{Endpoint}/.search`
    pub async fn search(&self, body: &str) -> ScimResponse {
        match SearchRequest::from_json(body) {
            Ok(request) => self.list(&request).await,
            Err(error) => self.finish("search", Err(error)),
        }
    }

    /// Encode `tree` with `ETag` and, for `201`, `Location`.
    pub(crate) fn resource_response(
        &self,
        status: u16,
        tree: &ScimResource,
        selection: &AttributeSelection,
    ) -> ScimResult<ScimResponse> {
        let body = JsonEncoder::new(&self.registry).encode_value(tree, selection)?;
        let version = match tree.version() {
            Some(version) => version.to_string(),
            None => version_from_content(body.to_string().as_bytes()),
        };

        let mut response = ScimResponse::new(status)
            .with_header("ETag", weak_etag(&version))
            .with_body(body);
        if status == 201 {
            if let Some(location) = tree.location() {
                response = response.with_header("Location", location);
            }
        }
        Ok(response)
    }

    fn finish(&self, operation: &str, result: ScimResult<ScimResponse>) -> ScimResponse {
        match result {
            Ok(response) => {
                debug!(
                    "{} {} -> {}",
                    self.resource_type.name, operation, response.status
                );
                response
            }
            Err(error) => {
                if error.status() >= 500 {
                    warn!("{} {} failed: {}", self.resource_type.name, operation, error);
                } else {
                    info!("{} {} rejected: {}", self.resource_type.name, operation, error);
                }
                ScimResponse::from_error(&error)
            }
        }
    }
}

fn parse_body(body: &str) -> ScimResult<Value> {
    Ok(serde_json::from_str(body)?)
}

/// The endpoints served by one engine, addressable by resource type name or
/// endpoint path.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: Vec<ResourceEndpoint>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory managers for each named resource type.
    pub fn in_memory(
        registry: Arc<SchemaRegistry>,
        config: EngineConfig,
        resource_types: &[&str],
    ) -> ScimResult<Self> {
        let mut endpoints = Self::new();
        for name in resource_types {
            let manager = InMemoryResourceManager::new(registry.clone(), name, config.clone())?;
            endpoints.register(ResourceEndpoint::new(
                registry.clone(),
                name,
                Arc::new(manager),
                config.clone(),
            )?);
        }
        Ok(endpoints)
    }

    /// Add an endpoint, replacing any endpoint for the same resource type.
    pub fn register(&mut self, endpoint: ResourceEndpoint) {
        self.endpoints
            .retain(|existing| existing.resource_type.name != endpoint.resource_type.name);
        self.endpoints.push(endpoint);
    }

    pub fn with_endpoint(mut self, endpoint: ResourceEndpoint) -> Self {
        self.register(endpoint);
        self
    }

    pub fn endpoints(&self) -> &[ResourceEndpoint] {
        &self.endpoints
    }

    /// Endpoint by resource type name (`User`) or path (`/Users`, `Users`).
    pub fn endpoint(&self, name_or_path: &str) -> Option<&ResourceEndpoint> {
        let wanted = name_or_path.trim_start_matches('/');
        self.endpoints.iter().find(|endpoint| {
            let rt = &endpoint.resource_type;
            rt.name.eq_ignore_ascii_case(wanted)
                || rt.endpoint.trim_start_matches('/').eq_ignore_ascii_case(wanted)
        })
    }

    /// Split a request path such as `/Users/2819c223` into its endpoint and
    /// the optional resource identifier.
    pub fn route<'p>(&self, path: &'p str) -> ScimResult<(&ResourceEndpoint, Option<&'p str>)> {
        let trimmed = path.trim().trim_start_matches('/');
        let (endpoint, id) = match trimmed.split_once('/') {
            Some((endpoint, id)) => (endpoint, Some(id).filter(|id| !id.is_empty())),
            None => (trimmed, None),
        };
        let endpoint = self
            .endpoint(endpoint)
            .ok_or_else(|| ScimError::not_found(format!("No endpoint serves path '{}'", path)))?;
        Ok((endpoint, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScimErrorType;
    use serde_json::json;

    fn endpoints() -> EndpointRegistry {
        let registry = Arc::new(SchemaRegistry::new().unwrap());
        EndpointRegistry::in_memory(
            registry,
            EngineConfig::new().with_base_url("https://scim.example.com"),
            &["User", "Group"],
        )
        .unwrap()
    }

    const BJENSEN: &str = r#"{
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "userName": "bjensen",
        "password": "t1meMa$heen",
        "name": {"givenName": "Barbara", "familyName": "Jensen"}
    }"#;

    #[tokio::test]
    async fn test_create_response() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("User").unwrap();
        let response = users.create(BJENSEN, &AttributeSelection::all()).await;

        assert_eq!(response.status, 201);
        let body = response.body.as_ref().unwrap();
        let id = body["id"].as_str().unwrap();
        assert_eq!(
            response.location(),
            Some(format!("https://scim.example.com/v2/Users/{}", id).as_str())
        );
        assert!(response.etag().unwrap().starts_with("W/\""));
        assert_eq!(body["meta"]["resourceType"], "User");
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_create_missing_required_attribute() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("/Users").unwrap();
        let response = users
            .create(
                r#"{"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "displayName": "Anon"}"#,
                &AttributeSelection::all(),
            )
            .await;
        assert_eq!(response.status, 400);
        let body = response.body.unwrap();
        assert_eq!(body["schemas"][0], "urn:ietf:params:scim:api:messages:2.0:Error");
        assert_eq!(body["status"], "400");
        assert!(body["detail"].as_str().unwrap().contains("userName"));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("User").unwrap();
        let response = users.create("{not json", &AttributeSelection::all()).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body.unwrap()["scimType"], "invalidSyntax");
    }

    #[tokio::test]
    async fn test_get_with_selection_and_not_found() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("User").unwrap();
        let created = users.create(BJENSEN, &AttributeSelection::all()).await;
        let id = created.body.unwrap()["id"].as_str().unwrap().to_string();

        let response = users.get(&id, &AttributeSelection::only(["userName"])).await;
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body["userName"], "bjensen");
        assert_eq!(body["id"], id.as_str());
        assert!(body.get("name").is_none());

        let missing = users.get("nope", &AttributeSelection::all()).await;
        assert_eq!(missing.status, 404);
    }

    #[tokio::test]
    async fn test_replace_rejects_read_only_change() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("User").unwrap();
        let created = users.create(BJENSEN, &AttributeSelection::all()).await;
        let id = created.body.unwrap()["id"].as_str().unwrap().to_string();

        let response = users
            .replace(
                &id,
                r#"{"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
                    "userName": "bjensen", "displayName": "Babs"}"#,
                &AttributeSelection::all(),
            )
            .await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_ref().unwrap()["displayName"], "Babs");

        let body = json!({
            "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
            "userName": "bjensen",
            "meta": {"resourceType": "Robot"}
        });
        let response = users.replace(&id, &body.to_string(), &AttributeSelection::all()).await;
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_patch_and_delete() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("User").unwrap();
        let created = users.create(BJENSEN, &AttributeSelection::all()).await;
        let etag = created.etag().unwrap().to_string();
        let id = created.body.unwrap()["id"].as_str().unwrap().to_string();

        let patch = json!({
            "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
            "Operations": [{"op": "replace", "path": "name.givenName", "value": "Babs"}]
        });
        let response = users.patch(&id, &patch.to_string(), &AttributeSelection::all()).await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_ref().unwrap()["name"]["givenName"], "Babs");
        assert_ne!(response.etag().unwrap(), etag);

        assert_eq!(users.delete(&id).await.status, 204);
        assert_eq!(users.delete(&id).await.status, 404);
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let endpoints = endpoints();
        let users = endpoints.endpoint("User").unwrap();
        for name in ["alice", "bob", "carol"] {
            let body = json!({"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": name});
            assert_eq!(users.create(&body.to_string(), &AttributeSelection::all()).await.status, 201);
        }

        let request = SearchRequest::new()
            .with_filter(r#"userName ne "bob""#)
            .with_sort("userName", crate::manager::SortOrder::Descending)
            .with_paging(1, 1);
        let response = users.list(&request).await;
        assert_eq!(response.status, 200);
        let body = response.body.unwrap();
        assert_eq!(body["totalResults"], 2);
        assert_eq!(body["itemsPerPage"], 1);
        assert_eq!(body["Resources"][0]["userName"], "carol");

        let response = users
            .search(r#"{"schemas": ["urn:ietf:params:scim:api:messages:2.0:SearchRequest"], "filter": "nickName xx 1"}"#)
            .await;
        assert_eq!(response.status, 400);
        assert_eq!(response.body.unwrap()["scimType"], "invalidFilter");
    }

    #[test]
    fn test_route() {
        let endpoints = endpoints();
        let (endpoint, id) = endpoints.route("/Users/2819c223").unwrap();
        assert_eq!(endpoint.resource_type().name, "User");
        assert_eq!(id, Some("2819c223"));

        let (endpoint, id) = endpoints.route("Groups").unwrap();
        assert_eq!(endpoint.resource_type().name, "Group");
        assert!(id.is_none());

        let error = endpoints.route("/Devices/1").unwrap_err();
        assert_eq!(error.status(), 404);
        assert_eq!(error.scim_type(), None::<ScimErrorType>);
    }
}
