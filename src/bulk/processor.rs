//! Bulk batch state machine.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde_json::Value;

use super::request::{BULK_ID_PREFIX, BulkMethod, BulkOperation, BulkRequest, bulk_reference};
use super::response::{BulkOperationResponse, BulkResponse};
use crate::attribute::{AttributeSelection, ScimResource};
use crate::codec::JsonEncoder;
use crate::config::BulkConfig;
use crate::endpoint::{EndpointRegistry, ResourceEndpoint, ScimResponse};
use crate::error::{ScimError, ScimErrorType, ScimResult};
use crate::version::weak_etag;

/// Lifecycle of one batch. `Completed` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkState {
    Pending,
    Processing,
    /// Every operation was attempted
    Completed,
    /// The failure count reached `failOnErrors`; later operations were skipped
    Aborted,
}

/// Terminal state of a batch plus the responses it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub state: BulkState,
    pub response: BulkResponse,
}

/// Result recorded for a `bulkId` once its operation succeeds.
#[derive(Debug, Clone)]
struct Resolved {
    id: String,
    location: String,
}

/// What a successful operation produced.
struct Executed<'e> {
    endpoint: &'e ResourceEndpoint,
    status: u16,
    /// Resulting resource; `None` after a delete
    resource: Option<ScimResource>,
    /// Identifier the operation addressed, after reference substitution
    target: Option<String>,
}

/// Reference bookkeeping for one in-flight batch.
#[derive(Debug, Default)]
struct Batch {
    resolved: HashMap<String, Resolved>,
    failed: HashSet<String>,
    errors: usize,
}

impl Batch {
    fn resolve(&self, bulk_id: &str) -> ScimResult<&Resolved> {
        if let Some(resolved) = self.resolved.get(bulk_id) {
            return Ok(resolved);
        }
        let detail = if self.failed.contains(bulk_id) {
            format!("bulkId '{}' refers to an operation that failed", bulk_id)
        } else {
            format!("bulkId '{}' does not refer to an earlier operation", bulk_id)
        };
        Err(ScimError::invalid_value(detail))
    }

    /// Replace every `bulkId:X` string in `value` with X's identifier.
    /// A reference held by a `$ref` member becomes X's location instead.
    fn substitute(&self, value: &mut Value) -> ScimResult<()> {
        match value {
            Value::String(text) => {
                if let Some(bulk_id) = bulk_reference(text) {
                    *text = self.resolve(bulk_id)?.id.clone();
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.substitute(item)?;
                }
            }
            Value::Object(members) => {
                for (name, member) in members.iter_mut() {
                    match member {
                        Value::String(text) if name == "$ref" => {
                            if let Some(bulk_id) = bulk_reference(text) {
                                *text = self.resolve(bulk_id)?.location.clone();
                            }
                        }
                        member => self.substitute(member)?,
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Replace a `bulkId:X` path segment with X's identifier.
    fn substitute_path(&self, path: &str) -> ScimResult<String> {
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match bulk_reference(segment) {
                Some(bulk_id) => segments.push(self.resolve(bulk_id)?.id.clone()),
                None => segments.push(segment.to_string()),
            }
        }
        Ok(segments.join("/"))
    }
}

/// Runs bulk batches against a set of endpoints.
///
/// Operations execute one at a time in request order. A failing operation
/// is captured as its own response and never stops the batch unless the
/// failure count reaches `failOnErrors`.
#[derive(Debug, Clone)]
pub struct BulkProcessor<'e> {
    endpoints: &'e EndpointRegistry,
    limits: BulkConfig,
}

impl<'e> BulkProcessor<'e> {
    pub fn new(endpoints: &'e EndpointRegistry, limits: BulkConfig) -> Self {
        Self { endpoints, limits }
    }

    /// `POST /Bulk`: parse, run and wrap the outcome in a response envelope.
    ///
    /// Batch-level failures (limits, malformed body) become an error response;
    /// otherwise the status is `200` whatever the individual operations did.
    pub async fn handle(&self, body: &str) -> ScimResponse {
        match self.process_json(body).await {
            Ok(outcome) => match serde_json::to_value(&outcome.response) {
                Ok(body) => ScimResponse::new(200).with_body(body),
                Err(e) => ScimResponse::from_error(&ScimError::internal(format!(
                    "Failed to serialize bulk response: {}",
                    e
                ))),
            },
            Err(error) => {
                info!("Bulk request rejected: {}", error);
                ScimResponse::from_error(&error)
            }
        }
    }

    pub async fn process_json(&self, body: &str) -> ScimResult<BulkOutcome> {
        let request = BulkRequest::from_json(body, &self.limits)?;
        Ok(self.process(&request).await)
    }

    /// Run every operation of `request`, stopping early only when a failure
    /// brings the count to `failOnErrors`. Successful operations never abort.
    pub async fn process(&self, request: &BulkRequest) -> BulkOutcome {
        let mut state = BulkState::Pending;
        debug!("Bulk batch {:?} with {} operations", state, request.operations.len());

        for (endpoint, indexes) in request.partition() {
            if self.endpoints.endpoint(&endpoint).is_none() {
                warn!("Bulk operations {:?} target unknown endpoint '{}'", indexes, endpoint);
            } else {
                debug!("Bulk operations {:?} target '{}'", indexes, endpoint);
            }
        }

        state = BulkState::Processing;
        let mut batch = Batch::default();
        let mut responses = Vec::with_capacity(request.operations.len());

        for (index, operation) in request.operations.iter().enumerate() {
            let response = match self.run(operation, &batch).await {
                Ok(executed) => Self::succeeded(operation, executed, &mut batch),
                Err(error) => {
                    warn!(
                        "Bulk operation {} ({} {}, bulkId {:?}) failed: {}",
                        index, operation.method, operation.path, operation.bulk_id, error
                    );
                    if let Some(bulk_id) = &operation.bulk_id {
                        batch.failed.insert(bulk_id.clone());
                    }
                    batch.errors += 1;
                    responses.push(BulkOperationResponse::failure(
                        operation.method,
                        operation.bulk_id.clone(),
                        &error,
                    ));

                    if request
                        .fail_on_errors
                        .is_some_and(|threshold| batch.errors >= threshold)
                    {
                        state = BulkState::Aborted;
                        info!(
                            "Bulk batch aborted after operation {}: {} errors reached failOnErrors",
                            index, batch.errors
                        );
                        break;
                    }
                    continue;
                }
            };
            responses.push(response);
        }

        if state == BulkState::Processing {
            state = BulkState::Completed;
        }
        debug!("Bulk batch {:?} with {} responses", state, responses.len());
        BulkOutcome {
            state,
            response: BulkResponse::new(responses),
        }
    }

    /// Resolve references, route and dispatch one operation.
    async fn run(
        &self,
        operation: &BulkOperation,
        batch: &Batch,
    ) -> ScimResult<Executed<'e>> {
        let path = batch.substitute_path(&operation.path)?;
        let (endpoint, id) = self.endpoints.route(&path)?;
        let selection = AttributeSelection::all();
        let executed = |status, resource| Executed {
            endpoint,
            status,
            resource,
            target: id.map(String::from),
        };

        let mut data = operation.data.clone();
        if let Some(data) = data.as_mut() {
            batch.substitute(data)?;
        }
        let require_data = || {
            data.as_ref().ok_or_else(|| {
                ScimError::invalid_syntax(format!("{} operation requires 'data'", operation.method))
            })
        };
        let require_id = || {
            id.ok_or_else(|| {
                ScimError::bad_request_typed(
                    ScimErrorType::NoTarget,
                    format!("{} operation requires a resource path", operation.method),
                )
            })
        };

        match operation.method {
            BulkMethod::Post => {
                if id.is_some() {
                    return Err(ScimError::invalid_syntax(
                        "POST operation path must name an endpoint, not a resource",
                    ));
                }
                if operation.bulk_id.is_none() {
                    return Err(ScimError::invalid_syntax("POST operation requires a bulkId"));
                }
                let created = endpoint.create_resource(require_data()?, &selection).await?;
                Ok(executed(201, Some(created)))
            }
            BulkMethod::Put => {
                let updated = endpoint
                    .replace_resource(require_id()?, require_data()?, &selection)
                    .await?;
                Ok(executed(200, Some(updated)))
            }
            BulkMethod::Patch => {
                let patched = endpoint
                    .patch_resource(require_id()?, require_data()?, &selection)
                    .await?;
                Ok(executed(200, Some(patched)))
            }
            BulkMethod::Delete => {
                endpoint.delete_resource(require_id()?).await?;
                Ok(executed(204, None))
            }
        }
    }

    fn succeeded(operation: &BulkOperation, executed: Executed<'_>, batch: &mut Batch) -> BulkOperationResponse {
        let Executed {
            endpoint,
            status,
            resource,
            target,
        } = executed;
        let mut response = BulkOperationResponse::success(operation.method, operation.bulk_id.clone(), status);
        let Some(resource) = resource else {
            response.location = target.map(|id| endpoint.location_of(&id));
            return response;
        };

        let location = resource
            .location()
            .map(String::from)
            .or_else(|| resource.id().map(|id| endpoint.location_of(id)));
        response.location = location.clone();
        response.version = resource.version().map(weak_etag);
        response.response = match JsonEncoder::new(endpoint.registry())
            .encode_value(&resource, &AttributeSelection::all())
        {
            Ok(body) => Some(body),
            Err(error) => {
                warn!(
                    "Bulk operation {} {} succeeded but its resource could not be encoded: {}",
                    operation.method, operation.path, error
                );
                None
            }
        };

        if let (BulkMethod::Post, Some(bulk_id), Some(id)) =
            (operation.method, &operation.bulk_id, resource.id())
        {
            debug!("Resolved {}{} to '{}'", BULK_ID_PREFIX, bulk_id, id);
            batch.resolved.insert(
                bulk_id.clone(),
                Resolved {
                    id: id.to_string(),
                    location: location.unwrap_or_default(),
                },
            );
        }
        response
    }
}
