//! Bulk response wire model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::BulkMethod;
use crate::error::ScimError;

/// Schema URI of a bulk response body.
pub const BULK_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:BulkResponse";

/// Per-operation results, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    pub schemas: Vec<String>,
    #[serde(rename = "Operations")]
    pub operations: Vec<BulkOperationResponse>,
}

impl BulkResponse {
    pub fn new(operations: Vec<BulkOperationResponse>) -> Self {
        Self {
            schemas: vec![BULK_RESPONSE_SCHEMA.to_string()],
            operations,
        }
    }
}

impl Default for BulkResponse {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Result of one bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationResponse {
    pub method: BulkMethod,
    #[serde(default, rename = "bulkId", skip_serializing_if = "Option::is_none")]
    pub bulk_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// ETag of the resource after the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Resource body on success, error object on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// HTTP status code as a string
    pub status: String,
}

impl BulkOperationResponse {
    pub fn success(method: BulkMethod, bulk_id: Option<String>, status: u16) -> Self {
        Self {
            method,
            bulk_id,
            location: None,
            version: None,
            response: None,
            status: status.to_string(),
        }
    }

    pub fn failure(method: BulkMethod, bulk_id: Option<String>, error: &ScimError) -> Self {
        Self {
            method,
            bulk_id,
            location: None,
            version: None,
            response: serde_json::to_value(error.to_response()).ok(),
            status: error.status().to_string(),
        }
    }

    /// Numeric status; unparseable values count as `500`.
    pub fn status_code(&self) -> u16 {
        self.status.parse().unwrap_or(500)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code())
    }
}
