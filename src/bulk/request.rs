//! Bulk request wire model.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::BulkConfig;
use crate::error::{ScimError, ScimResult};

/// Schema URI of a bulk request body.
pub const BULK_REQUEST_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:BulkRequest";

/// Prefix marking a temporary reference to another operation's result.
pub const BULK_ID_PREFIX: &str = "bulkId:";

/// A batch of operations processed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    #[serde(default)]
    pub schemas: Vec<String>,
    /// Failures tolerated before the batch aborts; absent means unbounded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on_errors: Option<usize>,
    #[serde(rename = "Operations")]
    pub operations: Vec<BulkOperation>,
}

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOperation {
    pub method: BulkMethod,
    /// Client token other operations use to reference this one's result
    #[serde(
        default,
        rename = "bulkId",
        alias = "bulkID",
        skip_serializing_if = "Option::is_none"
    )]
    pub bulk_id: Option<String>,
    /// Endpoint path, e.g. `/Users` or `/Groups/{id}`
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// ETag the client expects the target to carry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// HTTP method of a bulk operation. Parsed case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum BulkMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl TryFrom<String> for BulkMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Unsupported bulk method: {}", value)),
        }
    }
}

impl fmt::Display for BulkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        })
    }
}

impl BulkRequest {
    pub fn new(operations: Vec<BulkOperation>) -> Self {
        Self {
            schemas: vec![BULK_REQUEST_SCHEMA.to_string()],
            fail_on_errors: None,
            operations,
        }
    }

    pub fn with_fail_on_errors(mut self, fail_on_errors: usize) -> Self {
        self.fail_on_errors = Some(fail_on_errors);
        self
    }

    /// Parse a bulk request body and apply the batch limits.
    ///
    /// Oversized payloads and operation counts fail with `413 tooMany`;
    /// malformed bodies, a missing schema URI and duplicate `bulkId`s fail
    /// with `400`. All of these reject the batch as a whole.
    pub fn from_json(body: &str, limits: &BulkConfig) -> ScimResult<Self> {
        if body.len() > limits.max_payload_size {
            return Err(ScimError::too_many(format!(
                "Bulk payload of {} bytes exceeds the maximum of {}",
                body.len(),
                limits.max_payload_size
            )));
        }

        let request: BulkRequest = serde_json::from_str(body)?;
        if !request
            .schemas
            .iter()
            .any(|s| s.eq_ignore_ascii_case(BULK_REQUEST_SCHEMA))
        {
            return Err(ScimError::invalid_syntax(format!(
                "Bulk request must declare schema '{}'",
                BULK_REQUEST_SCHEMA
            )));
        }
        request.check(limits)?;
        Ok(request)
    }

    /// Operation count and `bulkId` uniqueness checks.
    pub fn check(&self, limits: &BulkConfig) -> ScimResult<()> {
        if self.operations.len() > limits.max_operations {
            return Err(ScimError::too_many(format!(
                "Bulk request has {} operations, the maximum is {}",
                self.operations.len(),
                limits.max_operations
            )));
        }

        let mut seen = HashSet::new();
        for bulk_id in self.operations.iter().filter_map(|op| op.bulk_id.as_deref()) {
            if !seen.insert(bulk_id) {
                return Err(ScimError::invalid_value(format!("Duplicate bulkId '{}'", bulk_id)));
            }
        }
        Ok(())
    }

    /// Operation indexes grouped by the endpoint segment of their path.
    pub fn partition(&self) -> BTreeMap<String, Vec<usize>> {
        let mut partition: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, operation) in self.operations.iter().enumerate() {
            partition
                .entry(operation.endpoint().to_string())
                .or_default()
                .push(index);
        }
        partition
    }
}

impl BulkOperation {
    pub fn post(path: impl Into<String>, bulk_id: impl Into<String>, data: Value) -> Self {
        Self {
            method: BulkMethod::Post,
            bulk_id: Some(bulk_id.into()),
            path: path.into(),
            data: Some(data),
            version: None,
        }
    }

    pub fn put(path: impl Into<String>, data: Value) -> Self {
        Self {
            method: BulkMethod::Put,
            bulk_id: None,
            path: path.into(),
            data: Some(data),
            version: None,
        }
    }

    pub fn patch(path: impl Into<String>, data: Value) -> Self {
        Self {
            method: BulkMethod::Patch,
            bulk_id: None,
            path: path.into(),
            data: Some(data),
            version: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: BulkMethod::Delete,
            bulk_id: None,
            path: path.into(),
            data: None,
            version: None,
        }
    }

    /// First path segment without the leading slash: `Users` for `/Users/1`.
    pub fn endpoint(&self) -> &str {
        let trimmed = self.path.trim().trim_start_matches('/');
        trimmed.split('/').next().unwrap_or(trimmed)
    }
}

/// The bulkId a value refers to, if it is a temporary reference.
pub(crate) fn bulk_reference(value: &str) -> Option<&str> {
    value
        .get(..BULK_ID_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(BULK_ID_PREFIX))
        .map(|_| &value[BULK_ID_PREFIX.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScimErrorType;

    const BODY: &str = r#"{
        "schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],
        "failOnErrors": 1,
        "Operations": [
            {"method": "POST", "path": "/Users", "bulkId": "qwerty",
             "data": {"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "Alice"}},
            {"method": "patch", "path": "/Groups/e9e30dba", "version": "W/\"3694e05e9dff591\"",
             "data": {"schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"], "Operations": []}},
            {"method": "DELETE", "path": "/Users/b7c14771", "bulkID": "del"}
        ]
    }"#;

    #[test]
    fn test_parse_request() {
        let request = BulkRequest::from_json(BODY, &BulkConfig::default()).unwrap();
        assert_eq!(request.fail_on_errors, Some(1));
        assert_eq!(request.operations.len(), 3);
        assert_eq!(request.operations[0].method, BulkMethod::Post);
        assert_eq!(request.operations[1].method, BulkMethod::Patch);
        assert_eq!(request.operations[1].version.as_deref(), Some("W/\"3694e05e9dff591\""));
        assert_eq!(request.operations[2].bulk_id.as_deref(), Some("del"));
    }

    #[test]
    fn test_partition_by_endpoint() {
        let request = BulkRequest::from_json(BODY, &BulkConfig::default()).unwrap();
        let partition = request.partition();
        assert_eq!(partition["Users"], vec![0, 2]);
        assert_eq!(partition["Groups"], vec![1]);
    }

    #[test]
    fn test_limits() {
        let limits = BulkConfig {
            max_operations: 2,
            max_payload_size: 1_048_576,
        };
        let error = BulkRequest::from_json(BODY, &limits).unwrap_err();
        assert_eq!(error.status(), 413);
        assert_eq!(error.scim_type(), Some(ScimErrorType::TooMany));

        let limits = BulkConfig {
            max_operations: 10,
            max_payload_size: 64,
        };
        assert_eq!(BulkRequest::from_json(BODY, &limits).unwrap_err().status(), 413);
    }

    #[test]
    fn test_invalid_requests() {
        let limits = BulkConfig::default();
        let error = BulkRequest::from_json(r#"{"Operations": []}"#, &limits).unwrap_err();
        assert_eq!(error.scim_type(), Some(ScimErrorType::InvalidSyntax));

        let error = BulkRequest::from_json(
            r#"{"schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],
                "Operations": [{"method": "GET", "path": "/Users"}]}"#,
            &limits,
        )
        .unwrap_err();
        assert_eq!(error.status(), 400);

        let error = BulkRequest::from_json(
            r#"{"schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],
                "Operations": [
                    {"method": "POST", "path": "/Users", "bulkId": "a", "data": {}},
                    {"method": "POST", "path": "/Users", "bulkId": "a", "data": {}}
                ]}"#,
            &limits,
        )
        .unwrap_err();
        assert_eq!(error.scim_type(), Some(ScimErrorType::InvalidValue));
    }

    #[test]
    fn test_bulk_reference() {
        assert_eq!(bulk_reference("bulkId:qwerty"), Some("qwerty"));
        assert_eq!(bulk_reference("BULKID:qwerty"), Some("qwerty"));
        assert_eq!(bulk_reference("2819c223"), None);
        assert_eq!(bulk_reference("bulk"), None);
    }
}
