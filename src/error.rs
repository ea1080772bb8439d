//! Error types for SCIM engine operations.
//!
//! Every failure the engine reports maps onto one protocol status code and,
//! for `400` responses, an optional coarse `scimType` token. The wire form of
//! an error is [`ErrorResponse`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema URI carried by every SCIM error object.
pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Main error type for SCIM engine operations.
///
/// Variants follow the protocol error taxonomy. `Internal` is the defect class:
/// an unexpected state inside the engine or a collaborator, reported as `500`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScimError {
    /// Malformed or non-conforming input
    #[error("Bad request: {detail}")]
    BadRequest {
        detail: String,
        scim_type: Option<ScimErrorType>,
    },

    /// Attribute name, path or URI matched nothing in the schema
    #[error("Unresolved attribute: '{path}'")]
    UnresolvedAttribute { path: String },

    /// Target resource does not exist
    #[error("Resource not found: {detail}")]
    NotFound { detail: String },

    /// Duplicate value for a unique attribute
    #[error("Conflict: {detail}")]
    Conflict { detail: String },

    /// Operation not permitted
    #[error("Forbidden: {detail}")]
    Forbidden { detail: String },

    /// Request or response format the engine does not speak
    #[error("Format not supported: {detail}")]
    FormatNotSupported { detail: String },

    /// Batch exceeds configured bulk limits
    #[error("Payload too large: {detail}")]
    PayloadTooLarge { detail: String },

    /// Defect or unexpected state
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Coarse protocol error-type tokens (RFC 7644 §3.12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScimErrorType {
    InvalidFilter,
    TooMany,
    Uniqueness,
    Mutability,
    InvalidSyntax,
    InvalidPath,
    NoTarget,
    InvalidValue,
    InvalidVers,
    Sensitive,
}

impl ScimErrorType {
    /// Wire token for this error type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidFilter => "invalidFilter",
            Self::TooMany => "tooMany",
            Self::Uniqueness => "uniqueness",
            Self::Mutability => "mutability",
            Self::InvalidSyntax => "invalidSyntax",
            Self::InvalidPath => "invalidPath",
            Self::NoTarget => "noTarget",
            Self::InvalidValue => "invalidValue",
            Self::InvalidVers => "invalidVers",
            Self::Sensitive => "sensitive",
        }
    }
}

impl fmt::Display for ScimErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Convenience methods for creating common errors
impl ScimError {
    /// Create a bad request error without a scimType token
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
            scim_type: None,
        }
    }

    /// Create a bad request error carrying a scimType token
    pub fn bad_request_typed(scim_type: ScimErrorType, detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
            scim_type: Some(scim_type),
        }
    }

    /// Create an invalid filter error
    pub fn invalid_filter(detail: impl Into<String>) -> Self {
        Self::bad_request_typed(ScimErrorType::InvalidFilter, detail)
    }

    /// Create an invalid syntax error
    pub fn invalid_syntax(detail: impl Into<String>) -> Self {
        Self::bad_request_typed(ScimErrorType::InvalidSyntax, detail)
    }

    /// Create an invalid value error
    pub fn invalid_value(detail: impl Into<String>) -> Self {
        Self::bad_request_typed(ScimErrorType::InvalidValue, detail)
    }

    /// Create an unresolved attribute error
    pub fn unresolved(path: impl Into<String>) -> Self {
        Self::UnresolvedAttribute { path: path.into() }
    }

    /// Create a resource not found error
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Create a resource not found error for a typed resource
    pub fn resource_not_found(resource_type: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::not_found(format!("{} with id '{}' does not exist", resource_type, id))
    }

    /// Create a uniqueness conflict error
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    /// Create a format not supported error
    pub fn format_not_supported(detail: impl Into<String>) -> Self {
        Self::FormatNotSupported {
            detail: detail.into(),
        }
    }

    /// Create a bulk limit error
    pub fn too_many(detail: impl Into<String>) -> Self {
        Self::PayloadTooLarge {
            detail: detail.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest { .. } | Self::UnresolvedAttribute { .. } => 400,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::PayloadTooLarge { .. } => 413,
            Self::FormatNotSupported { .. } => 415,
            Self::Internal { .. } => 500,
        }
    }

    /// Coarse error-type token, if the error carries one.
    pub fn scim_type(&self) -> Option<ScimErrorType> {
        match self {
            Self::BadRequest { scim_type, .. } => *scim_type,
            Self::UnresolvedAttribute { .. } => Some(ScimErrorType::InvalidPath),
            Self::Conflict { .. } => Some(ScimErrorType::Uniqueness),
            Self::PayloadTooLarge { .. } => Some(ScimErrorType::TooMany),
            _ => None,
        }
    }

    /// Human-readable detail safe to expose on the wire.
    pub fn detail(&self) -> String {
        match self {
            Self::BadRequest { detail, .. }
            | Self::NotFound { detail }
            | Self::Conflict { detail }
            | Self::Forbidden { detail }
            | Self::FormatNotSupported { detail }
            | Self::PayloadTooLarge { detail } => detail.clone(),
            Self::UnresolvedAttribute { path } => format!("Unresolved attribute '{}'", path),
            Self::Internal { .. } => "Internal error while processing the request".to_string(),
        }
    }

    /// Wire error object for this error.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            schemas: vec![ERROR_SCHEMA.to_string()],
            status: self.status().to_string(),
            scim_type: self.scim_type(),
            detail: self.detail(),
        }
    }
}

impl From<serde_json::Error> for ScimError {
    fn from(error: serde_json::Error) -> Self {
        Self::invalid_syntax(format!("Malformed JSON: {}", error))
    }
}

/// SCIM error object as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Always contains the Error schema URI
    pub schemas: Vec<String>,
    /// HTTP status code as a string
    pub status: String,
    /// Optional coarse error-type token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<ScimErrorType>,
    /// Human-readable error detail
    pub detail: String,
}

// Result type alias for convenience
pub type ScimResult<T> = Result<T, ScimError>;
