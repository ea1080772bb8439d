//! Schema-driven SCIM 2.0 protocol engine for Rust.
//!
//! Turns SCIM JSON payloads into schema-checked attribute value trees, runs
//! them through the boundary validators and hands them to a pluggable
//! [`ResourceManager`]. Transport is left to the host: endpoints take request
//! bodies as strings and return a [`ScimResponse`] with status, headers and
//! JSON body.
//!
//! # Core Components
//!
//! - [`SchemaRegistry`] - Core schemas, resource types and attribute resolution
//! - [`ScimResource`] - Attribute value tree of one resource instance
//! - [`JsonDecoder`] / [`JsonEncoder`] - Schema-guided JSON codec
//! - [`parse_filter`] - Filter expressions parsed into a resolved AST
//! - [`ResourceEndpoint`] - Create/get/replace/patch/delete/list for one resource type
//! - [`BulkProcessor`] - Ordered bulk operations with `bulkId` references
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scim_engine::{AttributeSelection, EndpointRegistry, EngineConfig, SchemaRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new().with_base_url("https://scim.example.com/v2");
//! let registry = Arc::new(SchemaRegistry::new()?);
//! let endpoints = EndpointRegistry::in_memory(registry, config, &["User", "Group"])?;
//!
//! let users = endpoints.endpoint("/Users").expect("User endpoint registered");
//! let response = users
//!     .create(
//!         r#"{"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "bjensen"}"#,
//!         &AttributeSelection::all(),
//!     )
//!     .await;
//! assert_eq!(response.status, 201);
//! # Ok(())
//! # }
//! ```

pub mod attribute;
pub mod bulk;
pub mod codec;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod manager;
pub mod patch;
pub mod schema;
pub mod storage;
pub mod version;

// Re-export commonly used types for convenience
pub use attribute::{Attribute, AttributeSelection, ScimResource, SimpleValue};
pub use bulk::{BulkOutcome, BulkProcessor, BulkRequest, BulkResponse, BulkState};
pub use codec::{JsonDecoder, JsonEncoder};
pub use config::{BulkConfig, EngineConfig, FilterConfig};
pub use endpoint::{EndpointRegistry, ResourceEndpoint, ScimResponse};
pub use error::{ScimError, ScimErrorType, ScimResult};
pub use filter::{Filter, FilterBuilder, parse_filter};
pub use manager::{ListQuery, ListResponse, ResourceManager, SearchRequest, SortOrder};
pub use patch::{PatchOp, PatchOperation, PatchRequest};
pub use schema::{OperationContext, ResourceTypeSchema, Schema, SchemaRegistry};
pub use storage::InMemoryResourceManager;
