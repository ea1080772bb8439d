//! SCIM bulk operations (`POST /Bulk`).
//!
//! A [`BulkRequest`] carries an ordered list of POST/PUT/PATCH/DELETE
//! operations against the registered endpoints. [`BulkProcessor`] runs them
//! one at a time, substitutes `bulkId:` references with identifiers created
//! earlier in the batch and collects one [`BulkOperationResponse`] per
//! attempted operation.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scim_engine::bulk::BulkProcessor;
//! use scim_engine::config::EngineConfig;
//! use scim_engine::endpoint::EndpointRegistry;
//! use scim_engine::schema::SchemaRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new();
//! let registry = Arc::new(SchemaRegistry::new()?);
//! let endpoints = EndpointRegistry::in_memory(registry, config.clone(), &["User", "Group"])?;
//!
//! let processor = BulkProcessor::new(&endpoints, config.bulk);
//! let response = processor.handle(r#"{
//!     "schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],
//!     "Operations": [
//!         {"method": "POST", "path": "/Users", "bulkId": "u1",
//!          "data": {"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "bjensen"}}
//!     ]
//! }"#).await;
//! assert_eq!(response.status, 200);
//! # Ok(())
//! # }
//! ```

pub mod processor;
pub mod request;
pub mod response;

pub use processor::{BulkOutcome, BulkProcessor, BulkState};
pub use request::{BULK_ID_PREFIX, BULK_REQUEST_SCHEMA, BulkMethod, BulkOperation, BulkRequest};
pub use response::{BULK_RESPONSE_SCHEMA, BulkOperationResponse, BulkResponse};
