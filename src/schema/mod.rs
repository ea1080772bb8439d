//! Schema definitions, registry and boundary validation for SCIM resources.
//!
//! This module provides the schema registry implementing the RFC 7643 core
//! schemas and the validators that enforce schema policy on attribute value
//! trees at create, update and retrieve boundaries.
//!
//! # Key Types
//!
//! - [`Schema`] - SCIM schema definition with attributes and metadata
//! - [`SchemaRegistry`] - Registry for managing and resolving schemas
//! - [`AttributeSchema`] - Individual attribute specifications and policy axes
//! - [`ResourceTypeSchema`] - Primary schema plus extensions for one resource type
//!
//! # Examples
//!
//! ```rust
//! use scim_engine::schema::SchemaRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let user = registry.user_schema().expect("User is registered by default");
//! let attr = registry.resolve_attribute("emails.type", user)?;
//! assert_eq!(attr.uri, "urn:ietf:params:scim:schemas:core:2.0:User:emails.type");
//! # Ok(())
//! # }
//! ```

pub mod embedded;
pub mod registry;
pub mod types;
pub mod validation;


// Re-export the main types for convenience
pub use registry::{ResolvedAttribute, SchemaRegistry};
pub use types::{
    AttributeSchema, DataType, Mutability, ResourceTypeSchema, Returned, Schema,
    SchemaExtension, Uniqueness,
};
pub use validation::OperationContext;
