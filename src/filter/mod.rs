//! Filter engine: textual filter expressions parsed into a schema-resolved AST.
//!
//! Parsing resolves every attribute path through the schema registry, so an
//! unknown attribute fails with `400 invalidFilter` at parse time. Evaluating
//! the AST against stored resources is the storage collaborator's job; see
//! [`crate::storage`] for the in-memory evaluator.
//!
//! ```rust
//! use scim_engine::filter::{Filter, parse_filter};
//! use scim_engine::schema::SchemaRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = SchemaRegistry::new()?;
//! let users = registry.user_schema().expect("User is registered by default");
//! let filter = parse_filter(r#"emails.type eq "work""#, &registry, users)?;
//! assert!(matches!(filter, Filter::Expression(_)));
//! assert_eq!(filter.to_string(), r#"emails.type eq "work""#);
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod builder;
pub mod parser;

pub use ast::{AttributePath, Connective, Expression, Filter, Literal, Operator};
pub use builder::FilterBuilder;
pub use parser::{FilterParser, parse_filter};

/// Canonical textual form of a filter.
pub fn render(filter: &Filter) -> String {
    filter.to_string()
}
