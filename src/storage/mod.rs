//! Reference storage collaborator.
//!
//! The engine talks to storage only through
//! [`ResourceManager`](crate::manager::ResourceManager). This module provides
//! an in-memory implementation of that contract together with the filter
//! evaluator it uses for `list`, so hosts and tests have a working backend
//! without writing one.

pub mod evaluator;
pub mod in_memory;

pub use evaluator::FilterEvaluator;
pub use in_memory::InMemoryResourceManager;
