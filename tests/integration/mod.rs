//! Integration tests against the in-memory engine.
//!
//! ## Test Organization
//!
//! - `scenarios` - One test per acceptance scenario: missing required
//!   attribute, codec round trip of group members, canonical filter URI,
//!   bulk references, `failOnErrors`, read-only update rejection
//! - `endpoints` - Create/get/replace/patch/list through response objects
//! - `bulk` - Mixed-method batches, failure capture and batch limits
//! - `properties` - Filter render/parse identity and bulk thresholds

pub mod bulk;
pub mod endpoints;
pub mod properties;
pub mod scenarios;
