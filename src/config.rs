//! Engine configuration.
//!
//! Plain data with defaults and builder-style setters. Loading it from files
//! or the environment is left to the host; the types derive `Deserialize` so
//! any serde format works.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
///
/// `base_url` and `scim_version` are combined into canonical resource
/// locations: `{base_url}/{scim_version}/{Endpoint}/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Base URL of the hosting service, without version or path.
    /// Examples: "https://scim.example.com", "https://api.company.com"
    pub base_url: String,

    /// Protocol version segment used in URLs. Defaults to "v2".
    pub scim_version: String,

    /// Bulk request limits.
    pub bulk: BulkConfig,

    /// Filter parser limits.
    pub filter: FilterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            scim_version: "v2".to_string(),
            bulk: BulkConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_scim_version(mut self, version: impl Into<String>) -> Self {
        self.scim_version = version.into();
        self
    }

    pub fn with_bulk(mut self, bulk: BulkConfig) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Canonical location of a resource.
    ///
    /// `endpoint` is the resource type endpoint with or without its leading
    /// slash (`/Users` or `Users`).
    pub fn generate_ref_url(&self, endpoint: &str, resource_id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            self.scim_version,
            endpoint.trim_start_matches('/'),
            resource_id
        )
    }
}

/// Limits applied to a bulk request as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BulkConfig {
    /// Maximum number of operations per request
    pub max_operations: usize,
    /// Maximum request payload size in bytes
    pub max_payload_size: usize,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_operations: 1000,
            max_payload_size: 1_048_576,
        }
    }
}

/// Limits applied to filter expressions before and during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    /// Maximum filter length in bytes
    pub max_length: usize,
    /// Maximum nesting depth of groups, `not` and value filters
    pub max_depth: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 32,
        }
    }
}
