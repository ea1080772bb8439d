//! Common test utilities: engine setup shared by the integration tests.

use std::sync::Arc;

use scim_engine::{EndpointRegistry, EngineConfig, ResourceEndpoint, SchemaRegistry};

pub mod fixtures;

pub const BASE_URL: &str = "https://example.com";

/// Route `log` output through the test harness; safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> EngineConfig {
    EngineConfig::new().with_base_url(BASE_URL)
}

pub fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::new().expect("core schemas load"))
}

/// Fresh in-memory `User` and `Group` endpoints.
pub fn endpoints() -> EndpointRegistry {
    init_logging();
    EndpointRegistry::in_memory(registry(), config(), &["User", "Group"])
        .expect("in-memory endpoints")
}

pub fn users(endpoints: &EndpointRegistry) -> &ResourceEndpoint {
    endpoints.endpoint("/Users").expect("User endpoint registered")
}

pub fn groups(endpoints: &EndpointRegistry) -> &ResourceEndpoint {
    endpoints.endpoint("/Groups").expect("Group endpoint registered")
}
