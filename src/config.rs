use serde::{Deserialize, Serialize};

use crate::models::ResourceType;

/// Crate-level constants
pub const CRATE_NAME: &str = "crosswalk";
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset
pub fn default_log_filter() -> &'static str {
    "info,crosswalk=debug"
}

/// Configuration for one transform deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Output namespace the surrogate key space is scoped to
    /// (one per subscriber database).
    pub namespace: String,
    /// Resource types whose instances may be duplicates of one real-world
    /// entity across source systems.
    pub instance_mappable: Vec<ResourceType>,
    /// Retries of the canonical-id lookup when an instance-mapping redirect
    /// is not yet visible (one initial attempt plus this many retries).
    pub redirect_retry_attempts: u32,
    /// Base delay before the first retry; doubles per attempt.
    pub redirect_retry_base_ms: u64,
    /// Upper bound of the uniform jitter added to each retry delay.
    pub redirect_retry_jitter_ms: u64,
}

impl TransformConfig {
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn is_instance_mappable(&self, resource_type: ResourceType) -> bool {
        self.instance_mappable.contains(&resource_type)
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            instance_mappable: vec![ResourceType::Organization, ResourceType::Practitioner],
            redirect_retry_attempts: 3,
            redirect_retry_base_ms: 250,
            redirect_retry_jitter_ms: 50,
        }
    }
}
