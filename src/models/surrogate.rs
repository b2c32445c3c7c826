//! Surrogate keys and instance mappings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The stable integer key assigned to a resource for the output store.
///
/// Opaque outside the key store: callers compare and print it, nothing else.
/// Once assigned to a reference it is never reused or reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurrogateId(i64);

impl SurrogateId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SurrogateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deduplication link collapsing one source resource onto the canonical
/// instance of the real-world entity it represents.
///
/// `canonical_id == resource_id` when the resource is not a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceMapping {
    pub resource_id: Uuid,
    pub canonical_id: Uuid,
    pub mapping_value: Option<String>,
}

impl InstanceMapping {
    pub fn is_duplicate(&self) -> bool {
        self.resource_id != self.canonical_id
    }
}
