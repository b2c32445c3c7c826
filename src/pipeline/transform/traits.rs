//! Trait definitions for the transform pipeline.
//!
//! Five traits define the seams to collaborators the core does not own:
//! - KeyStore: persistent surrogate-key crosswalk
//! - InstanceMapStore: persistent instance deduplication links
//! - ResourceStore: canonical store of resource versions
//! - AuditStore: append-only record of on-demand pulls
//! - Transformer: per-resource-type output mapping

use std::collections::HashMap;

use uuid::Uuid;

use super::context::TransformContext;
use super::error::TransformError;
use crate::models::{InstanceMapping, ResourceContent, ResourceRef, ResourceType, SurrogateId};

/// Persistent surrogate-key store. `find_or_create` must be safe under
/// concurrent callers for the same reference: every caller gets the one
/// surviving key and the store performs at most one creation.
pub trait KeyStore: Send + Sync {
    fn find(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<Option<SurrogateId>, TransformError>;

    fn find_or_create(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<SurrogateId, TransformError>;

    /// Bulk find: one round trip, absent references simply missing from the
    /// returned map.
    fn find_many(
        &self,
        namespace: &str,
        references: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, SurrogateId>, TransformError>;

    /// Bulk find-or-create: one round trip, every reference present in the
    /// returned map.
    fn find_or_create_many(
        &self,
        namespace: &str,
        references: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, SurrogateId>, TransformError>;
}

/// Persistent instance deduplication store. Two references producing the
/// same mapping value must converge on one canonical id, first writer wins.
pub trait InstanceMapStore: Send + Sync {
    fn find_instance_mapping(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<Option<Uuid>, TransformError>;

    fn find_or_create_instance_mapping(
        &self,
        namespace: &str,
        reference: ResourceRef,
        mapping_value: &str,
    ) -> Result<InstanceMapping, TransformError>;
}

/// Canonical store of resource versions. Returns `None` for deleted or
/// unknown resources — the caller treats both as a soft miss.
pub trait ResourceStore: Send + Sync {
    fn current_version(
        &self,
        reference: ResourceRef,
    ) -> Result<Option<ResourceContent>, TransformError>;
}

/// Append-only audit of resources pulled into a run outside their natural
/// batch. Written for crash recovery; the pipeline never reads it back.
pub trait AuditStore: Send + Sync {
    fn record_extra_resource(
        &self,
        namespace: &str,
        run_id: Uuid,
        reference: ResourceRef,
    ) -> Result<(), TransformError>;
}

/// Per-resource-type output mapping, provided by the surrounding crate.
pub trait Transformer: Send + Sync {
    /// Which resource type this transformer handles.
    fn resource_type(&self) -> ResourceType;

    /// Whether resources of this type get a surrogate key minted even when
    /// nothing references them yet. Types answering false are only ever
    /// looked up, never created, on the batch path.
    fn should_always_transform(&self) -> bool {
        true
    }

    /// Write the output rows for one resource version. May resolve
    /// references through `ctx`, which can recurse into other transforms.
    fn transform(
        &self,
        id: SurrogateId,
        content: &ResourceContent,
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError>;

    /// Retract the output rows for a logically deleted resource.
    fn delete(&self, id: SurrogateId, ctx: &TransformContext<'_>) -> Result<(), TransformError>;
}
