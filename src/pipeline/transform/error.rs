//! Transform-pipeline error types.
//!
//! One resource failing aborts its batch; the wrapping variant carries the
//! failing resource's identity so the caller knows what to retry.

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ResourceRef, ResourceType};

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Transform of {resource_type}/{resource_id} failed: {source}")]
    Transform {
        resource_type: ResourceType,
        resource_id: Uuid,
        #[source]
        source: Box<TransformError>,
    },

    #[error("Unsupported resource shape: {0}")]
    UnsupportedShape(String),

    #[error("No transformer registered for resource type: {0}")]
    MissingTransformer(ResourceType),

    #[error("Failed to find mapped instance id for {resource_type}/{resource_id} after {attempts} retries")]
    MappedInstanceNotFound {
        resource_type: ResourceType,
        resource_id: Uuid,
        attempts: u32,
    },
}

impl TransformError {
    /// Attach the failing resource's identity. Already-wrapped errors pass
    /// through so the innermost resource is the one reported.
    pub(crate) fn with_context(self, reference: ResourceRef) -> Self {
        match self {
            already @ Self::Transform { .. } => already,
            other => Self::Transform {
                resource_type: reference.resource_type,
                resource_id: reference.id,
                source: Box::new(other),
            },
        }
    }
}
