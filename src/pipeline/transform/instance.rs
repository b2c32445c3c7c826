//! Instance deduplication.
//!
//! Some source systems register the same real-world organisation or
//! practitioner more than once. The mapper derives a deterministic mapping
//! value from resource content and lets the store converge every resource
//! with that value onto one canonical id.

use std::sync::Arc;

use uuid::Uuid;

use super::cache::IdCache;
use super::error::TransformError;
use super::traits::InstanceMapStore;
use crate::models::{ResourceContent, ResourceRef, ResourceType};

const ODS_SYSTEM_SUFFIX: &str = "ods-organization-code";

/// Resolves a resource to the canonical id of the entity it represents.
pub struct InstanceMapper {
    namespace: String,
    cache: Arc<IdCache>,
    store: Arc<dyn InstanceMapStore>,
    mappable: Vec<ResourceType>,
}

impl InstanceMapper {
    pub fn new(
        namespace: String,
        cache: Arc<IdCache>,
        store: Arc<dyn InstanceMapStore>,
        mappable: Vec<ResourceType>,
    ) -> Self {
        Self { namespace, cache, store, mappable }
    }

    pub fn is_mappable(&self, resource_type: ResourceType) -> bool {
        self.mappable.contains(&resource_type)
    }

    /// Canonical id for a resource whose content is already in hand.
    pub fn resolve(
        &self,
        reference: ResourceRef,
        content: &ResourceContent,
    ) -> Result<Uuid, TransformError> {
        self.resolve_lazy(reference, || Ok(Some(content.clone())))
    }

    /// Canonical id, fetching content only when no mapping exists yet.
    /// Content absent (deleted/unknown resource) means the resource maps to
    /// itself — there is nothing to derive a mapping value from.
    pub fn resolve_lazy<F>(
        &self,
        reference: ResourceRef,
        content_provider: F,
    ) -> Result<Uuid, TransformError>
    where
        F: FnOnce() -> Result<Option<ResourceContent>, TransformError>,
    {
        if let Some(canonical) = self.cache.get_instance(&self.namespace, reference) {
            return Ok(canonical);
        }
        if let Some(canonical) = self.store.find_instance_mapping(&self.namespace, reference)? {
            self.cache.insert_instance(&self.namespace, reference, canonical);
            return Ok(canonical);
        }

        let value = content_provider()?
            .and_then(|content| mapping_value(reference.resource_type, &content));
        let canonical = match value {
            Some(value) => {
                let mapping = self
                    .store
                    .find_or_create_instance_mapping(&self.namespace, reference, &value)?;
                if mapping.is_duplicate() {
                    tracing::debug!(
                        resource = %reference,
                        canonical = %mapping.canonical_id,
                        mapping_value = %value,
                        "Resource is a duplicate instance"
                    );
                }
                mapping.canonical_id
            }
            // Underivable values never converge with anything; cache the
            // self-mapping without a store write.
            None => reference.id,
        };
        self.cache.insert_instance(&self.namespace, reference, canonical);
        Ok(canonical)
    }
}

/// Deterministic, business-defined identity of the real-world entity behind
/// a resource. `None` when the content carries too little to decide.
pub fn mapping_value(resource_type: ResourceType, content: &ResourceContent) -> Option<String> {
    match resource_type {
        ResourceType::Organization => organization_code(content),
        ResourceType::Practitioner => practitioner_identity(content),
        _ => None,
    }
}

/// Organisation identity is its external (ODS) code. Prefer the identifier
/// carrying the ODS system; fall back to the first non-blank identifier.
fn organization_code(content: &ResourceContent) -> Option<String> {
    let identifiers = content.body().get("identifier")?.as_array()?;
    let mut fallback = None;
    for entry in identifiers {
        let Some(value) = entry.get("value").and_then(|v| v.as_str()) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let system = entry.get("system").and_then(|v| v.as_str()).unwrap_or("");
        if system.ends_with(ODS_SYSTEM_SUFFIX) {
            return Some(value.to_string());
        }
        if fallback.is_none() {
            fallback = Some(value.to_string());
        }
    }
    fallback
}

/// Practitioner identity is name plus managing organisation code:
/// `family,given@orgcode`, lowercased name parts.
fn practitioner_identity(content: &ResourceContent) -> Option<String> {
    let name = content.body().get("name")?.as_array()?.first()?;
    let family = name.get("family").and_then(|v| v.as_str())?.trim();
    let given = name
        .get("given")
        .and_then(|v| v.as_array())
        .and_then(|given| given.first())
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim();
    let org_code = content
        .body()
        .get("managingOrganization")
        .and_then(|org| org.get("identifier"))
        .and_then(|identifier| identifier.get("value"))
        .and_then(|v| v.as_str())?
        .trim();

    if family.is_empty() || org_code.is_empty() {
        return None;
    }
    Some(format!(
        "{},{}@{}",
        family.to_lowercase(),
        given.to_lowercase(),
        org_code
    ))
}
