//! Batch orchestration.
//!
//! One `transform_batch` call takes a batch of resource versions through
//! instance deduplication, bulk surrogate-key resolution, and per-resource
//! dispatch to the registered transformer. Batches fail atomically from the
//! caller's point of view: the first dispatch error aborts the remainder,
//! wrapped with the failing resource's identity.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::cache::IdCache;
use super::context::{RunContext, TransformContext};
use super::error::TransformError;
use super::instance::InstanceMapper;
use super::keyed_lock::KeyedLock;
use super::registry::TransformerRegistry;
use super::resolver::IdResolver;
use super::traits::{AuditStore, InstanceMapStore, KeyStore, ResourceStore};
use super::types::BatchOutcome;
use crate::config::TransformConfig;
use crate::models::{ResourceEntry, ResourceRef, ResourceState, SurrogateId};

/// Shared-by-reference orchestrator: worker threads drive batches through
/// one instance so they share the cache, the per-reference locks, and the
/// collaborator stores.
pub struct TransformOrchestrator {
    pub(super) config: TransformConfig,
    pub(super) resolver: IdResolver,
    pub(super) instance_mapper: InstanceMapper,
    pub(super) registry: TransformerRegistry,
    pub(super) resource_store: Arc<dyn ResourceStore>,
    pub(super) audit_store: Arc<dyn AuditStore>,
    pub(super) resolve_locks: KeyedLock<ResourceRef>,
}

impl TransformOrchestrator {
    pub fn new(
        config: TransformConfig,
        cache: Arc<IdCache>,
        key_store: Arc<dyn KeyStore>,
        instance_store: Arc<dyn InstanceMapStore>,
        resource_store: Arc<dyn ResourceStore>,
        audit_store: Arc<dyn AuditStore>,
        registry: TransformerRegistry,
    ) -> Self {
        let resolver = IdResolver::new(config.namespace.clone(), cache.clone(), key_store);
        let instance_mapper = InstanceMapper::new(
            config.namespace.clone(),
            cache,
            instance_store,
            config.instance_mappable.clone(),
        );
        Self {
            config,
            resolver,
            instance_mapper,
            registry,
            resource_store,
            audit_store,
            resolve_locks: KeyedLock::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// Transform one batch of resource versions within the given run.
    pub fn transform_batch(
        &self,
        run: &RunContext,
        entries: &[ResourceEntry],
    ) -> Result<BatchOutcome, TransformError> {
        let start = Instant::now();
        let mut outcome = BatchOutcome::empty();

        // Step 1: instance deduplication. Must precede id partitioning —
        // a duplicate instance never gets its own surrogate key.
        let duplicates = self.collect_duplicates(entries)?;

        // Step 2: bulk id resolution. Deleted resources and types that are
        // not always transformed are looked up, never minted.
        let mut find_only = Vec::new();
        let mut create = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            if duplicates.contains(&entry.reference) || !seen.insert(entry.reference) {
                continue;
            }
            if entry.state.is_deleted() || !self.always_transform(entry.reference) {
                find_only.push(entry.reference);
            } else {
                create.push(entry.reference);
            }
        }
        let ids = self.resolver.resolve_batch(&find_only, &create)?;

        // Step 3: dispatch in input order.
        for entry in entries {
            if duplicates.contains(&entry.reference) {
                tracing::debug!(resource = %entry.reference, "Skipping duplicate instance");
                outcome.skipped_duplicates += 1;
                continue;
            }
            let Some(&id) = ids.get(&entry.reference) else {
                tracing::debug!(resource = %entry.reference, "No surrogate id assigned, skipping");
                outcome.skipped_no_id += 1;
                continue;
            };
            if !run.mark_transformed(entry.reference) {
                outcome.skipped_already_transformed += 1;
                continue;
            }

            self.dispatch(run, entry.reference, id, &entry.state)
                .map_err(|e| e.with_context(entry.reference))?;
            match entry.state {
                ResourceState::Deleted => outcome.deleted += 1,
                ResourceState::Present(_) => outcome.transformed += 1,
            }
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            namespace = %self.namespace(),
            run_id = %run.run_id(),
            transformed = outcome.transformed,
            deleted = outcome.deleted,
            skipped = outcome.skipped_duplicates + outcome.skipped_no_id + outcome.skipped_already_transformed,
            duration_ms = outcome.duration_ms,
            "Batch complete"
        );
        Ok(outcome)
    }

    fn collect_duplicates(
        &self,
        entries: &[ResourceEntry],
    ) -> Result<HashSet<ResourceRef>, TransformError> {
        let mut duplicates = HashSet::new();
        for entry in entries {
            if !self.instance_mapper.is_mappable(entry.reference.resource_type) {
                continue;
            }
            let Some(content) = entry.state.content() else {
                continue;
            };
            let canonical = self.instance_mapper.resolve(entry.reference, content)?;
            if canonical != entry.reference.id {
                duplicates.insert(entry.reference);
            }
        }
        Ok(duplicates)
    }

    pub(super) fn always_transform(&self, reference: ResourceRef) -> bool {
        self.registry
            .lookup(reference.resource_type)
            .map(|t| t.should_always_transform())
            .unwrap_or(false)
    }

    /// One resource through its transformer. Shared by the batch path and
    /// the on-demand path; callers wrap errors with the resource context.
    pub(super) fn dispatch(
        &self,
        run: &RunContext,
        reference: ResourceRef,
        id: SurrogateId,
        state: &ResourceState,
    ) -> Result<(), TransformError> {
        let transformer = self
            .registry
            .lookup(reference.resource_type)
            .ok_or(TransformError::MissingTransformer(reference.resource_type))?;
        let ctx = TransformContext::new(self, run);
        match state {
            ResourceState::Deleted => transformer.delete(id, &ctx),
            ResourceState::Present(content) => transformer.transform(id, content, &ctx),
        }
    }
}
