//! On-demand dependency resolution.
//!
//! A transformer mid-flight needs the surrogate id of a resource that may
//! not be in any batch of this run. The fast path is a plain lookup. The
//! slow path — check, decide, mint, transform — is not atomic on its own,
//! so it runs under a per-reference lock: concurrent resolutions of the
//! same dependency serialise, everything else proceeds in parallel.

use std::thread;
use std::time::Duration;

use rand::Rng;

use super::batch::TransformOrchestrator;
use super::context::RunContext;
use super::error::TransformError;
use crate::models::{ResourceRef, ResourceState, SurrogateId};

impl TransformOrchestrator {
    /// Resolve a dependency's surrogate id, transforming the dependency
    /// first if it has never been transformed. `None` means the dependency
    /// is deleted or unknown and no id was minted.
    pub fn resolve_and_transform(
        &self,
        run: &RunContext,
        reference: ResourceRef,
    ) -> Result<Option<SurrogateId>, TransformError> {
        // Fast path: already transformed, in this run or an earlier one.
        if let Some(id) = self.resolver.find(reference)? {
            return Ok(Some(id));
        }

        let _guard = self.resolve_locks.lock(reference);

        if self.instance_mapper.is_mappable(reference.resource_type) {
            let canonical = self
                .instance_mapper
                .resolve_lazy(reference, || self.resource_store.current_version(reference))?;
            if canonical != reference.id {
                // The canonical twin is transformed by its own batch, which
                // ordered before us. If its key is not visible yet we are
                // racing that thread; back off briefly before giving up.
                let canonical_ref = ResourceRef::new(reference.resource_type, canonical);
                return match self.find_with_backoff(canonical_ref)? {
                    Some(id) => Ok(Some(id)),
                    None => Err(TransformError::MappedInstanceNotFound {
                        resource_type: reference.resource_type,
                        resource_id: reference.id,
                        attempts: self.config.redirect_retry_attempts,
                    }),
                };
            }
        }

        // Double-check under the lock: another thread may have finished
        // this resolution while we waited.
        if let Some(id) = self.resolver.find(reference)? {
            return Ok(Some(id));
        }

        let Some(content) = self.resource_store.current_version(reference)? else {
            tracing::debug!(resource = %reference, "Dependency deleted or unknown, nothing to mint");
            return Ok(None);
        };

        // A type that can be referenced on demand must have a transformer;
        // finding none is a deployment configuration error.
        if !self.registry.contains(reference.resource_type) {
            return Err(TransformError::MissingTransformer(reference.resource_type));
        }

        self.audit_store
            .record_extra_resource(self.namespace(), run.run_id(), reference)?;

        let id = self.resolver.find_or_create(reference)?;
        run.mark_transformed(reference);
        tracing::debug!(
            resource = %reference,
            surrogate_id = %id,
            run_id = %run.run_id(),
            "Transforming dependency outside its batch"
        );
        self.dispatch(run, reference, id, &ResourceState::Present(content))
            .map_err(|e| e.with_context(reference))?;

        Ok(Some(id))
    }

    /// Lookup with bounded, jittered exponential backoff. Returns `None`
    /// only after every retry missed.
    fn find_with_backoff(
        &self,
        reference: ResourceRef,
    ) -> Result<Option<SurrogateId>, TransformError> {
        if let Some(id) = self.resolver.find(reference)? {
            return Ok(Some(id));
        }
        let mut delay = Duration::from_millis(self.config.redirect_retry_base_ms);
        for attempt in 1..=self.config.redirect_retry_attempts {
            let jitter_ms = if self.config.redirect_retry_jitter_ms > 0 {
                rand::thread_rng().gen_range(0..=self.config.redirect_retry_jitter_ms)
            } else {
                0
            };
            thread::sleep(delay + Duration::from_millis(jitter_ms));
            if let Some(id) = self.resolver.find(reference)? {
                tracing::debug!(resource = %reference, attempt, "Mapped instance id appeared after retry");
                return Ok(Some(id));
            }
            delay *= 2;
        }
        Ok(None)
    }
}
