//! Cache-fronted surrogate-key resolution.

use std::collections::HashMap;
use std::sync::Arc;

use super::cache::IdCache;
use super::error::TransformError;
use super::traits::KeyStore;
use crate::models::{ResourceRef, SurrogateId};

/// Resolves references to surrogate keys, consulting the cache before the
/// persistent store and writing every store result back into the cache.
pub struct IdResolver {
    namespace: String,
    cache: Arc<IdCache>,
    store: Arc<dyn KeyStore>,
}

impl IdResolver {
    pub fn new(namespace: String, cache: Arc<IdCache>, store: Arc<dyn KeyStore>) -> Self {
        Self { namespace, cache, store }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn find(&self, reference: ResourceRef) -> Result<Option<SurrogateId>, TransformError> {
        if let Some(id) = self.cache.get(&self.namespace, reference) {
            return Ok(Some(id));
        }
        let found = self.store.find(&self.namespace, reference)?;
        self.cache.insert_opt(&self.namespace, reference, found);
        Ok(found)
    }

    pub fn find_or_create(&self, reference: ResourceRef) -> Result<SurrogateId, TransformError> {
        if let Some(id) = self.cache.get(&self.namespace, reference) {
            return Ok(id);
        }
        let id = self.store.find_or_create(&self.namespace, reference)?;
        self.cache.insert(&self.namespace, reference, id);
        Ok(id)
    }

    /// Bulk resolution for a batch: `find_only` references are looked up but
    /// never created, `create` references are minted if unseen. One store
    /// round trip per group of cache misses.
    pub fn resolve_batch(
        &self,
        find_only: &[ResourceRef],
        create: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, SurrogateId>, TransformError> {
        let mut resolved = HashMap::with_capacity(find_only.len() + create.len());

        let misses_find = self.drain_cached(find_only, &mut resolved);
        let misses_create = self.drain_cached(create, &mut resolved);

        let cached = resolved.len();
        if !misses_find.is_empty() {
            let found = self.store.find_many(&self.namespace, &misses_find)?;
            for (&reference, &id) in &found {
                self.cache.insert(&self.namespace, reference, id);
            }
            resolved.extend(found);
        }
        if !misses_create.is_empty() {
            let created = self.store.find_or_create_many(&self.namespace, &misses_create)?;
            for (&reference, &id) in &created {
                self.cache.insert(&self.namespace, reference, id);
            }
            resolved.extend(created);
        }

        tracing::debug!(
            cached,
            looked_up = misses_find.len(),
            minted = misses_create.len(),
            resolved = resolved.len(),
            "Bulk id resolution complete"
        );
        Ok(resolved)
    }

    fn drain_cached(
        &self,
        references: &[ResourceRef],
        resolved: &mut HashMap<ResourceRef, SurrogateId>,
    ) -> Vec<ResourceRef> {
        let mut misses = Vec::new();
        for &reference in references {
            match self.cache.get(&self.namespace, reference) {
                Some(id) => {
                    resolved.insert(reference, id);
                }
                None => misses.push(reference),
            }
        }
        misses
    }
}
