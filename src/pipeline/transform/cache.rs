//! Process-wide id cache.
//!
//! Fronts the persistent key and instance-mapping stores. Entries live for
//! the life of the cache object — there is no eviction. Constructed
//! explicitly and passed into the orchestrator, so tests and multiple
//! independent deployments in one process each get their own.
//!
//! A negative result is never cached: another path may create the key
//! between our miss and the next lookup, and a cached `None` would hide it.

use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::models::{ResourceRef, SurrogateId};

fn cache_key(namespace: &str, reference: ResourceRef) -> String {
    format!("{namespace}:{reference}")
}

/// Shared lookup cache for surrogate keys and instance mappings.
pub struct IdCache {
    keys: RwLock<HashMap<String, SurrogateId>>,
    instances: RwLock<HashMap<String, Uuid>>,
}

impl IdCache {
    pub fn new() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    // ── Surrogate keys ───────────────────────────────────

    pub fn get(&self, namespace: &str, reference: ResourceRef) -> Option<SurrogateId> {
        self.keys.read().unwrap().get(&cache_key(namespace, reference)).copied()
    }

    pub fn insert(&self, namespace: &str, reference: ResourceRef, id: SurrogateId) {
        self.keys.write().unwrap().insert(cache_key(namespace, reference), id);
    }

    /// No-op on `None` — negative results are never cached.
    pub fn insert_opt(&self, namespace: &str, reference: ResourceRef, id: Option<SurrogateId>) {
        if let Some(id) = id {
            self.insert(namespace, reference, id);
        }
    }

    // ── Instance mappings ────────────────────────────────

    pub fn get_instance(&self, namespace: &str, reference: ResourceRef) -> Option<Uuid> {
        self.instances.read().unwrap().get(&cache_key(namespace, reference)).copied()
    }

    pub fn insert_instance(&self, namespace: &str, reference: ResourceRef, canonical: Uuid) {
        self.instances.write().unwrap().insert(cache_key(namespace, reference), canonical);
    }

    // ── Introspection ────────────────────────────────────

    pub fn key_count(&self) -> usize {
        self.keys.read().unwrap().len()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0 && self.instance_count() == 0
    }

    /// Drop every entry. Correctness never depends on cache contents, only
    /// on the persistent stores behind it.
    pub fn clear(&self) {
        self.keys.write().unwrap().clear();
        self.instances.write().unwrap().clear();
    }
}

impl Default for IdCache {
    fn default() -> Self {
        Self::new()
    }
}
