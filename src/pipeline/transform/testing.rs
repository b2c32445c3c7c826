//! Shared stub collaborators for pipeline tests.
//!
//! Call-counting in-memory stores plus a recording transformer that follows
//! `references` entries in resource content through the on-demand resolver.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::batch::TransformOrchestrator;
use super::cache::IdCache;
use super::context::TransformContext;
use super::error::TransformError;
use super::registry::TransformerRegistry;
use super::traits::{AuditStore, InstanceMapStore, KeyStore, ResourceStore, Transformer};
use crate::config::TransformConfig;
use crate::models::{InstanceMapping, ResourceContent, ResourceRef, ResourceType, SurrogateId};

// ═══════════════════════════════════════════
// MemoryKeyStore
// ═══════════════════════════════════════════

pub struct MemoryKeyStore {
    next: AtomicI64,
    keys: Mutex<HashMap<(String, ResourceRef), SurrogateId>>,
    pub find_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub bulk_find_calls: AtomicUsize,
    pub bulk_create_calls: AtomicUsize,
    pub creations: AtomicUsize,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            next: AtomicI64::new(1),
            keys: Mutex::new(HashMap::new()),
            find_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            bulk_find_calls: AtomicUsize::new(0),
            bulk_create_calls: AtomicUsize::new(0),
            creations: AtomicUsize::new(0),
        }
    }

    /// Pre-assign a key without touching the call counters.
    pub fn seed(&self, namespace: &str, reference: ResourceRef) -> SurrogateId {
        let mut keys = self.keys.lock().unwrap();
        let id = SurrogateId::new(self.next.fetch_add(1, Ordering::SeqCst));
        *keys.entry((namespace.to_string(), reference)).or_insert(id)
    }

    fn mint_locked(
        &self,
        keys: &mut HashMap<(String, ResourceRef), SurrogateId>,
        namespace: &str,
        reference: ResourceRef,
    ) -> SurrogateId {
        if let Some(&id) = keys.get(&(namespace.to_string(), reference)) {
            return id;
        }
        let id = SurrogateId::new(self.next.fetch_add(1, Ordering::SeqCst));
        keys.insert((namespace.to_string(), reference), id);
        self.creations.fetch_add(1, Ordering::SeqCst);
        id
    }
}

impl KeyStore for MemoryKeyStore {
    fn find(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<Option<SurrogateId>, TransformError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.keys.lock().unwrap().get(&(namespace.to_string(), reference)).copied())
    }

    fn find_or_create(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<SurrogateId, TransformError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut keys = self.keys.lock().unwrap();
        Ok(self.mint_locked(&mut keys, namespace, reference))
    }

    fn find_many(
        &self,
        namespace: &str,
        references: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, SurrogateId>, TransformError> {
        self.bulk_find_calls.fetch_add(1, Ordering::SeqCst);
        let keys = self.keys.lock().unwrap();
        Ok(references
            .iter()
            .filter_map(|&r| keys.get(&(namespace.to_string(), r)).map(|&id| (r, id)))
            .collect())
    }

    fn find_or_create_many(
        &self,
        namespace: &str,
        references: &[ResourceRef],
    ) -> Result<HashMap<ResourceRef, SurrogateId>, TransformError> {
        self.bulk_create_calls.fetch_add(1, Ordering::SeqCst);
        let mut keys = self.keys.lock().unwrap();
        Ok(references
            .iter()
            .map(|&r| (r, self.mint_locked(&mut keys, namespace, r)))
            .collect())
    }
}

// ═══════════════════════════════════════════
// MemoryInstanceMapStore
// ═══════════════════════════════════════════

pub struct MemoryInstanceMapStore {
    by_ref: Mutex<HashMap<(String, ResourceRef), Uuid>>,
    by_value: Mutex<HashMap<(String, ResourceType, String), Uuid>>,
    lookups: AtomicUsize,
}

impl MemoryInstanceMapStore {
    pub fn new() -> Self {
        Self {
            by_ref: Mutex::new(HashMap::new()),
            by_value: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn seed_mapping(&self, namespace: &str, reference: ResourceRef, canonical: Uuid) {
        self.by_ref
            .lock()
            .unwrap()
            .insert((namespace.to_string(), reference), canonical);
    }

    pub fn mapping_count(&self) -> usize {
        self.by_ref.lock().unwrap().len()
    }

    pub fn find_calls(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl InstanceMapStore for MemoryInstanceMapStore {
    fn find_instance_mapping(
        &self,
        namespace: &str,
        reference: ResourceRef,
    ) -> Result<Option<Uuid>, TransformError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_ref.lock().unwrap().get(&(namespace.to_string(), reference)).copied())
    }

    fn find_or_create_instance_mapping(
        &self,
        namespace: &str,
        reference: ResourceRef,
        mapping_value: &str,
    ) -> Result<InstanceMapping, TransformError> {
        let canonical = *self
            .by_value
            .lock()
            .unwrap()
            .entry((namespace.to_string(), reference.resource_type, mapping_value.to_string()))
            .or_insert(reference.id);
        let mapped = *self
            .by_ref
            .lock()
            .unwrap()
            .entry((namespace.to_string(), reference))
            .or_insert(canonical);
        Ok(InstanceMapping {
            resource_id: reference.id,
            canonical_id: mapped,
            mapping_value: Some(mapping_value.to_string()),
        })
    }
}

// ═══════════════════════════════════════════
// MemoryResourceStore / MemoryAuditStore
// ═══════════════════════════════════════════

pub struct MemoryResourceStore {
    resources: Mutex<HashMap<ResourceRef, serde_json::Value>>,
    pub fetch_calls: AtomicUsize,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self {
            resources: Mutex::new(HashMap::new()),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn insert(&self, reference: ResourceRef, body: serde_json::Value) {
        self.resources.lock().unwrap().insert(reference, body);
    }
}

impl ResourceStore for MemoryResourceStore {
    fn current_version(
        &self,
        reference: ResourceRef,
    ) -> Result<Option<ResourceContent>, TransformError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .resources
            .lock()
            .unwrap()
            .get(&reference)
            .cloned()
            .map(ResourceContent::new))
    }
}

pub struct MemoryAuditStore {
    pub records: Mutex<Vec<(Uuid, ResourceRef)>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl AuditStore for MemoryAuditStore {
    fn record_extra_resource(
        &self,
        _namespace: &str,
        run_id: Uuid,
        reference: ResourceRef,
    ) -> Result<(), TransformError> {
        self.records.lock().unwrap().push((run_id, reference));
        Ok(())
    }
}

// ═══════════════════════════════════════════
// RecordingTransformer
// ═══════════════════════════════════════════

pub struct TransformLog {
    pub transforms: Mutex<Vec<SurrogateId>>,
    pub deletes: Mutex<Vec<SurrogateId>>,
    pub resolved: Mutex<Vec<Option<SurrogateId>>>,
}

/// Records every call; follows `references` entries in the content body
/// through the on-demand resolver, the way a field-mapping transformer
/// resolves its foreign keys.
pub struct RecordingTransformer {
    resource_type: ResourceType,
    always: bool,
    fail_with: Option<String>,
    log: Arc<TransformLog>,
}

impl RecordingTransformer {
    pub fn new(resource_type: ResourceType) -> (Self, Arc<TransformLog>) {
        let log = Arc::new(TransformLog {
            transforms: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            resolved: Mutex::new(Vec::new()),
        });
        (
            Self {
                resource_type,
                always: true,
                fail_with: None,
                log: log.clone(),
            },
            log,
        )
    }

    pub fn not_always(mut self) -> Self {
        self.always = false;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }
}

impl Transformer for RecordingTransformer {
    fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    fn should_always_transform(&self) -> bool {
        self.always
    }

    fn transform(
        &self,
        id: SurrogateId,
        content: &ResourceContent,
        ctx: &TransformContext<'_>,
    ) -> Result<(), TransformError> {
        if let Some(message) = &self.fail_with {
            return Err(TransformError::UnsupportedShape(message.clone()));
        }
        if let Some(references) = content.body().get("references").and_then(|v| v.as_array()) {
            for entry in references {
                let type_raw = entry
                    .get("resourceType")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| TransformError::UnsupportedShape("reference without resourceType".into()))?;
                let id_raw = entry
                    .get("id")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| TransformError::UnsupportedShape("reference without id".into()))?;
                let resource_type = ResourceType::from_str(type_raw)?;
                let id = Uuid::parse_str(id_raw)
                    .map_err(|_| TransformError::UnsupportedShape(format!("bad reference id: {id_raw}")))?;
                let resolved = ctx.resolve_reference(ResourceRef::new(resource_type, id))?;
                self.log.resolved.lock().unwrap().push(resolved);
            }
        }
        self.log.transforms.lock().unwrap().push(id);
        Ok(())
    }

    fn delete(&self, id: SurrogateId, _ctx: &TransformContext<'_>) -> Result<(), TransformError> {
        self.log.deletes.lock().unwrap().push(id);
        Ok(())
    }
}

// ═══════════════════════════════════════════
// Fixture wiring
// ═══════════════════════════════════════════

/// Content body whose transformer will resolve each listed reference.
pub fn body_with_references(references: &[ResourceRef]) -> serde_json::Value {
    serde_json::json!({
        "references": references
            .iter()
            .map(|r| serde_json::json!({
                "resourceType": r.resource_type.as_str(),
                "id": r.id.to_string(),
            }))
            .collect::<Vec<_>>()
    })
}

/// Recording transformers for each type, returning their logs by type.
pub fn registry_of(
    types: &[ResourceType],
) -> (TransformerRegistry, HashMap<ResourceType, Arc<TransformLog>>) {
    let mut registry = TransformerRegistry::new();
    let mut logs = HashMap::new();
    for &resource_type in types {
        let (transformer, log) = RecordingTransformer::new(resource_type);
        registry.register(Box::new(transformer));
        logs.insert(resource_type, log);
    }
    (registry, logs)
}

/// Config with near-zero backoff so race tests stay fast.
pub fn fast_config() -> TransformConfig {
    TransformConfig {
        namespace: "ns".to_string(),
        redirect_retry_attempts: 3,
        redirect_retry_base_ms: 2,
        redirect_retry_jitter_ms: 0,
        ..TransformConfig::default()
    }
}

pub struct Fixture {
    pub orchestrator: Arc<TransformOrchestrator>,
    pub cache: Arc<IdCache>,
    pub key_store: Arc<MemoryKeyStore>,
    pub instance_store: Arc<MemoryInstanceMapStore>,
    pub resource_store: Arc<MemoryResourceStore>,
    pub audit_store: Arc<MemoryAuditStore>,
}

pub fn fixture(registry: TransformerRegistry) -> Fixture {
    let cache = Arc::new(IdCache::new());
    let key_store = Arc::new(MemoryKeyStore::new());
    let instance_store = Arc::new(MemoryInstanceMapStore::new());
    let resource_store = Arc::new(MemoryResourceStore::new());
    let audit_store = Arc::new(MemoryAuditStore::new());
    let orchestrator = Arc::new(TransformOrchestrator::new(
        fast_config(),
        cache.clone(),
        key_store.clone(),
        instance_store.clone(),
        resource_store.clone(),
        audit_store.clone(),
        registry,
    ));
    Fixture {
        orchestrator,
        cache,
        key_store,
        instance_store,
        resource_store,
        audit_store,
    }
}
