//! Transformer registry.
//!
//! Maps a resource type to the transformer that writes its output rows.
//! Registration happens once at startup; lookup is on the hot path.

use std::collections::HashMap;

use super::traits::Transformer;
use crate::models::ResourceType;

pub struct TransformerRegistry {
    transformers: HashMap<ResourceType, Box<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Register a transformer under its own resource type. Re-registering a
    /// type replaces the earlier transformer.
    pub fn register(&mut self, transformer: Box<dyn Transformer>) {
        let resource_type = transformer.resource_type();
        if self.transformers.insert(resource_type, transformer).is_some() {
            tracing::warn!(resource_type = %resource_type, "Replacing registered transformer");
        }
    }

    pub fn lookup(&self, resource_type: ResourceType) -> Option<&dyn Transformer> {
        self.transformers.get(&resource_type).map(|t| t.as_ref())
    }

    pub fn contains(&self, resource_type: ResourceType) -> bool {
        self.transformers.contains_key(&resource_type)
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
