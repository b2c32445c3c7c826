//! Per-run state and the context handed to transformers.

use std::collections::HashSet;
use std::sync::Mutex;

use uuid::Uuid;

use super::batch::TransformOrchestrator;
use super::error::TransformError;
use crate::models::{ResourceRef, SurrogateId};

/// State scoped to one orchestration run.
///
/// The transformed set guarantees at-most-one dispatch per reference per
/// run. It says nothing about earlier runs — those are detected through the
/// persistent key store.
pub struct RunContext {
    run_id: Uuid,
    transformed: Mutex<HashSet<ResourceRef>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            transformed: Mutex::new(HashSet::new()),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Atomic check-and-add. Returns true if this caller claimed the
    /// reference, false if some earlier caller in this run already did.
    pub fn mark_transformed(&self, reference: ResourceRef) -> bool {
        self.transformed.lock().unwrap().insert(reference)
    }

    pub fn is_transformed(&self, reference: ResourceRef) -> bool {
        self.transformed.lock().unwrap().contains(&reference)
    }

    pub fn transformed_count(&self) -> usize {
        self.transformed.lock().unwrap().len()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// What a transformer sees of the pipeline while writing one resource.
pub struct TransformContext<'a> {
    orchestrator: &'a TransformOrchestrator,
    run: &'a RunContext,
}

impl<'a> TransformContext<'a> {
    pub(crate) fn new(orchestrator: &'a TransformOrchestrator, run: &'a RunContext) -> Self {
        Self { orchestrator, run }
    }

    pub fn namespace(&self) -> &str {
        self.orchestrator.namespace()
    }

    pub fn run_id(&self) -> Uuid {
        self.run.run_id()
    }

    /// Surrogate id of a referenced resource, transforming it on demand if
    /// it has never been seen. `None` means the reference points at a
    /// deleted or unknown resource — omit the output column.
    pub fn resolve_reference(
        &self,
        reference: ResourceRef,
    ) -> Result<Option<SurrogateId>, TransformError> {
        self.orchestrator.resolve_and_transform(self.run, reference)
    }
}
