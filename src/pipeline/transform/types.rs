//! Outcome types for batch orchestration.

use serde::{Deserialize, Serialize};

/// Counters for one `transform_batch` call.
///
/// The skip counters are deliberate no-ops, not failures: a duplicate
/// instance defers to its canonical twin, and a resource with no surrogate
/// id has nothing to write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub transformed: u32,
    pub deleted: u32,
    pub skipped_duplicates: u32,
    pub skipped_no_id: u32,
    pub skipped_already_transformed: u32,
    pub duration_ms: u64,
}

impl BatchOutcome {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resources that reached a transformer this call.
    pub fn dispatched(&self) -> u32 {
        self.transformed + self.deleted
    }
}
