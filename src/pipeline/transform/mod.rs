//! Resource ID Resolution & On-Demand Transform Orchestration
//!
//! Converts batches of versioned clinical resources into output-store rows
//! while keeping one invariant set:
//! - every resource gets exactly one surrogate key, stable across runs;
//! - duplicate organisation/practitioner instances collapse onto one
//!   canonical key;
//! - a dependency referenced from inside a transform is resolved — and, if
//!   never seen, transformed — at most once per run, even under concurrent
//!   batch workers.
//!
//! Module map:
//! ```text
//! cache      → process-lifetime id cache (explicitly constructed)
//! resolver   → cache-fronted find / find-or-create, bulk partition
//! instance   → duplicate-instance deduplication
//! batch      → per-batch orchestration and dispatch
//! on_demand  → locked resolve-and-transform for out-of-batch dependencies
//! keyed_lock → per-reference mutual exclusion
//! registry   → resource type → transformer
//! store      → SQLite implementations of the collaborator traits
//! ```

pub mod batch;
pub mod cache;
pub mod context;
pub mod error;
pub mod instance;
pub mod keyed_lock;
pub mod on_demand;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::TransformOrchestrator;
pub use cache::IdCache;
pub use context::{RunContext, TransformContext};
pub use error::TransformError;
pub use instance::{mapping_value, InstanceMapper};
pub use keyed_lock::KeyedLock;
pub use registry::TransformerRegistry;
pub use resolver::IdResolver;
pub use store::{SqliteAuditStore, SqliteInstanceMapStore, SqliteKeyStore};
pub use traits::{AuditStore, InstanceMapStore, KeyStore, ResourceStore, Transformer};
pub use types::BatchOutcome;
