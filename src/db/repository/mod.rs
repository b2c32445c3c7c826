//! Repository layer — entity-scoped database operations.
//!
//! Free functions over `&Connection`, one module per table family. All
//! public functions are re-exported here.

mod extra_resource;
mod instance_map;
mod key_map;

pub use extra_resource::*;
pub use instance_map::*;
pub use key_map::*;
