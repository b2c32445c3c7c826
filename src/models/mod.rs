pub mod resource;
pub mod surrogate;

pub use resource::*;
pub use surrogate::*;
