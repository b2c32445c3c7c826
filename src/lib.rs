//! Crosswalk — stable surrogate keys and transform orchestration for
//! clinical resources.
//!
//! A canonical store holds immutable, versioned resources; an analytical
//! store wants rows keyed by small stable integers. This crate owns the
//! crosswalk between the two: key assignment, instance deduplication, and
//! the concurrency discipline that keeps both correct when batches run in
//! parallel and transforms pull in each other's dependencies.

pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod telemetry;
