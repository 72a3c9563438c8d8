//! Memory inspection for hackable-host
//!
//! This crate provides immutable point-in-time snapshots of core memory,
//! predicate scans over them, and the sorted address sets used to narrow
//! search results across passes.

pub mod search;
pub mod set;
pub mod snapshot;

pub use search::{Encoding, Operator, Width};
pub use set::AddressSet;
pub use snapshot::Snapshot;
