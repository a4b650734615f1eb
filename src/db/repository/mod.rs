//! Repository layer: entity-scoped database operations.

mod report;

pub use report::*;
