//! Hierarchy closures
//!
//! Content items and taxonomy terms form parent/child trees. Membership
//! inherits down those trees, so the resolvers need the full transitive
//! closure of the parent relation rather than the immediate parent pointers
//! the repository stores. [`HierarchyMapBuilder`] computes it once per
//! engine; [`CrossMap`] bridges items and the terms attached to them.

pub mod builder;
pub mod cross;

pub use builder::{HierarchyMap, HierarchyMapBuilder, HierarchyRow};
pub use cross::CrossMap;

use serde::{Deserialize, Serialize};

/// Every closure the resolvers consult
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closures {
    pub items: HierarchyMap,
    pub terms: HierarchyMap,
    pub cross: CrossMap,
}
