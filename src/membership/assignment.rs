//! Membership provenance
//!
//! An [`AssignmentInfo`] explains why an object counts as a group member.
//! Direct assignments carry no children; derived memberships record the
//! related object they came through, which in turn may carry its own
//! provenance. The tree is owned and built fresh per query, so it is always
//! finite.

use crate::access_control::{ObjectId, ObjectKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentInfo {
    /// Concrete object type of the assigned object, e.g. `page` or `category`
    pub category: String,
    /// Related objects this membership was derived through
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub recursive_membership: BTreeMap<ObjectKind, BTreeMap<ObjectId, AssignmentInfo>>,
}

impl AssignmentInfo {
    /// A direct assignment
    pub fn direct(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            recursive_membership: BTreeMap::new(),
        }
    }

    /// Record that membership was derived through `id` of `kind`
    pub fn with_source(mut self, kind: ObjectKind, id: impl Into<ObjectId>, info: AssignmentInfo) -> Self {
        self.add_source(kind, id, info);
        self
    }

    pub fn add_source(&mut self, kind: ObjectKind, id: impl Into<ObjectId>, info: AssignmentInfo) {
        self.recursive_membership
            .entry(kind)
            .or_default()
            .insert(id.into(), info);
    }

    pub fn is_direct(&self) -> bool {
        self.recursive_membership.is_empty()
    }

    /// Related objects of `kind` this membership came through
    pub fn sources(&self, kind: ObjectKind) -> impl Iterator<Item = (&ObjectId, &AssignmentInfo)> {
        self.recursive_membership.get(&kind).into_iter().flatten()
    }

    /// Length of the longest provenance chain below this node
    pub fn depth(&self) -> usize {
        self.recursive_membership
            .values()
            .flat_map(BTreeMap::values)
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }
}
