//! Decision audit trail
//!
//! [`AccessExplanation`] records how the engine reached a decision: which
//! rule short-circuited, or how each owning group was evaluated.

use crate::access_control::{AccessOperation, ObjectId};
use crate::group::GroupId;
use crate::membership::AssignmentInfo;
use serde::Serialize;

/// Why access was granted or denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum DecisionReason {
    /// The object type is not managed by any resolver
    Unmanaged,
    /// The principal owns the object
    Owner,
    /// The principal holds the manager capability
    Manager,
    /// No group owns the object
    Ungoverned,
    /// Every owning group leaves the operation open to all
    Unrestricted,
    /// The principal is a member of an owning group
    Member { group: GroupId },
    /// The request IP matches an owning group's ranges
    IpMatch { group: GroupId },
    /// Restricting groups remain and none granted access
    Denied,
}

impl DecisionReason {
    pub fn is_granted(&self) -> bool {
        !matches!(self, DecisionReason::Denied)
    }
}

/// How one owning group was evaluated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum GroupOutcome {
    /// Access mode `all` for the operation; the group was skipped
    Unrestricted,
    /// The principal is a member
    Member { membership: AssignmentInfo },
    /// The request IP matched
    IpMatch,
    /// The group restricts the operation for this principal
    Restricted,
}

impl GroupOutcome {
    pub fn grants(&self) -> bool {
        matches!(self, GroupOutcome::Member { .. } | GroupOutcome::IpMatch)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupVerdict {
    pub group: GroupId,
    pub name: String,
    /// Why the object belongs to the group
    pub object_membership: AssignmentInfo,
    pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessExplanation {
    pub object_type: String,
    pub id: ObjectId,
    pub operation: AccessOperation,
    pub reason: DecisionReason,
    /// Owning groups, empty when an earlier rule decided
    pub groups: Vec<GroupVerdict>,
}

impl AccessExplanation {
    pub fn is_granted(&self) -> bool {
        self.reason.is_granted()
    }
}
