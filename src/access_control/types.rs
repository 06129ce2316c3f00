//! Access control types
//!
//! Core types shared by the resolvers, groups and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of any managed object (content item, term, role name, user)
pub type ObjectId = String;

/// General object kind, one per membership resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    ContentItem,
    Term,
    Role,
    User,
}

impl ObjectKind {
    /// Get the kind name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::ContentItem => "content_item",
            ObjectKind::Term => "term",
            ObjectKind::Role => "role",
            ObjectKind::User => "user",
        }
    }

    /// Try to parse a kind from a string
    pub fn try_parse(s: &str) -> Option<Self> {
        match s {
            "content_item" => Some(ObjectKind::ContentItem),
            "term" => Some(ObjectKind::Term),
            "role" => Some(ObjectKind::Role),
            "user" => Some(ObjectKind::User),
            _ => None,
        }
    }

    /// Get all kinds
    pub fn all() -> &'static [ObjectKind] {
        &[
            ObjectKind::ContentItem,
            ObjectKind::Term,
            ObjectKind::Role,
            ObjectKind::User,
        ]
    }

    /// Whether objects of this kind form a parent/child hierarchy
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self, ObjectKind::ContentItem | ObjectKind::Term)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The operation an access check is made for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOperation {
    /// Viewing the object
    Read,
    /// Editing the object
    Write,
}

impl AccessOperation {
    /// Select the operation implied by the request context
    pub const fn from_admin_context(is_admin: bool) -> Self {
        if is_admin {
            AccessOperation::Write
        } else {
            AccessOperation::Read
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessOperation::Read => "read",
            AccessOperation::Write => "write",
        }
    }
}

impl fmt::Display for AccessOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-operation access mode of a group
///
/// Only `All` lifts the restriction; `None` and `Group` both restrict the
/// operation to group members and matching IP ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Everyone may perform the operation
    All,
    /// Nobody outside the group may perform the operation
    None,
    /// Only group members may perform the operation
    #[default]
    Group,
}

impl AccessMode {
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, AccessMode::All)
    }
}
