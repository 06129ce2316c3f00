//! Groups
//!
//! A [`Group`] is a named permission bucket: per-operation access modes, an
//! IP allowlist, and the objects directly assigned to it. Derived (recursive)
//! memberships are never stored on the group; the resolvers compute them on
//! demand.

pub mod ip_range;

pub use ip_range::IpRange;

use crate::access_control::{AccessMode, AccessOperation, ObjectId, ObjectKind};
use crate::error::StoreError;
use crate::membership::AssignmentInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Group identifier assigned by the group store
pub type GroupId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub read_access: AccessMode,
    #[serde(default)]
    pub write_access: AccessMode,
    /// Allowlist entries, see [`ip_range`]
    #[serde(default)]
    pub ip_ranges: Vec<String>,
    /// Direct assignments only
    #[serde(default)]
    pub membership: BTreeMap<ObjectKind, BTreeMap<ObjectId, AssignmentInfo>>,
}

impl Group {
    /// Create a group restricted to members for both operations
    pub fn new(id: GroupId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            read_access: AccessMode::Group,
            write_access: AccessMode::Group,
            ip_ranges: Vec::new(),
            membership: BTreeMap::new(),
        }
    }

    pub fn with_access(mut self, read: AccessMode, write: AccessMode) -> Self {
        self.read_access = read;
        self.write_access = write;
        self
    }

    pub fn with_ip_ranges<I, S>(mut self, ranges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ip_ranges = ranges.into_iter().map(Into::into).collect();
        self
    }

    /// Builder form of [`Group::add_object`]
    pub fn with_object(mut self, kind: ObjectKind, subtype: &str, id: impl Into<ObjectId>) -> Self {
        self.add_object(kind, subtype, id);
        self
    }

    /// Directly assign an object; re-assigning replaces the recorded subtype
    pub fn add_object(&mut self, kind: ObjectKind, subtype: &str, id: impl Into<ObjectId>) {
        self.membership
            .entry(kind)
            .or_default()
            .insert(id.into(), AssignmentInfo::direct(subtype));
    }

    /// Remove a direct assignment, returning whether it existed
    pub fn remove_object(&mut self, kind: ObjectKind, id: &str) -> bool {
        let Some(objects) = self.membership.get_mut(&kind) else {
            return false;
        };
        let removed = objects.remove(id).is_some();
        if objects.is_empty() {
            self.membership.remove(&kind);
        }
        removed
    }

    /// Direct-assignment lookup
    pub fn is_assigned(&self, kind: ObjectKind, id: &str) -> Option<&AssignmentInfo> {
        self.membership.get(&kind)?.get(id)
    }

    /// All objects of `kind` directly assigned to this group
    pub fn assigned_objects(&self, kind: ObjectKind) -> impl Iterator<Item = (&ObjectId, &AssignmentInfo)> {
        self.membership.get(&kind).into_iter().flatten()
    }

    pub fn access_mode(&self, operation: AccessOperation) -> AccessMode {
        match operation {
            AccessOperation::Read => self.read_access,
            AccessOperation::Write => self.write_access,
        }
    }

    /// Whether this group places no restriction on `operation`
    pub fn is_unrestricted(&self, operation: AccessOperation) -> bool {
        self.access_mode(operation).is_unrestricted()
    }

    pub fn ip_matches(&self, ip: &str) -> bool {
        ip_range::matches_any(&self.ip_ranges, ip)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Invalid(format!(
                "group {} must have a name",
                self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_assignment_lookup() {
        let group = Group::new(1, "staff")
            .with_object(ObjectKind::ContentItem, "page", "10")
            .with_object(ObjectKind::Role, "role", "editor");

        let info = group.is_assigned(ObjectKind::ContentItem, "10").unwrap();
        assert_eq!(info.category, "page");
        assert!(info.is_direct());
        assert!(group.is_assigned(ObjectKind::ContentItem, "11").is_none());
        assert!(group.is_assigned(ObjectKind::Term, "10").is_none());
        assert!(group.is_assigned(ObjectKind::Role, "editor").is_some());
    }

    #[test]
    fn test_remove_object() {
        let mut group = Group::new(1, "staff").with_object(ObjectKind::User, "user", "42");
        assert!(group.remove_object(ObjectKind::User, "42"));
        assert!(!group.remove_object(ObjectKind::User, "42"));
        assert!(group.membership.is_empty());
    }

    #[test]
    fn test_access_mode_per_operation() {
        let group = Group::new(1, "g").with_access(AccessMode::All, AccessMode::None);
        assert!(group.is_unrestricted(AccessOperation::Read));
        assert!(!group.is_unrestricted(AccessOperation::Write));
        assert_eq!(group.access_mode(AccessOperation::Write), AccessMode::None);
    }

    #[test]
    fn test_ip_matches() {
        let group = Group::new(1, "office").with_ip_ranges(["1.1.1.1-1.1.2.1", "7.7.7-8.8.8.8"]);
        assert!(group.ip_matches("1.1.1.200"));
        assert!(!group.ip_matches("1.1.2.2"));
        assert!(!group.ip_matches("8.8.8.8"));
    }

    #[test]
    fn test_validate_requires_name() {
        assert!(Group::new(1, "ok").validate().is_ok());
        assert!(matches!(
            Group::new(2, "  ").validate(),
            Err(StoreError::Invalid(_))
        ));
    }

    #[test]
    fn test_deserialize_defaults() {
        let group: Group = serde_json::from_str(r#"{"id": 3, "name": "public"}"#).unwrap();
        assert_eq!(group.read_access, AccessMode::Group);
        assert!(group.ip_ranges.is_empty());
        assert!(group.membership.is_empty());
    }
}
