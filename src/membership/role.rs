//! Role membership (flat, direct assignments only)

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::ConfigError;
use crate::group::Group;
use crate::membership::{
    AssignmentInfo, MembershipResolver, ResolveContext, ResolverDescriptor, filter_subtype,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct RoleResolver {
    descriptor: ResolverDescriptor,
}

impl RoleResolver {
    pub fn new(descriptor: ResolverDescriptor) -> Result<Self, ConfigError> {
        descriptor.validate("role")?;
        Ok(Self { descriptor })
    }
}

impl MembershipResolver for RoleResolver {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Role
    }

    fn descriptor(&self) -> &ResolverDescriptor {
        &self.descriptor
    }

    fn is_member(
        &self,
        _ctx: &ResolveContext<'_>,
        group: &Group,
        _recursive: bool,
        id: &str,
    ) -> Option<AssignmentInfo> {
        group.is_assigned(ObjectKind::Role, id).cloned()
    }

    fn full_members(
        &self,
        _ctx: &ResolveContext<'_>,
        group: &Group,
        _recursive: bool,
        subtype: Option<&str>,
    ) -> BTreeMap<ObjectId, String> {
        let members = group
            .assigned_objects(ObjectKind::Role)
            .map(|(id, info)| (id.clone(), info.category.clone()))
            .collect();
        filter_subtype(members, subtype, &self.descriptor.category)
    }
}
