//! User membership
//!
//! A user is a member when assigned directly or, recursively, when one of
//! the roles the user holds is directly assigned. Role membership is not
//! expanded further.

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::ConfigError;
use crate::group::Group;
use crate::membership::{
    AssignmentInfo, MembershipResolver, ResolveContext, ResolverDescriptor, filter_subtype,
};
use std::collections::BTreeMap;
use tracing::{trace, warn};

#[derive(Debug, Clone)]
pub struct UserResolver {
    descriptor: ResolverDescriptor,
}

impl UserResolver {
    pub fn new(descriptor: ResolverDescriptor) -> Result<Self, ConfigError> {
        descriptor.validate("user")?;
        Ok(Self { descriptor })
    }
}

impl MembershipResolver for UserResolver {
    fn kind(&self) -> ObjectKind {
        ObjectKind::User
    }

    fn descriptor(&self) -> &ResolverDescriptor {
        &self.descriptor
    }

    fn is_member(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        id: &str,
    ) -> Option<AssignmentInfo> {
        if let Some(info) = group.is_assigned(ObjectKind::User, id) {
            return Some(info.clone());
        }
        if !recursive {
            return None;
        }

        let roles = match ctx.repository.user_roles(id) {
            Ok(roles) => roles,
            Err(e) => {
                warn!(user = id, error = %e, "Failed to load user roles, treating as non-member");
                return None;
            }
        };

        let mut info = AssignmentInfo::direct(self.descriptor.category.as_str());
        for role in roles {
            if let Some(source) = group.is_assigned(ObjectKind::Role, &role) {
                trace!(user = id, role = %role, group = group.id, "User inherits through role");
                info.add_source(ObjectKind::Role, role, source.clone());
            }
        }

        (!info.is_direct()).then_some(info)
    }

    /// Pages through every user in the repository when `recursive` is set.
    ///
    /// This is linear in the size of the user table; callers listing very
    /// large user bases should page themselves.
    fn full_members(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        subtype: Option<&str>,
    ) -> BTreeMap<ObjectId, String> {
        let mut members: BTreeMap<ObjectId, String> = group
            .assigned_objects(ObjectKind::User)
            .map(|(id, info)| (id.clone(), info.category.clone()))
            .collect();

        if recursive {
            let page_size = ctx.page_size.max(1);
            let mut offset = 0;
            loop {
                let page = match ctx.repository.users(offset, page_size) {
                    Ok(page) => page,
                    Err(e) => {
                        warn!(offset, error = %e, "Failed to enumerate users, result is partial");
                        break;
                    }
                };
                let fetched = page.len();
                for user in page {
                    if let Some(info) = self.is_member(ctx, group, true, &user) {
                        members.entry(user).or_insert(info.category);
                    }
                }
                if fetched < page_size {
                    break;
                }
                offset += fetched;
            }
        }

        filter_subtype(members, subtype, &self.descriptor.category)
    }
}
