//! Taxonomy term membership

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::ConfigError;
use crate::group::Group;
use crate::membership::{
    AssignmentInfo, MembershipResolver, ResolveContext, ResolverDescriptor, filter_subtype,
};
use std::collections::BTreeMap;
use tracing::trace;

/// Resolves term membership within the term hierarchy
#[derive(Debug, Clone)]
pub struct TermResolver {
    descriptor: ResolverDescriptor,
}

impl TermResolver {
    pub fn new(descriptor: ResolverDescriptor) -> Result<Self, ConfigError> {
        descriptor.validate("term")?;
        Ok(Self { descriptor })
    }
}

impl MembershipResolver for TermResolver {
    fn kind(&self) -> ObjectKind {
        ObjectKind::Term
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
        if let Some(info) = group.is_assigned(ObjectKind::Term, id) {
            return Some(info.clone());
        }
        if !recursive {
            return None;
        }

        let terms = &ctx.closures.terms;
        let category = ctx
            .subtype_of(ObjectKind::Term, id)
            .unwrap_or_else(|| self.descriptor.category.clone());
        let mut info = AssignmentInfo::direct(category);

        // Ancestors are tested directly; their own ancestors are already in the closure.
        for (ancestor, _) in terms.ancestors(id) {
            if let Some(source) = group.is_assigned(ObjectKind::Term, ancestor) {
                trace!(term = id, ancestor = %ancestor, group = group.id, "Term inherits membership");
                info.add_source(ObjectKind::Term, ancestor.clone(), source.clone());
            }
        }

        (!info.is_direct()).then_some(info)
    }

    fn full_members(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        subtype: Option<&str>,
    ) -> BTreeMap<ObjectId, String> {
        let mut members = BTreeMap::new();

        for (id, info) in group.assigned_objects(ObjectKind::Term) {
            members.insert(id.clone(), info.category.clone());
            if recursive {
                for (descendant, descendant_subtype) in ctx.closures.terms.descendants(id) {
                    members
                        .entry(descendant.clone())
                        .or_insert_with(|| descendant_subtype.clone());
                }
            }
        }

        filter_subtype(members, subtype, &self.descriptor.category)
    }
}
