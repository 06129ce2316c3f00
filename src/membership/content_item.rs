//! Content item membership
//!
//! Items inherit membership from directly assigned ancestors and from the
//! terms attached to them. Term membership is resolved recursively through
//! the owned [`TermResolver`]; the term side never calls back here.

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::ConfigError;
use crate::group::Group;
use crate::membership::{
    AssignmentInfo, MembershipResolver, ResolveContext, ResolverDescriptor, TermResolver,
    filter_subtype,
};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ContentItemResolver {
    descriptor: ResolverDescriptor,
    terms: TermResolver,
}

impl ContentItemResolver {
    pub fn new(descriptor: ResolverDescriptor, terms: TermResolver) -> Result<Self, ConfigError> {
        descriptor.validate("content_item")?;
        Ok(Self { descriptor, terms })
    }

    /// Falls back to the general category when the repository does not know the item
    fn subtype_of(&self, ctx: &ResolveContext<'_>, id: &str) -> String {
        ctx.subtype_of(ObjectKind::ContentItem, id)
            .unwrap_or_else(|| self.descriptor.category.clone())
    }
}

impl MembershipResolver for ContentItemResolver {
    fn kind(&self) -> ObjectKind {
        ObjectKind::ContentItem
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
        if let Some(info) = group.is_assigned(ObjectKind::ContentItem, id) {
            return Some(info.clone());
        }
        if !recursive {
            return None;
        }

        let mut info = AssignmentInfo::direct(self.subtype_of(ctx, id));

        for (ancestor, _) in ctx.closures.items.ancestors(id) {
            if let Some(source) = group.is_assigned(ObjectKind::ContentItem, ancestor) {
                trace!(item = id, ancestor = %ancestor, group = group.id, "Item inherits from ancestor");
                info.add_source(ObjectKind::ContentItem, ancestor.clone(), source.clone());
            }
        }

        for term in ctx.closures.cross.terms_of(id) {
            if let Some(source) = self.terms.is_member(ctx, group, true, term) {
                trace!(item = id, term = %term, group = group.id, "Item inherits from term");
                info.add_source(ObjectKind::Term, term.clone(), source);
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
        let items = &ctx.closures.items;
        let mut members = BTreeMap::new();

        for (id, info) in group.assigned_objects(ObjectKind::ContentItem) {
            members.insert(id.clone(), info.category.clone());
            if recursive {
                for (descendant, descendant_subtype) in items.descendants(id) {
                    members
                        .entry(descendant.clone())
                        .or_insert_with(|| descendant_subtype.clone());
                }
            }
        }

        if recursive {
            for term in self.terms.full_members(ctx, group, true, None).keys() {
                for item in ctx.closures.cross.items_of(term) {
                    members
                        .entry(item.clone())
                        .or_insert_with(|| self.subtype_of(ctx, item));
                }
            }
        }

        filter_subtype(members, subtype, &self.descriptor.category)
    }
}
