//! Membership resolution
//!
//! One resolver per [`ObjectKind`], all behind [`MembershipResolver`]:
//!
//! | Resolver | Direct | Recursive adds |
//! |----------|--------|----------------|
//! | [`ContentItemResolver`] | item assigned | an ancestor assigned, or an attached term is a member |
//! | [`TermResolver`] | term assigned | an ancestor term assigned |
//! | [`RoleResolver`] | role assigned | nothing |
//! | [`UserResolver`] | user assigned | a held role assigned (one hop) |
//!
//! The item -> term bridge is one-directional: term resolution never looks
//! at content items, so resolution cannot cycle between the two.
//!
//! Resolution is infallible. Unknown ids are simply not members, and
//! repository errors during a lookup are logged and treated the same way.

pub mod assignment;
pub mod content_item;
pub mod registry;
pub mod role;
pub mod term;
pub mod user;

pub use assignment::AssignmentInfo;
pub use content_item::ContentItemResolver;
pub use registry::{ObjectTypeRegistration, RegisteredType, ResolverRegistry};
pub use role::RoleResolver;
pub use term::TermResolver;
pub use user::UserResolver;

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::ConfigError;
use crate::group::Group;
use crate::hierarchy::Closures;
use crate::store::Repository;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Declared identity of a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverDescriptor {
    /// General category name the resolver answers for, e.g. `content_item`
    pub category: String,
    /// Label shown next to display names
    pub label: String,
    /// Concrete object types handled, e.g. `post`, `page`
    pub subtypes: BTreeSet<String>,
}

impl ResolverDescriptor {
    pub fn new<I, S>(category: impl Into<String>, label: impl Into<String>, subtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category: category.into(),
            label: label.into(),
            subtypes: subtypes.into_iter().map(Into::into).collect(),
        }
    }

    /// Fail when no category was declared
    pub fn validate(&self, resolver: &str) -> Result<(), ConfigError> {
        if self.category.trim().is_empty() {
            return Err(ConfigError::MissingCategory {
                resolver: resolver.to_string(),
            });
        }
        Ok(())
    }

}

/// Everything a resolver may consult besides the group itself
pub struct ResolveContext<'a> {
    pub repository: &'a dyn Repository,
    pub closures: &'a Closures,
    /// Page size for user enumeration
    pub page_size: usize,
}

impl ResolveContext<'_> {
    /// Recorded subtype of a hierarchical object
    ///
    /// Hierarchy rows answer first; objects without a row are looked up in
    /// the repository. A failed lookup is logged and yields `None`.
    pub fn subtype_of(&self, kind: ObjectKind, id: &str) -> Option<String> {
        if !kind.is_hierarchical() {
            return None;
        }
        let map = match kind {
            ObjectKind::Term => &self.closures.terms,
            _ => &self.closures.items,
        };
        if let Some(subtype) = map.subtype_of(id) {
            return Some(subtype.to_string());
        }
        match self.repository.object_subtype(kind, id) {
            Ok(subtype) => subtype,
            Err(e) => {
                warn!(kind = %kind, id, error = %e, "Failed to look up object subtype");
                None
            }
        }
    }
}

/// Shared contract of the per-kind resolvers
pub trait MembershipResolver {
    fn kind(&self) -> ObjectKind;

    fn descriptor(&self) -> &ResolverDescriptor;

    /// Whether `id` is a member of `group`, with provenance when it is
    fn is_member(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        id: &str,
    ) -> Option<AssignmentInfo>;

    /// All members of `group` of this kind, mapped to their subtype
    fn full_members(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        subtype: Option<&str>,
    ) -> BTreeMap<ObjectId, String>;

    /// `(name, category label)` for display and audit output
    fn display_name(&self, ctx: &ResolveContext<'_>, id: &str) -> (String, String) {
        let name = ctx
            .repository
            .display_name(self.kind(), id)
            .unwrap_or_else(|| id.to_string());
        (name, self.descriptor().label.clone())
    }

    fn handled_subtypes(&self) -> &BTreeSet<String> {
        &self.descriptor().subtypes
    }
}

/// Closed set of resolvers, one per [`ObjectKind`]
#[derive(Debug, Clone)]
pub enum Resolver {
    ContentItem(ContentItemResolver),
    Term(TermResolver),
    Role(RoleResolver),
    User(UserResolver),
}

impl Resolver {
    fn inner(&self) -> &dyn MembershipResolver {
        match self {
            Resolver::ContentItem(r) => r,
            Resolver::Term(r) => r,
            Resolver::Role(r) => r,
            Resolver::User(r) => r,
        }
    }
}

impl MembershipResolver for Resolver {
    fn kind(&self) -> ObjectKind {
        self.inner().kind()
    }

    fn descriptor(&self) -> &ResolverDescriptor {
        self.inner().descriptor()
    }

    fn is_member(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        id: &str,
    ) -> Option<AssignmentInfo> {
        self.inner().is_member(ctx, group, recursive, id)
    }

    fn full_members(
        &self,
        ctx: &ResolveContext<'_>,
        group: &Group,
        recursive: bool,
        subtype: Option<&str>,
    ) -> BTreeMap<ObjectId, String> {
        self.inner().full_members(ctx, group, recursive, subtype)
    }

    fn display_name(&self, ctx: &ResolveContext<'_>, id: &str) -> (String, String) {
        self.inner().display_name(ctx, id)
    }
}

/// Keep only members whose subtype matches the optional filter
///
/// Members recorded under the general `category` have no known subtype and
/// are kept by every filter.
pub(crate) fn filter_subtype(
    members: BTreeMap<ObjectId, String>,
    subtype: Option<&str>,
    category: &str,
) -> BTreeMap<ObjectId, String> {
    match subtype {
        Some(wanted) => members
            .into_iter()
            .filter(|(_, actual)| actual == wanted || actual == category)
            .collect(),
        None => members,
    }
}
