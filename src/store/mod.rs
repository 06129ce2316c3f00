//! Collaborator interfaces
//!
//! The engine owns no persistence. Everything it reads about the outside
//! world comes through these traits: the content [`Repository`], the
//! requesting [`PrincipalContext`], the optional shared [`CacheStore`], and
//! the [`GroupStore`] holding group entities.
//!
//! In-memory implementations live in [`memory`].

pub mod memory;

pub use memory::{MemoryCache, MemoryGroupStore, MemoryRepository, StaticPrincipal};

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::{CacheError, RepositoryResult, StoreResult};
use crate::group::{Group, GroupId};
use crate::hierarchy::HierarchyRow;

/// Read access to the content repository
pub trait Repository {
    /// Parent-pointer rows for a hierarchical kind; empty for flat kinds
    ///
    /// Rows may omit objects that have no parent and no children. Their
    /// subtype is then answered by [`Repository::object_subtype`].
    fn hierarchy_rows(&self, kind: ObjectKind) -> RepositoryResult<Vec<HierarchyRow>>;

    /// Concrete subtype of an object, e.g. `post` for a content item
    fn object_subtype(&self, kind: ObjectKind, id: &str) -> RepositoryResult<Option<String>>;

    /// `(item, term)` association rows
    fn item_term_links(&self) -> RepositoryResult<Vec<(ObjectId, ObjectId)>>;

    /// Role names held by a user; unknown users hold none
    fn user_roles(&self, user: &str) -> RepositoryResult<Vec<String>>;

    /// Recorded owner of an object, if any
    fn object_owner(&self, kind: ObjectKind, id: &str) -> RepositoryResult<Option<ObjectId>>;

    /// One page of user ids, ordered and stable across calls
    fn users(&self, offset: usize, limit: usize) -> RepositoryResult<Vec<ObjectId>>;

    /// Human-readable name of an object
    fn display_name(&self, kind: ObjectKind, id: &str) -> Option<String>;

    /// Version of the membership-relevant data, bumped on writes
    fn revision(&self) -> u64 {
        0
    }
}

/// The principal a request is evaluated for
pub trait PrincipalContext {
    /// `None` for anonymous visitors
    fn principal_id(&self) -> Option<ObjectId>;

    fn has_capability(&self, capability: &str) -> bool;

    /// Whether the request runs in an administrative/editing context
    fn is_admin_context(&self) -> bool;

    /// Dotted-quad request address, if known
    fn remote_ip(&self) -> Option<String>;
}

/// Shared best-effort cache
///
/// Implementations are shared between engines and must be thread-safe.
/// Every failure is tolerated by the caller.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    fn set(&self, key: &str, value: String) -> Result<(), CacheError>;

    /// Build a namespaced key from its parts
    fn generate_key(&self, prefix: &str, parts: &[&str]) -> String {
        let mut key = String::from(prefix);
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }
}

/// Persistence of group entities
pub trait GroupStore {
    fn load_all(&self) -> StoreResult<Vec<Group>>;

    /// Persist a new group and return it with its assigned id
    fn add(&self, group: Group) -> StoreResult<Group>;

    fn update(&self, group: &Group) -> StoreResult<()>;

    fn delete(&self, id: GroupId) -> StoreResult<()>;
}
