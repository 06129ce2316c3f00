//! In-memory collaborators
//!
//! Used for embedding the engine in tests and tools that already hold their
//! data in memory.

use crate::access_control::{ObjectId, ObjectKind};
use crate::error::{CacheError, RepositoryResult, StoreError, StoreResult};
use crate::group::{Group, GroupId};
use crate::hierarchy::HierarchyRow;
use crate::store::{CacheStore, GroupStore, PrincipalContext, Repository};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Repository backed by plain collections
#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    items: Vec<HierarchyRow>,
    terms: Vec<HierarchyRow>,
    links: Vec<(ObjectId, ObjectId)>,
    subtypes: HashMap<(ObjectKind, ObjectId), String>,
    users: BTreeMap<ObjectId, Vec<String>>,
    owners: HashMap<(ObjectKind, ObjectId), ObjectId>,
    names: HashMap<(ObjectKind, ObjectId), String>,
    revision: u64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, id: &str, parent: Option<&str>, subtype: &str) -> Self {
        self.items.push(HierarchyRow::new(id, parent, subtype));
        self
    }

    pub fn with_term(mut self, id: &str, parent: Option<&str>, subtype: &str) -> Self {
        self.terms.push(HierarchyRow::new(id, parent, subtype));
        self
    }

    /// Record the subtype of an object that has no hierarchy row
    pub fn with_subtype(mut self, kind: ObjectKind, id: &str, subtype: &str) -> Self {
        self.subtypes
            .insert((kind, id.to_string()), subtype.to_string());
        self
    }

    /// Attach `term` to content item `item`
    pub fn with_link(mut self, item: &str, term: &str) -> Self {
        self.links.push((item.to_string(), term.to_string()));
        self
    }

    pub fn with_user(mut self, id: &str, roles: &[&str]) -> Self {
        self.users
            .insert(id.to_string(), roles.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn with_owner(mut self, kind: ObjectKind, id: &str, owner: &str) -> Self {
        self.owners
            .insert((kind, id.to_string()), owner.to_string());
        self
    }

    pub fn with_name(mut self, kind: ObjectKind, id: &str, name: &str) -> Self {
        self.names.insert((kind, id.to_string()), name.to_string());
        self
    }

    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    fn rows(&self, kind: ObjectKind) -> &[HierarchyRow] {
        match kind {
            ObjectKind::ContentItem => &self.items,
            ObjectKind::Term => &self.terms,
            ObjectKind::Role | ObjectKind::User => &[],
        }
    }
}

impl Repository for MemoryRepository {
    fn hierarchy_rows(&self, kind: ObjectKind) -> RepositoryResult<Vec<HierarchyRow>> {
        Ok(self.rows(kind).to_vec())
    }

    fn object_subtype(&self, kind: ObjectKind, id: &str) -> RepositoryResult<Option<String>> {
        let from_rows = self.rows(kind).iter().find(|row| row.id == id);
        Ok(from_rows
            .map(|row| row.subtype.clone())
            .or_else(|| self.subtypes.get(&(kind, id.to_string())).cloned()))
    }

    fn item_term_links(&self) -> RepositoryResult<Vec<(ObjectId, ObjectId)>> {
        Ok(self.links.clone())
    }

    fn user_roles(&self, user: &str) -> RepositoryResult<Vec<String>> {
        Ok(self.users.get(user).cloned().unwrap_or_default())
    }

    fn object_owner(&self, kind: ObjectKind, id: &str) -> RepositoryResult<Option<ObjectId>> {
        Ok(self.owners.get(&(kind, id.to_string())).cloned())
    }

    fn users(&self, offset: usize, limit: usize) -> RepositoryResult<Vec<ObjectId>> {
        Ok(self.users.keys().skip(offset).take(limit).cloned().collect())
    }

    fn display_name(&self, kind: ObjectKind, id: &str) -> Option<String> {
        self.names.get(&(kind, id.to_string())).cloned()
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

/// Fixed principal for one request
#[derive(Debug, Clone, Default)]
pub struct StaticPrincipal {
    id: Option<ObjectId>,
    capabilities: BTreeSet<String>,
    admin_context: bool,
    remote_ip: Option<String>,
}

impl StaticPrincipal {
    /// A signed-in principal
    pub fn user(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_capability(mut self, capability: &str) -> Self {
        self.capabilities.insert(capability.to_string());
        self
    }

    pub fn in_admin_context(mut self) -> Self {
        self.admin_context = true;
        self
    }

    pub fn with_ip(mut self, ip: &str) -> Self {
        self.remote_ip = Some(ip.to_string());
        self
    }
}

impl PrincipalContext for StaticPrincipal {
    fn principal_id(&self) -> Option<ObjectId> {
        self.id.clone()
    }

    fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    fn is_admin_context(&self) -> bool {
        self.admin_context
    }

    fn remote_ip(&self) -> Option<String> {
        self.remote_ip.clone()
    }
}

/// Thread-safe key/value cache
///
/// [`MemoryCache::failing`] builds a cache whose every call errors, for
/// exercising the degraded path.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
    failing: AtomicBool,
    hits: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: AtomicBool::new(true),
            ..Default::default()
        }
    }

    /// Number of successful lookups that found a value
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), CacheError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(CacheError::Backend("cache unavailable".into()));
        }
        Ok(())
    }

    // A poisoned lock only means a writer panicked mid-insert; the map is
    // still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.check_available()?;
        let value = self.read().get(key).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value)
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        self.check_available()?;
        self.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Group store keeping groups in a map, assigning sequential ids
#[derive(Debug)]
pub struct MemoryGroupStore {
    groups: RwLock<BTreeMap<GroupId, Group>>,
    next_id: AtomicU64,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Seed the store with existing groups, keeping their ids
    pub fn with_groups<I>(groups: I) -> Self
    where
        I: IntoIterator<Item = Group>,
    {
        let groups: BTreeMap<GroupId, Group> = groups.into_iter().map(|g| (g.id, g)).collect();
        let next_id = groups.keys().next_back().map_or(1, |id| id + 1);
        Self {
            groups: RwLock::new(groups),
            next_id: AtomicU64::new(next_id),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<GroupId, Group>> {
        self.groups.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<GroupId, Group>> {
        self.groups.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupStore for MemoryGroupStore {
    fn load_all(&self) -> StoreResult<Vec<Group>> {
        Ok(self.read().values().cloned().collect())
    }

    fn add(&self, mut group: Group) -> StoreResult<Group> {
        group.validate()?;
        group.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut groups = self.write();
        if groups.contains_key(&group.id) {
            return Err(StoreError::AlreadyExists { id: group.id });
        }
        groups.insert(group.id, group.clone());
        Ok(group)
    }

    fn update(&self, group: &Group) -> StoreResult<()> {
        group.validate()?;
        let mut groups = self.write();
        match groups.get_mut(&group.id) {
            Some(existing) => {
                *existing = group.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound { id: group.id }),
        }
    }

    fn delete(&self, id: GroupId) -> StoreResult<()> {
        self.write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound { id })
    }
}
