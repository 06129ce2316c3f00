//! Access engine
//!
//! Answers access and exclusion-set queries for one principal. Decision
//! order for `check_access`:
//! 1. Unmanaged object type -> grant
//! 2. Owner auto-access -> grant
//! 3. Manager capability -> grant
//! 4. Collect owning groups (recursive membership)
//! 5. No owning group -> grant
//! 6. Skip groups whose mode for the operation is `all`; grant on membership
//!    or IP match; grant if every group was skipped, deny otherwise
//!
//! An engine is request-scoped. Closures, groups and decisions are memoized
//! for its lifetime and never shared with other engines, except through the
//! optional [`CacheStore`].

use crate::access_control::explain::{AccessExplanation, DecisionReason, GroupOutcome, GroupVerdict};
use crate::access_control::{AccessOperation, ObjectId, ObjectKind};
use crate::config::{AppConfig, CacheConfig, PolicyConfig};
use crate::error::{ConfigError, Result};
use crate::group::{Group, GroupId};
use crate::hierarchy::{Closures, CrossMap, HierarchyMap, HierarchyMapBuilder};
use crate::membership::{
    AssignmentInfo, MembershipResolver, RegisteredType, ResolveContext, ResolverRegistry,
};
use crate::store::{CacheStore, GroupStore, PrincipalContext, Repository};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DecisionKey {
    object_type: String,
    id: ObjectId,
    operation: AccessOperation,
}

/// Builder for [`AccessEngine`]
///
/// The registry is built from configuration unless one is supplied, so a
/// misconfigured resolver fails here rather than on the first check.
pub struct AccessEngineBuilder {
    config: AppConfig,
    registry: Option<ResolverRegistry>,
    repository: Option<Arc<dyn Repository>>,
    principal: Option<Arc<dyn PrincipalContext>>,
    group_store: Option<Arc<dyn GroupStore>>,
    cache: Option<Arc<dyn CacheStore>>,
}

impl AccessEngineBuilder {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            config: config.clone(),
            registry: None,
            repository: None,
            principal: None,
            group_store: None,
            cache: None,
        }
    }

    /// Use a prebuilt registry instead of the configured resolvers
    pub fn registry(mut self, registry: ResolverRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn principal(mut self, principal: Arc<dyn PrincipalContext>) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn group_store(mut self, store: Arc<dyn GroupStore>) -> Self {
        self.group_store = Some(store);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> std::result::Result<AccessEngine, ConfigError> {
        let registry = match self.registry {
            Some(registry) => registry,
            None => ResolverRegistry::from_config(
                &self.config.resolvers,
                &self.config.object_types,
            )?,
        };

        let repository = self.repository.ok_or_else(|| ConfigError::Missing {
            field: "repository".to_string(),
        })?;
        let principal = self.principal.ok_or_else(|| ConfigError::Missing {
            field: "principal".to_string(),
        })?;
        let group_store = self.group_store.ok_or_else(|| ConfigError::Missing {
            field: "group_store".to_string(),
        })?;
        let cache = if self.config.cache.enabled {
            self.cache
        } else {
            None
        };

        Ok(AccessEngine {
            policy: self.config.policy,
            cache_config: self.config.cache,
            registry,
            repository,
            principal,
            group_store,
            cache,
            closures: OnceCell::new(),
            groups: OnceCell::new(),
            decisions: RefCell::new(HashMap::new()),
        })
    }
}

/// Request-scoped access decision engine
pub struct AccessEngine {
    policy: PolicyConfig,
    cache_config: CacheConfig,
    registry: ResolverRegistry,
    repository: Arc<dyn Repository>,
    principal: Arc<dyn PrincipalContext>,
    group_store: Arc<dyn GroupStore>,
    cache: Option<Arc<dyn CacheStore>>,
    closures: OnceCell<Closures>,
    groups: OnceCell<BTreeMap<GroupId, Group>>,
    decisions: RefCell<HashMap<DecisionKey, bool>>,
}

impl AccessEngine {
    pub fn builder(config: &AppConfig) -> AccessEngineBuilder {
        AccessEngineBuilder::new(config)
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    /// Operation implied by the principal's request context
    pub fn default_operation(&self) -> AccessOperation {
        AccessOperation::from_admin_context(self.principal.is_admin_context())
    }

    /// Whether the principal may access the object for the context's operation
    pub fn check_access(&self, object_type: &str, id: &str) -> Result<bool> {
        self.check_access_for(object_type, id, self.default_operation())
    }

    /// Whether the principal may perform `operation` on the object
    pub fn check_access_for(
        &self,
        object_type: &str,
        id: &str,
        operation: AccessOperation,
    ) -> Result<bool> {
        let key = DecisionKey {
            object_type: object_type.to_string(),
            id: id.to_string(),
            operation,
        };
        if let Some(&granted) = self.decisions.borrow().get(&key) {
            trace!(object_type, id, %operation, granted, "Decision cache hit");
            return Ok(granted);
        }

        let shared_key = self.shared_decision_key(&key);
        let cached = shared_key
            .as_deref()
            .and_then(|k| self.cache_get::<bool>(k));

        let granted = match cached {
            Some(granted) => granted,
            None => {
                let granted = self.explain_access(object_type, id, operation)?.is_granted();
                if let Some(k) = shared_key.as_deref() {
                    self.cache_set(k, &granted);
                }
                granted
            }
        };

        self.decisions.borrow_mut().insert(key, granted);
        Ok(granted)
    }

    /// Full decision with the evaluation of every owning group
    pub fn explain_access(
        &self,
        object_type: &str,
        id: &str,
        operation: AccessOperation,
    ) -> Result<AccessExplanation> {
        let explanation = |reason: DecisionReason, groups: Vec<GroupVerdict>| AccessExplanation {
            object_type: object_type.to_string(),
            id: id.to_string(),
            operation,
            reason,
            groups,
        };

        let Some(registered) = self.registry.lookup(object_type) else {
            debug!(object_type, id, "Unmanaged object type, granting");
            return Ok(explanation(DecisionReason::Unmanaged, Vec::new()));
        };

        if self.policy.owner_auto_access && self.is_owner(registered.kind, id)? {
            debug!(object_type, id, "Principal owns object, granting");
            return Ok(explanation(DecisionReason::Owner, Vec::new()));
        }

        if self.is_manager() {
            debug!(object_type, id, "Principal is a manager, granting");
            return Ok(explanation(DecisionReason::Manager, Vec::new()));
        }

        let owning = self.owning_groups(registered, id, true)?;
        if owning.is_empty() {
            debug!(object_type, id, "No owning groups, granting");
            return Ok(explanation(DecisionReason::Ungoverned, Vec::new()));
        }

        let ctx = self.resolve_context()?;
        let remote_ip = self.principal.remote_ip();
        let mut reason = None;
        let mut restricted = false;
        let mut verdicts = Vec::with_capacity(owning.len());

        for (group, object_membership) in owning {
            let outcome = if group.is_unrestricted(operation) {
                GroupOutcome::Unrestricted
            } else if let Some(membership) = self.principal_membership(&ctx, group) {
                GroupOutcome::Member { membership }
            } else if remote_ip.as_deref().is_some_and(|ip| group.ip_matches(ip)) {
                GroupOutcome::IpMatch
            } else {
                restricted = true;
                GroupOutcome::Restricted
            };

            if reason.is_none() && outcome.grants() {
                reason = Some(match outcome {
                    GroupOutcome::Member { .. } => DecisionReason::Member { group: group.id },
                    _ => DecisionReason::IpMatch { group: group.id },
                });
            }

            trace!(group = group.id, outcome = ?outcome, "Evaluated owning group");
            verdicts.push(GroupVerdict {
                group: group.id,
                name: group.name.clone(),
                object_membership,
                outcome,
            });
        }

        let reason = reason.unwrap_or(if restricted {
            DecisionReason::Denied
        } else {
            DecisionReason::Unrestricted
        });

        debug!(object_type, id, %operation, reason = ?reason, "Access decided");
        Ok(explanation(reason, verdicts))
    }

    /// Groups an object is directly assigned to
    ///
    /// With `filtered_to_principal`, non-manager principals only see groups
    /// they belong to when the restriction policy is enabled.
    pub fn groups_for_object(
        &self,
        object_type: &str,
        id: &str,
        filtered_to_principal: bool,
    ) -> Result<Vec<&Group>> {
        let Some(registered) = self.registry.lookup(object_type) else {
            return Ok(Vec::new());
        };
        let groups: Vec<&Group> = self
            .owning_groups(registered, id, false)?
            .into_iter()
            .map(|(group, _)| group)
            .collect();

        if filtered_to_principal {
            self.filter_visible(groups)
        } else {
            Ok(groups)
        }
    }

    /// Ids of `object_type` the principal may not access
    pub fn exclusion_set(&self, object_type: &str) -> Result<BTreeSet<ObjectId>> {
        let Some(registered) = self.registry.lookup(object_type) else {
            return Ok(BTreeSet::new());
        };
        if self.is_manager() {
            return Ok(BTreeSet::new());
        }

        let operation = self.default_operation();
        let ctx = self.resolve_context()?;
        let resolver = self.registry.resolver(registered.kind);
        let remote_ip = self.principal.remote_ip();

        let mut excluded = BTreeSet::new();
        let mut granted = BTreeSet::new();

        for group in self.groups_map()?.values() {
            if group.is_unrestricted(operation) {
                continue;
            }
            let members =
                resolver.full_members(&ctx, group, true, registered.subtype.as_deref());
            let passes = self.principal_membership(&ctx, group).is_some()
                || remote_ip.as_deref().is_some_and(|ip| group.ip_matches(ip));

            trace!(group = group.id, members = members.len(), passes, "Exclusion pass");
            if passes {
                granted.extend(members.into_keys());
            } else {
                excluded.extend(members.into_keys());
            }
        }

        excluded.retain(|id| !granted.contains(id));

        if self.policy.owner_auto_access && !excluded.is_empty() {
            let mut owned = Vec::new();
            for id in &excluded {
                if self.is_owner(registered.kind, id)? {
                    owned.push(id.clone());
                }
            }
            for id in owned {
                excluded.remove(&id);
            }
        }

        debug!(object_type, %operation, excluded = excluded.len(), "Computed exclusion set");
        Ok(excluded)
    }

    /// Members of a group for an object type
    pub fn group_members(
        &self,
        group_id: GroupId,
        object_type: &str,
        recursive: bool,
    ) -> Result<BTreeMap<ObjectId, String>> {
        let Some(registered) = self.registry.lookup(object_type) else {
            return Ok(BTreeMap::new());
        };
        let Some(group) = self.groups_map()?.get(&group_id) else {
            return Ok(BTreeMap::new());
        };
        let ctx = self.resolve_context()?;
        Ok(self.registry.resolver(registered.kind).full_members(
            &ctx,
            group,
            recursive,
            registered.subtype.as_deref(),
        ))
    }

    /// `(name, category label)` of an object, `None` for unmanaged types
    pub fn display_name(&self, object_type: &str, id: &str) -> Result<Option<(String, String)>> {
        let Some(registered) = self.registry.lookup(object_type) else {
            return Ok(None);
        };
        let ctx = self.resolve_context()?;
        Ok(Some(
            self.registry
                .resolver(registered.kind)
                .display_name(&ctx, id),
        ))
    }

    // --- Group lifecycle ---

    pub fn groups(&self) -> Result<Vec<&Group>> {
        Ok(self.groups_map()?.values().collect())
    }

    /// Groups the principal may see under the restriction policy
    pub fn visible_groups(&self) -> Result<Vec<&Group>> {
        let groups = self.groups()?;
        self.filter_visible(groups)
    }

    pub fn group(&self, id: GroupId) -> Result<Option<&Group>> {
        Ok(self.groups_map()?.get(&id))
    }

    /// Persist a new group; the store assigns its id
    pub fn add_group(&mut self, group: Group) -> Result<Group> {
        let added = self.group_store.add(group)?;
        debug!(group = added.id, name = %added.name, "Added group");
        let stored = added.clone();
        self.with_groups_mut(move |groups| {
            groups.insert(stored.id, stored);
        })?;
        Ok(added)
    }

    pub fn update_group(&mut self, group: Group) -> Result<()> {
        self.group_store.update(&group)?;
        debug!(group = group.id, "Updated group");
        self.with_groups_mut(move |groups| {
            groups.insert(group.id, group);
        })
    }

    pub fn delete_group(&mut self, id: GroupId) -> Result<()> {
        self.group_store.delete(id)?;
        debug!(group = id, "Deleted group");
        self.with_groups_mut(|groups| {
            groups.remove(&id);
        })
    }

    // --- Cache control ---

    /// Drop memoized decisions
    pub fn reset_cache(&self) {
        self.decisions.borrow_mut().clear();
    }

    /// Drop memoized closures and decisions; closures rebuild on next use
    pub fn rebuild_closures(&mut self) {
        self.closures.take();
        self.reset_cache();
    }

    // --- Internals ---

    fn is_manager(&self) -> bool {
        self.principal
            .has_capability(&self.policy.manager_capability)
    }

    fn is_owner(&self, kind: ObjectKind, id: &str) -> Result<bool> {
        let Some(principal) = self.principal.principal_id() else {
            return Ok(false);
        };
        let owner = self.repository.object_owner(kind, id)?;
        Ok(owner.as_deref() == Some(principal.as_str()))
    }

    fn principal_membership(&self, ctx: &ResolveContext<'_>, group: &Group) -> Option<AssignmentInfo> {
        let principal = self.principal.principal_id()?;
        self.registry
            .resolver(ObjectKind::User)
            .is_member(ctx, group, true, &principal)
    }

    fn owning_groups(
        &self,
        registered: &RegisteredType,
        id: &str,
        recursive: bool,
    ) -> Result<Vec<(&Group, AssignmentInfo)>> {
        let ctx = self.resolve_context()?;
        let resolver = self.registry.resolver(registered.kind);
        Ok(self
            .groups_map()?
            .values()
            .filter_map(|group| {
                resolver
                    .is_member(&ctx, group, recursive, id)
                    .map(|info| (group, info))
            })
            .collect())
    }

    fn filter_visible<'a>(&'a self, groups: Vec<&'a Group>) -> Result<Vec<&'a Group>> {
        if !self.policy.restrict_groups_to_member || self.is_manager() {
            return Ok(groups);
        }
        let ctx = self.resolve_context()?;
        Ok(groups
            .into_iter()
            .filter(|group| self.principal_membership(&ctx, group).is_some())
            .collect())
    }

    fn resolve_context(&self) -> Result<ResolveContext<'_>> {
        Ok(ResolveContext {
            repository: self.repository.as_ref(),
            closures: self.closures()?,
            page_size: self.cache_config.user_page_size,
        })
    }

    fn groups_map(&self) -> Result<&BTreeMap<GroupId, Group>> {
        if let Some(groups) = self.groups.get() {
            return Ok(groups);
        }
        let loaded = self.load_groups()?;
        Ok(self.groups.get_or_init(|| loaded))
    }

    fn load_groups(&self) -> Result<BTreeMap<GroupId, Group>> {
        let groups: BTreeMap<GroupId, Group> = self
            .group_store
            .load_all()?
            .into_iter()
            .map(|group| (group.id, group))
            .collect();
        debug!(count = groups.len(), "Loaded groups");
        Ok(groups)
    }

    fn with_groups_mut<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<GroupId, Group>),
    {
        let mut groups = match self.groups.take() {
            Some(groups) => groups,
            None => self.load_groups()?,
        };
        f(&mut groups);
        self.groups = OnceCell::from(groups);
        self.reset_cache();
        Ok(())
    }

    fn closures(&self) -> Result<&Closures> {
        if let Some(closures) = self.closures.get() {
            return Ok(closures);
        }
        let built = self.load_closures()?;
        Ok(self.closures.get_or_init(|| built))
    }

    fn load_closures(&self) -> Result<Closures> {
        let revision = self.repository.revision().to_string();
        Ok(Closures {
            items: self.load_hierarchy(ObjectKind::ContentItem, &revision)?,
            terms: self.load_hierarchy(ObjectKind::Term, &revision)?,
            cross: self.load_cross_map(&revision)?,
        })
    }

    fn load_hierarchy(&self, kind: ObjectKind, revision: &str) -> Result<HierarchyMap> {
        let key = self.cache_key(&["hierarchy", kind.as_str(), revision]);
        if let Some(map) = key.as_deref().and_then(|k| self.cache_get::<HierarchyMap>(k)) {
            debug!(kind = %kind, revision, "Hierarchy served from shared cache");
            return Ok(map);
        }

        let rows = self.repository.hierarchy_rows(kind)?;
        let map = HierarchyMapBuilder::new(rows).build();
        if let Some(k) = key.as_deref() {
            self.cache_set(k, &map);
        }
        Ok(map)
    }

    fn load_cross_map(&self, revision: &str) -> Result<CrossMap> {
        let key = self.cache_key(&["cross", revision]);
        if let Some(map) = key.as_deref().and_then(|k| self.cache_get::<CrossMap>(k)) {
            return Ok(map);
        }

        let map = CrossMap::from_links(self.repository.item_term_links()?);
        if let Some(k) = key.as_deref() {
            self.cache_set(k, &map);
        }
        Ok(map)
    }

    fn cache_key(&self, parts: &[&str]) -> Option<String> {
        self.cache
            .as_ref()
            .map(|cache| cache.generate_key(&self.cache_config.prefix, parts))
    }

    fn shared_decision_key(&self, key: &DecisionKey) -> Option<String> {
        if !self.cache_config.share_decisions {
            return None;
        }
        let principal = self.principal.principal_id().unwrap_or_default();
        let ip = self.principal.remote_ip().unwrap_or_default();
        let revision = self.repository.revision().to_string();
        self.cache_key(&[
            "decision",
            &revision,
            &principal,
            &ip,
            key.operation.as_str(),
            &key.object_type,
            &key.id,
        ])
    }

    fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cache = self.cache.as_ref()?;
        match cache.get(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "Discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, recomputing");
                None
            }
        }
    }

    fn cache_set<T: Serialize>(&self, key: &str, value: &T) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode cache entry");
                return;
            }
        };
        if let Err(e) = cache.set(key, encoded) {
            warn!(key, error = %e, "Cache write failed");
        }
    }
}
